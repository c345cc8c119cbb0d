//! Per-frame motion analysis of the video track.
//!
//! Frames are decoded one at a time through an FFmpeg rawvideo pipe at a
//! reduced resolution and in grayscale. Motion is the mean absolute pixel
//! difference between consecutive frames over a centered crop, which keeps
//! tickers and overlays at the frame edges from registering as movement.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use deadcut_models::{AnalysisSummary, Sample};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;
use crate::progress::ProgressFn;

/// Progress is reported once per this many frames.
const PROGRESS_STRIDE: u64 = 30;

/// A lazy, finite, non-restartable stream of decoded grayscale frames.
///
/// Owns the decoding subprocess; the child is killed if the stream is
/// dropped before it is exhausted, so early returns cannot leak a decoder.
pub struct FrameStream {
    child: Child,
    stdout: BufReader<ChildStdout>,
    frame_len: usize,
    finished: bool,
}

impl FrameStream {
    /// Spawn a decoder for `input`, downscaled to `width` x `height` gray8.
    pub fn open(input: &Path, width: u32, height: u32) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut child = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-i",
                input.to_str().unwrap_or_default(),
                "-vf",
                &format!("scale={}:{}", width, height),
                "-pix_fmt",
                "gray",
                "-f",
                "rawvideo",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("failed to spawn decoder: {e}"), None, None))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("decoder stdout not captured"))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            frame_len: (width as usize) * (height as usize),
            finished: false,
        })
    }

    /// Read the next frame into `buf`. Returns `false` at end of stream.
    pub async fn next_frame(&mut self, buf: &mut [u8]) -> MediaResult<bool> {
        debug_assert_eq!(buf.len(), self.frame_len);

        match self.stdout.read_exact(buf).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finished = true;
                Ok(false)
            }
            Err(e) => Err(MediaError::Io(e)),
        }
    }

    /// Wait for the decoder to exit after the stream is exhausted.
    pub async fn close(mut self) -> MediaResult<()> {
        if !self.finished {
            let _ = self.child.start_kill();
        }
        let _ = self.child.wait().await;
        // Consumed by value so Drop doesn't kill an already-reaped child
        self.finished = true;
        Ok(())
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        // Early termination: make sure the decoder doesn't outlive us
        if !self.finished {
            let _ = self.child.start_kill();
        }
    }
}

/// Analyze inter-frame motion over a centered crop of the video track.
///
/// `crop_ratio` is the fraction trimmed from each edge on both axes before
/// comparison; `scale` is the downscale factor applied to the source
/// resolution for speed. The summary holds one magnitude per consecutive
/// frame pair (`frame_count - 1` samples), normalized by the crop's pixel
/// count so it is resolution independent.
pub async fn analyze_motion(
    input_path: &Path,
    info: &VideoInfo,
    crop_ratio: f64,
    scale: f64,
    progress: ProgressFn,
) -> MediaResult<AnalysisSummary> {
    let width = scaled_dim(info.width, scale);
    let height = scaled_dim(info.height, scale);
    let total_frames = info.frame_count();

    debug!(
        width,
        height,
        crop_ratio,
        total_frames,
        "Starting motion analysis"
    );

    let mut stream = FrameStream::open(input_path, width, height)?;
    let frame_len = (width as usize) * (height as usize);

    let mut prev = vec![0u8; frame_len];
    let mut curr = vec![0u8; frame_len];

    if !stream.next_frame(&mut prev).await? {
        warn!("Video produced no frames");
        stream.close().await?;
        return Ok(AnalysisSummary::over_all(Vec::new()));
    }

    let mut diffs = Vec::new();
    let mut frame_num: u64 = 0;

    loop {
        match stream.next_frame(&mut curr).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                // The stream owns the child; dropping it kills the decoder
                return Err(e);
            }
        }
        frame_num += 1;

        let diff = central_frame_diff(&prev, &curr, width as usize, height as usize, crop_ratio);
        diffs.push(Sample::new(frame_num, diff));

        if frame_num % PROGRESS_STRIDE == 0 {
            progress(frame_num, total_frames, "analyzing video");
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    stream.close().await?;
    progress(total_frames, total_frames, "analyzing video");

    debug!(pairs = diffs.len(), "Motion analysis complete");
    Ok(AnalysisSummary::over_all(diffs))
}

/// Mean absolute difference between two frames over the centered crop.
///
/// Returns 0.0 when the crop region is degenerate (empty after cropping).
fn central_frame_diff(a: &[u8], b: &[u8], width: usize, height: usize, crop_ratio: f64) -> f64 {
    let top = (height as f64 * crop_ratio) as usize;
    let bottom = (height as f64 * (1.0 - crop_ratio)) as usize;
    let left = (width as f64 * crop_ratio) as usize;
    let right = (width as f64 * (1.0 - crop_ratio)) as usize;

    if bottom <= top || right <= left {
        return 0.0;
    }

    let mut sum: u64 = 0;
    for y in top..bottom {
        let row = y * width;
        for x in left..right {
            let i = row + x;
            sum += (a[i] as i16 - b[i] as i16).unsigned_abs() as u64;
        }
    }

    let pixels = (bottom - top) * (right - left);
    sum as f64 / pixels as f64
}

/// Downscaled dimension, never below one pixel.
fn scaled_dim(dim: u32, scale: f64) -> u32 {
    ((dim as f64 * scale).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames_zero_diff() {
        let frame = vec![128u8; 64 * 48];
        let diff = central_frame_diff(&frame, &frame, 64, 48, 0.25);
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_uniform_shift_normalized() {
        let a = vec![100u8; 64 * 48];
        let b = vec![110u8; 64 * 48];
        // Every cropped pixel differs by 10, so the mean is exactly 10
        let diff = central_frame_diff(&a, &b, 64, 48, 0.25);
        assert!((diff - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_crop_is_zero() {
        let a = vec![0u8; 4];
        let b = vec![255u8; 4];
        // Cropping 50% from each side leaves nothing
        let diff = central_frame_diff(&a, &b, 2, 2, 0.5);
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_motion_outside_crop_ignored() {
        let width = 40;
        let height = 40;
        let a = vec![0u8; width * height];
        let mut b = vec![0u8; width * height];
        // Change only the top-left corner, outside a 25% center crop
        for y in 0..5 {
            for x in 0..5 {
                b[y * width + x] = 255;
            }
        }
        let diff = central_frame_diff(&a, &b, width, height, 0.25);
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_scaled_dim_floor() {
        assert_eq!(scaled_dim(1920, 0.25), 480);
        assert_eq!(scaled_dim(3, 0.25), 1);
        assert_eq!(scaled_dim(2, 0.1), 1);
    }
}
