//! Output path management.
//!
//! Rendered files land in a fixed subfolder next to the source, with a
//! numeric suffix appended when a same-named file already exists. Existing
//! files are never overwritten.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Name of the output folder created beside the source file.
pub const OUTPUT_DIR_NAME: &str = "deadcut";

/// Resolve (and create) the output directory for a source file.
pub async fn output_dir_for(source: &Path) -> MediaResult<PathBuf> {
    let parent = source
        .parent()
        .ok_or_else(|| MediaError::internal("source file has no parent directory"))?;
    let dir = parent.join(OUTPUT_DIR_NAME);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Return a path in `dir` for `file_name` that does not collide with an
/// existing file, suffixing `_1`, `_2`, ... before the extension as needed.
pub fn ensure_unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(ext.to_string())),
        None => (file_name.to_string(), None),
    };

    let mut counter = 1;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Resolve the full output path for a render of `source`.
pub async fn output_path_for(source: &Path) -> MediaResult<PathBuf> {
    let dir = output_dir_for(source).await?;
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MediaError::internal("source file has no file name"))?;
    Ok(ensure_unique_path(&dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_path_no_collision() {
        let dir = TempDir::new().unwrap();
        let path = ensure_unique_path(dir.path(), "video.mp4");
        assert_eq!(path, dir.path().join("video.mp4"));
    }

    #[test]
    fn test_unique_path_suffixes_on_collision() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("video.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("video_1.mp4"), b"x").unwrap();

        let path = ensure_unique_path(dir.path(), "video.mp4");
        assert_eq!(path, dir.path().join("video_2.mp4"));
    }

    #[test]
    fn test_unique_path_no_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("video"), b"x").unwrap();

        let path = ensure_unique_path(dir.path(), "video");
        assert_eq!(path, dir.path().join("video_1"));
    }

    #[tokio::test]
    async fn test_output_dir_created_beside_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        tokio::fs::write(&source, b"x").await.unwrap();

        let out_dir = output_dir_for(&source).await.unwrap();
        assert_eq!(out_dir, dir.path().join(OUTPUT_DIR_NAME));
        assert!(out_dir.is_dir());
    }
}
