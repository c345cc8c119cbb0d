//! Per-source render exclusivity.
//!
//! The external rendering tool gets exclusive access to a source file: at
//! most one render job may run against a given path at a time. The gate
//! tracks in-flight sources; acquiring an already-held path fails rather
//! than queueing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{WorkerError, WorkerResult};

/// Tracks which source files have a render in flight.
#[derive(Debug, Clone, Default)]
pub struct RenderGate {
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a source for rendering. The claim is released when the permit
    /// drops.
    pub fn acquire(&self, source: &Path) -> WorkerResult<RenderPermit> {
        let mut in_flight = self.in_flight.lock().expect("render gate poisoned");
        if !in_flight.insert(source.to_path_buf()) {
            return Err(WorkerError::RenderBusy(source.to_path_buf()));
        }
        Ok(RenderPermit {
            gate: Arc::clone(&self.in_flight),
            source: source.to_path_buf(),
        })
    }
}

/// Releases the source claim on drop.
#[derive(Debug)]
pub struct RenderPermit {
    gate: Arc<Mutex<HashSet<PathBuf>>>,
    source: PathBuf,
}

impl Drop for RenderPermit {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.gate.lock() {
            in_flight.remove(&self.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails() {
        let gate = RenderGate::new();
        let path = Path::new("/tmp/video.mp4");

        let _permit = gate.acquire(path).unwrap();
        assert!(matches!(
            gate.acquire(path),
            Err(WorkerError::RenderBusy(_))
        ));
    }

    #[test]
    fn test_release_on_drop() {
        let gate = RenderGate::new();
        let path = Path::new("/tmp/video.mp4");

        {
            let _permit = gate.acquire(path).unwrap();
        }
        assert!(gate.acquire(path).is_ok());
    }

    #[test]
    fn test_different_sources_independent() {
        let gate = RenderGate::new();
        let _a = gate.acquire(Path::new("/tmp/a.mp4")).unwrap();
        let _b = gate.acquire(Path::new("/tmp/b.mp4")).unwrap();
    }
}
