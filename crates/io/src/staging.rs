// Scratch copy of an uploaded file, removed when the guard drops

use std::path::{Path, PathBuf};

use payadj_recon::AdjustError;
use tracing::{debug, warn};

const STAGED_PREFIX: &str = "batch-adjustments-";

/// An uploaded file written to the staging directory. The file is removed
/// when this value is dropped, whichever way the invocation ends. A failed
/// removal is logged and never surfaces to the caller.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Write `bytes` to `<dir>/batch-adjustments-<uuid><extension>`.
    pub fn write(dir: &Path, extension: &str, bytes: &[u8]) -> Result<Self, AdjustError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| {
                AdjustError::Io(format!("cannot create staging dir {}: {}", dir.display(), e))
            })?;
        let path = dir.join(format!("{}{}{}", STAGED_PREFIX, uuid::Uuid::new_v4(), extension));
        std::fs::write(&path, bytes)
            .map_err(|e| {
                AdjustError::Io(format!("cannot stage upload {}: {}", path.display(), e))
            })?;
        debug!(path = %path.display(), bytes = bytes.len(), "upload staged");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staged upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove staged upload")
            }
        }
    }
}

/// Staging directory: the configured one, else the system temp dir.
pub fn staging_dir(configured: Option<&str>) -> PathBuf {
    match configured {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}
