//! Frame archive - writes captured frames to disk for inspection

use std::path::{Path, PathBuf};

use tracing::info;

use sculpt_core::{CaptureSet, Frame, SculptResult};

/// Directory of `angle_NNN.<ext>` image files
#[derive(Debug, Clone)]
pub struct FrameArchive {
    dir: PathBuf,
}

impl FrameArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FrameArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a frame
    pub fn file_name(frame: &Frame) -> String {
        format!("angle_{:03}.{}", frame.angle_index().0, frame.extension())
    }

    /// Write every frame in angle order, creating the directory if needed.
    /// Returns the written paths.
    pub async fn write_set(&self, set: &CaptureSet) -> SculptResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut written = Vec::with_capacity(set.len());
        for frame in set.frames() {
            let path = self.dir.join(Self::file_name(frame));
            tokio::fs::write(&path, frame.image()).await?;
            written.push(path);
        }

        info!(dir = %self.dir.display(), frames = written.len(), "capture set archived");
        Ok(written)
    }
}
