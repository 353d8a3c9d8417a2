//! Motion detection: frame differencing and per-region activation.

mod activation;
mod differ;

use std::{fs, path::PathBuf};

use chrono::Utc;
use knightcam_types::{config::VisionConfig, frame::MotionMask, KnightcamError, Result};
use tracing::debug;

pub use activation::{ActiveSet, RegionActivation, ACTIVATION_THRESHOLD};
pub use differ::{FrameDiffer, MOTION_DELTA_THRESHOLD};

/// Writes motion masks to disk for offline inspection.
pub struct MaskRecorder {
    capture_dir: Option<PathBuf>,
}

impl MaskRecorder {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            capture_dir: config.capture_dir.as_ref().map(PathBuf::from),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capture_dir.is_some()
    }

    /// Saves `mask` as a PNG tagged with `label`. Returns `None` when no
    /// capture directory is configured.
    pub fn persist(&self, mask: &MotionMask, label: &str) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.capture_dir else {
            return Ok(None);
        };

        fs::create_dir_all(dir).map_err(|err| {
            vision_error(format!("failed to create capture dir {:?}: {err}", dir))
        })?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let path = dir.join(format!("mask_{label}_{timestamp}.png"));
        mask.to_gray_image()
            .save(&path)
            .map_err(|err| vision_error(format!("failed to save mask: {err}")))?;
        debug!("Saved motion mask to {:?}", path);
        Ok(Some(path))
    }
}

pub fn vision_error(message: impl Into<String>) -> KnightcamError {
    KnightcamError::Vision(message.into())
}
