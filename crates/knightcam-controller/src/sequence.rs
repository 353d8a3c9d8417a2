use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Instant,
};

use async_trait::async_trait;
use image::ImageFormat;
use knightcam_types::{frame::Frame, Result};
use tracing::{debug, info, warn};

use crate::{camera_error, CameraMetrics, FrameSource};

/// Replays a directory of PNG stills, in file-name order, as a camera feed.
pub struct ImageSequenceCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: Mutex<usize>,
    resolution: Option<(u32, u32)>,
    metrics: Arc<Mutex<CameraMetrics>>,
}

impl ImageSequenceCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: Mutex::new(0),
            resolution: None,
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        }
    }

    async fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|err| {
            camera_error(format!("cannot open frame directory {:?}: {err}", dir))
        })?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| camera_error(format!("failed to list {:?}: {err}", dir)))?
        {
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if is_png {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn decode(path: &Path) -> Result<Frame> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|err| camera_error(format!("failed to read {:?}: {err}", path)))?;
        let img = image::load_from_memory_with_format(&raw, ImageFormat::Png)
            .map_err(|err| camera_error(format!("failed to decode {:?}: {err}", path)))?;
        Ok(Frame::from(img.to_rgba8()))
    }

    fn next_path(&self) -> Result<Option<PathBuf>> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| camera_error("failed to lock frame cursor"))?;
        let path = self.files.get(*cursor).cloned();
        if path.is_some() {
            *cursor += 1;
        }
        Ok(path)
    }

    fn record(&self, result: &Result<Frame>, start: Instant) {
        if let Ok(mut guard) = self.metrics.lock() {
            match result {
                Ok(_) => {
                    guard.frames_delivered += 1;
                    guard.last_capture_us = Some(start.elapsed().as_micros() as u64);
                }
                Err(_) => guard.failed_reads += 1,
            }
        }
    }
}

#[async_trait]
impl FrameSource for ImageSequenceCamera {
    async fn connect(&mut self) -> Result<()> {
        let files = Self::list_frames(&self.dir).await?;
        let Some(first) = files.first() else {
            return Err(camera_error(format!("no PNG frames in {:?}", self.dir)));
        };
        let probe = Self::decode(first).await?;
        self.resolution = Some(probe.dimensions());
        info!(
            "Replaying {} frames from {:?} at {}x{}",
            files.len(),
            self.dir,
            probe.width(),
            probe.height()
        );
        self.files = files;
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Option<Frame>> {
        if self.resolution.is_none() {
            return Err(camera_error("image sequence is not connected"));
        }
        let Some(path) = self.next_path()? else {
            debug!("Image sequence exhausted");
            return Ok(None);
        };
        let start = Instant::now();
        let result = Self::decode(&path).await;
        self.record(&result, start);
        let frame = result?;
        if Some(frame.dimensions()) != self.resolution {
            warn!(
                "Frame {:?} is {}x{}, stream started at {:?}",
                path,
                frame.width(),
                frame.height(),
                self.resolution
            );
        }
        Ok(Some(frame))
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}
