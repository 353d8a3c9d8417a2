//! Camera abstraction layer: where frames come from.

mod sequence;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use async_trait::async_trait;
use knightcam_types::{
    config::{CameraConfig, MotionPattern},
    frame::Frame,
    region::{default_regions, Rect, Region},
    KnightcamError, Result,
};
use tracing::{debug, info};

pub use sequence::ImageSequenceCamera;

/// Aggregated capture counters.
#[derive(Debug, Default, Clone)]
pub struct CameraMetrics {
    pub frames_delivered: u64,
    pub failed_reads: u64,
    pub last_capture_us: Option<u64>,
}

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Opens the stream. Failure means the camera is unavailable.
    async fn connect(&mut self) -> Result<()>;
    /// Next frame, or `None` once the stream has stopped.
    async fn capture_frame(&self) -> Result<Option<Frame>>;
    /// Frame size, known after a successful `connect`.
    fn resolution(&self) -> Option<(u32, u32)>;
    fn metrics(&self) -> CameraMetrics;
}

const BACKGROUND: [u8; 3] = [70, 82, 96];
const OCCLUDER: [u8; 3] = [230, 190, 160];

/// Generated camera feed: a still background with a scripted hand waving
/// over the buttons.
pub struct SyntheticCamera {
    config: CameraConfig,
    regions: Vec<Region>,
    background: Frame,
    frame_index: AtomicU64,
    frame_limit: Option<u64>,
    connected: AtomicBool,
    metrics: Arc<Mutex<CameraMetrics>>,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        let background = Frame::solid(config.width, config.height, BACKGROUND);
        Self {
            config,
            regions: default_regions(),
            background,
            frame_index: AtomicU64::new(0),
            frame_limit: None,
            connected: AtomicBool::new(false),
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        }
    }

    /// Stops the stream after `limit` frames.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Region the hand is over for frame `index`, if any.
    fn occluded_region(&self, index: u64) -> Option<usize> {
        match self.config.pattern {
            MotionPattern::Still => None,
            MotionPattern::Wander { dwell_frames } => {
                let dwell = u64::from(dwell_frames.max(1));
                Some(((index / dwell) % self.regions.len() as u64) as usize)
            }
            MotionPattern::Fixed { region } => Some(region),
        }
    }

    fn occluder_rect(&self, region: usize) -> Option<Rect> {
        self.regions
            .get(region)
            .map(|r| r.rect(self.config.width, self.config.height))
    }

    fn render(&self, index: u64) -> Frame {
        // The hand is drawn on every other frame so consecutive frames differ.
        let waving = index % 2 == 0;
        match self.occluded_region(index).and_then(|r| self.occluder_rect(r)) {
            Some(rect) if waving => self.background.with_patch(rect, OCCLUDER),
            _ => self.background.clone(),
        }
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    async fn connect(&mut self) -> Result<()> {
        info!(
            "Starting synthetic camera {}x{} @ {}fps ({:?})",
            self.config.width, self.config.height, self.config.fps, self.config.pattern
        );
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Option<Frame>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(camera_error("synthetic camera is not connected"));
        }
        let start = Instant::now();
        let index = self.frame_index.fetch_add(1, Ordering::SeqCst);
        if self.frame_limit.is_some_and(|limit| index >= limit) {
            debug!("Synthetic camera reached its frame limit");
            return Ok(None);
        }
        let frame = self.render(index);
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| camera_error("failed to lock metrics"))?;
        metrics.frames_delivered += 1;
        metrics.last_capture_us = Some(start.elapsed().as_micros() as u64);
        Ok(Some(frame))
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        self.connected
            .load(Ordering::SeqCst)
            .then_some((self.config.width, self.config.height))
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Generate an error aligned with camera semantics.
pub fn camera_error(message: impl Into<String>) -> KnightcamError {
    KnightcamError::Camera(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use knightcam_types::config::CameraSource;

    fn config(pattern: MotionPattern) -> CameraConfig {
        CameraConfig {
            source: CameraSource::Synthetic,
            width: 320,
            height: 240,
            fps: 30,
            frames_dir: None,
            pattern,
        }
    }

    #[tokio::test]
    async fn capture_requires_connect() {
        let camera = SyntheticCamera::new(config(MotionPattern::Still));
        assert!(camera.resolution().is_none());
        assert!(matches!(
            camera.capture_frame().await,
            Err(KnightcamError::Camera(_))
        ));
    }

    #[tokio::test]
    async fn still_pattern_repeats_background() {
        let mut camera = SyntheticCamera::new(config(MotionPattern::Still));
        camera.connect().await.unwrap();
        let a = camera.capture_frame().await.unwrap().unwrap();
        let b = camera.capture_frame().await.unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(camera.resolution(), Some((320, 240)));
        assert_eq!(camera.metrics().frames_delivered, 2);
    }

    #[tokio::test]
    async fn fixed_pattern_waves_over_region() {
        let mut camera = SyntheticCamera::new(config(MotionPattern::Fixed { region: 2 }));
        camera.connect().await.unwrap();
        let rect = default_regions()[2].rect(320, 240);
        let first = camera.capture_frame().await.unwrap().unwrap();
        let second = camera.capture_frame().await.unwrap().unwrap();
        let (cx, cy) = (rect.x + rect.width / 2, rect.y + rect.height / 2);
        assert_eq!(first.pixel(cx, cy), Some([230, 190, 160, 255]));
        assert_eq!(second.pixel(cx, cy), Some([70, 82, 96, 255]));
        assert_eq!(first.pixel(0, 239), second.pixel(0, 239));
    }

    #[test]
    fn wander_moves_between_regions() {
        let camera = SyntheticCamera::new(config(MotionPattern::Wander { dwell_frames: 4 }));
        assert_eq!(camera.occluded_region(0), Some(0));
        assert_eq!(camera.occluded_region(5), Some(1));
        assert_eq!(camera.occluded_region(11), Some(2));
        assert_eq!(camera.occluded_region(12), Some(0));
    }

    #[tokio::test]
    async fn frame_limit_stops_stream() {
        let mut camera = SyntheticCamera::new(config(MotionPattern::Still)).with_frame_limit(2);
        camera.connect().await.unwrap();
        assert!(camera.capture_frame().await.unwrap().is_some());
        assert!(camera.capture_frame().await.unwrap().is_some());
        assert!(camera.capture_frame().await.unwrap().is_none());
    }
}
