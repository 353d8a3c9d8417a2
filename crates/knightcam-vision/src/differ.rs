use knightcam_types::{
    frame::{Frame, MotionMask, CHANNELS},
    KnightcamError, Result,
};

/// Per-pixel RGB delta (sum of absolute channel differences) above which a
/// pixel counts as motion.
pub const MOTION_DELTA_THRESHOLD: u16 = 50;

/// Binary motion mask between two consecutive frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDiffer;

impl FrameDiffer {
    pub fn new() -> Self {
        Self
    }

    pub fn diff(&self, previous: &Frame, current: &Frame) -> Result<MotionMask> {
        if previous.dimensions() != current.dimensions() {
            return Err(KnightcamError::DimensionMismatch {
                previous: previous.dimensions(),
                current: current.dimensions(),
            });
        }
        let bits = previous
            .data()
            .chunks_exact(CHANNELS)
            .zip(current.data().chunks_exact(CHANNELS))
            .map(|(prev, cur)| pixel_delta(prev, cur) > MOTION_DELTA_THRESHOLD)
            .collect();
        MotionMask::new(current.width(), current.height(), bits)
    }
}

/// Alpha is ignored.
fn pixel_delta(prev: &[u8], cur: &[u8]) -> u16 {
    prev[..3]
        .iter()
        .zip(&cur[..3])
        .map(|(a, b)| u16::from(a.abs_diff(*b)))
        .sum()
}
