use knightcam_types::{frame::MotionMask, region::Rect};
use serde::Serialize;

/// Fraction of a region's pixels that must be in motion, strictly exceeded,
/// for the region to count as touched.
pub const ACTIVATION_THRESHOLD: f64 = 0.15;

/// Regions active in one tick, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveSet {
    indices: Vec<usize>,
}

impl ActiveSet {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Single region credited for the tick: the last declared one when
    /// several are active at once.
    pub fn winner(&self) -> Option<usize> {
        self.indices.last().copied()
    }
}

/// Per-region motion ratio thresholding.
#[derive(Debug, Clone, Copy)]
pub struct RegionActivation {
    threshold: f64,
}

impl Default for RegionActivation {
    fn default() -> Self {
        Self {
            threshold: ACTIVATION_THRESHOLD,
        }
    }
}

impl RegionActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Motion pixels inside `rect` over its full area. Pixels outside the
    /// mask are never counted; an empty rect yields 0.
    pub fn ratio(mask: &MotionMask, rect: Rect) -> f64 {
        let area = rect.area();
        if area == 0 {
            return 0.0;
        }
        mask.count_in(rect) as f64 / area as f64
    }

    pub fn ratios(mask: &MotionMask, rects: &[Rect]) -> Vec<f64> {
        rects.iter().map(|rect| Self::ratio(mask, *rect)).collect()
    }

    pub fn activate(&self, mask: &MotionMask, rects: &[Rect]) -> ActiveSet {
        let indices = rects
            .iter()
            .enumerate()
            .filter(|(_, rect)| Self::ratio(mask, **rect) > self.threshold)
            .map(|(index, _)| index)
            .collect();
        ActiveSet { indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x10 mask with the given cells set.
    fn mask_with(cells: &[(u32, u32)]) -> MotionMask {
        let mut bits = vec![false; 200];
        for (x, y) in cells {
            bits[(*y as usize) * 20 + *x as usize] = true;
        }
        MotionMask::new(20, 10, bits).expect("mask")
    }

    fn fill(rect: Rect, count: usize) -> Vec<(u32, u32)> {
        (rect.y..rect.y + rect.height)
            .flat_map(|y| (rect.x..rect.x + rect.width).map(move |x| (x, y)))
            .take(count)
            .collect()
    }

    #[test]
    fn ratio_boundary_is_strict() {
        let rect = Rect::new(0, 0, 10, 10);
        let activation = RegionActivation::new();

        let exactly = mask_with(&fill(rect, 15));
        assert_eq!(RegionActivation::ratio(&exactly, rect), 0.15);
        assert!(activation.activate(&exactly, &[rect]).is_empty());

        let above = mask_with(&fill(rect, 16));
        assert_eq!(activation.activate(&above, &[rect]).indices(), &[0]);
    }

    #[test]
    fn last_declared_region_wins_ties() {
        let left = Rect::new(0, 0, 10, 10);
        let right = Rect::new(10, 0, 10, 10);
        let mut cells = fill(left, 50);
        cells.extend(fill(right, 20));
        let mask = mask_with(&cells);

        let active = RegionActivation::new().activate(&mask, &[left, right]);
        assert_eq!(active.indices(), &[0, 1]);
        assert_eq!(active.winner(), Some(1));
    }

    #[test]
    fn out_of_bounds_pixels_dilute_the_ratio() {
        // Half of the rect hangs off the mask; its full area is the denominator.
        let rect = Rect::new(15, 0, 10, 10);
        let mask = mask_with(&fill(Rect::new(15, 0, 5, 10), 50));
        assert_eq!(RegionActivation::ratio(&mask, rect), 0.5);
        let offscreen = Rect::new(40, 40, 5, 5);
        assert_eq!(RegionActivation::ratio(&mask, offscreen), 0.0);
    }

    #[test]
    fn empty_rect_never_activates() {
        let mask = mask_with(&fill(Rect::new(0, 0, 20, 10), 200));
        let active = RegionActivation::new().activate(&mask, &[Rect::new(3, 3, 0, 4)]);
        assert!(active.is_empty());
        assert_eq!(active.winner(), None);
    }
}
