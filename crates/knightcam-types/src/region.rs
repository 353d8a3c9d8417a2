use serde::{Deserialize, Serialize};

use crate::{KnightcamError, Result};

/// Smallest frame the default layout is guaranteed to fit.
pub const MIN_FRAME_WIDTH: u32 = 160;
pub const MIN_FRAME_HEIGHT: u32 = 120;

/// Gap between buttons and the frame edge, in pixels.
pub const BUTTON_PADDING: u32 = 10;

pub const REGION_COUNT: usize = 3;

/// Axis-aligned rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }

    /// Intersection with `[0, width) x [0, height)`. Empty when disjoint.
    pub fn clip_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.right().min(u64::from(width)) as u32;
        let bottom = self.bottom().min(u64::from(height)) as u32;
        Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }
}

/// Logical action a region stands for. The core only uses it as a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionAction {
    Capture,
    Grayscale,
    Save,
    Custom(String),
}

impl RegionAction {
    pub fn label(&self) -> &str {
        match self {
            RegionAction::Capture => "capture",
            RegionAction::Grayscale => "grayscale",
            RegionAction::Save => "save",
            RegionAction::Custom(label) => label,
        }
    }
}

/// Where the target indicator is drawn relative to the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideHint {
    Left,
    Center,
    Right,
}

/// Computes a region's rectangle from the current frame size.
pub type LayoutFn = fn(u32, u32) -> Rect;

/// Named interaction zone on the frame.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub action: RegionAction,
    pub side: SideHint,
    layout: LayoutFn,
}

impl Region {
    pub fn new(
        name: impl Into<String>,
        action: RegionAction,
        side: SideHint,
        layout: LayoutFn,
    ) -> Self {
        Self {
            name: name.into(),
            action,
            side,
            layout,
        }
    }

    pub fn rect(&self, frame_width: u32, frame_height: u32) -> Rect {
        (self.layout)(frame_width, frame_height)
    }
}

fn button_size(frame_width: u32, frame_height: u32) -> (u32, u32) {
    (frame_width / 4, frame_height / 6)
}

fn capture_layout(frame_width: u32, frame_height: u32) -> Rect {
    let (w, h) = button_size(frame_width, frame_height);
    Rect::new(frame_width.saturating_sub(w) / 2, BUTTON_PADDING, w, h)
}

fn grayscale_layout(frame_width: u32, frame_height: u32) -> Rect {
    let (w, h) = button_size(frame_width, frame_height);
    Rect::new(BUTTON_PADDING, BUTTON_PADDING * 2 + h, w, h)
}

fn save_layout(frame_width: u32, frame_height: u32) -> Rect {
    let (w, h) = button_size(frame_width, frame_height);
    Rect::new(
        frame_width.saturating_sub(w + BUTTON_PADDING),
        BUTTON_PADDING * 2 + h,
        w,
        h,
    )
}

/// The three buttons: capture centered on top, grayscale and save on the
/// second row against the left and right edges.
pub fn default_regions() -> Vec<Region> {
    vec![
        Region::new(
            "capture",
            RegionAction::Capture,
            SideHint::Center,
            capture_layout,
        ),
        Region::new(
            "grayscale",
            RegionAction::Grayscale,
            SideHint::Left,
            grayscale_layout,
        ),
        Region::new("save", RegionAction::Save, SideHint::Right, save_layout),
    ]
}

/// Lays out every region for one frame size.
pub fn layout_rects(regions: &[Region], frame_width: u32, frame_height: u32) -> Vec<Rect> {
    regions
        .iter()
        .map(|region| region.rect(frame_width, frame_height))
        .collect()
}

/// Fails when any region leaves the frame or the frame is below the
/// supported minimum.
pub fn validate_layout(regions: &[Region], frame_width: u32, frame_height: u32) -> Result<()> {
    if regions.is_empty() {
        return Err(KnightcamError::Layout("no regions defined".into()));
    }
    if frame_width < MIN_FRAME_WIDTH || frame_height < MIN_FRAME_HEIGHT {
        return Err(KnightcamError::Layout(format!(
            "frame {frame_width}x{frame_height} is below the supported minimum {MIN_FRAME_WIDTH}x{MIN_FRAME_HEIGHT}"
        )));
    }
    for region in regions {
        let rect = region.rect(frame_width, frame_height);
        if rect.area() == 0 || !rect.fits_within(frame_width, frame_height) {
            return Err(KnightcamError::Layout(format!(
                "region '{}' at {:?} does not fit a {frame_width}x{frame_height} frame",
                region.name, rect
            )));
        }
    }
    Ok(())
}
