use image::{GrayImage, Luma, RgbaImage};

use crate::{region::Rect, KnightcamError, Result};

/// Bytes per pixel in a [`Frame`] buffer (RGBA).
pub const CHANNELS: usize = 4;

/// Immutable RGBA pixel grid produced once per render tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if data.len() != expected {
            return Err(KnightcamError::InvalidFrame(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame filled with a single opaque colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixel = [rgb[0], rgb[1], rgb[2], 255];
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * CHANNELS)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        let px = &self.data[idx..idx + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Returns a copy with every pixel inside `rect` replaced by `rgb`.
    /// Pixels of `rect` outside the frame are ignored.
    pub fn with_patch(&self, rect: Rect, rgb: [u8; 3]) -> Self {
        let mut data = self.data.clone();
        let clipped = rect.clip_to(self.width, self.height);
        for y in clipped.y..clipped.y + clipped.height {
            for x in clipped.x..clipped.x + clipped.width {
                let idx = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
                data[idx] = rgb[0];
                data[idx + 1] = rgb[1];
                data[idx + 2] = rgb[2];
            }
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn into_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// Binary per-pixel motion classification between two frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl MotionMask {
    pub fn new(width: u32, height: u32, bits: Vec<bool>) -> Result<Self> {
        if bits.len() != (width as usize) * (height as usize) {
            return Err(KnightcamError::InvalidFrame(format!(
                "mask of {width}x{height} needs {} cells, got {}",
                (width as usize) * (height as usize),
                bits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_motion(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn motion_count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Motion pixels inside `rect`, clipped to the mask bounds.
    pub fn count_in(&self, rect: Rect) -> usize {
        let clipped = rect.clip_to(self.width, self.height);
        let row_len = self.width as usize;
        (clipped.y..clipped.y + clipped.height)
            .map(|y| {
                let start = (y as usize) * row_len + clipped.x as usize;
                let end = start + clipped.width as usize;
                self.bits[start..end].iter().filter(|b| **b).count()
            })
            .sum()
    }

    /// White-on-black rendering for debug dumps.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.is_motion(x, y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}
