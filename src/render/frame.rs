use image::RgbaImage;

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;

/// One rendered frame, RGBA8 row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)` as stored.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Count of pixels with non-zero alpha.
    pub fn covered_pixels(&self) -> usize {
        self.data.chunks_exact(4).filter(|px| px[3] != 0).count()
    }

    /// Straight-alpha copy of this frame.
    pub fn to_straight(&self) -> FrameRGBA {
        let mut data = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut data);
        }
        FrameRGBA {
            width: self.width,
            height: self.height,
            data,
            premultiplied: false,
        }
    }

    /// Straight-alpha image, ready for PNG encoding.
    pub fn to_rgba_image(&self) -> ForgeResult<RgbaImage> {
        let straight = self.to_straight();
        RgbaImage::from_raw(straight.width, straight.height, straight.data)
            .ok_or_else(|| ForgeError::render("frame buffer size does not match its dimensions"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
