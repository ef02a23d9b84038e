//! Sprite-sheet packing and frame lookup.

use image::{Rgba, RgbaImage};

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::fingerprint::ContentKey;
use crate::sprite::pose::{AnimationState, Direction};

/// Largest atlas edge in pixels, the common GPU texture limit.
pub const MAX_ATLAS_EDGE: u32 = 16384;

/// Location of one captured frame inside the atlas image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub state: AnimationState,
    pub direction: Direction,
    pub frame_index: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One offscreen capture waiting to be packed.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub state: AnimationState,
    pub direction: Direction,
    pub frame_index: u32,
    pub image: RgbaImage,
}

/// Packed sprite sheet plus frame metadata. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteAtlas {
    key: ContentKey,
    image: RgbaImage,
    frame_width: u32,
    frame_height: u32,
    frames: Vec<FrameRecord>,
}

impl SpriteAtlas {
    /// Pack frames row-major into a near-square grid (`cols = ceil(sqrt(n))`).
    ///
    /// Every capture must be `frame_width x frame_height` and each `(state, direction, index)`
    /// may appear only once.
    pub fn pack(
        key: ContentKey,
        frame_width: u32,
        frame_height: u32,
        captures: &[CapturedFrame],
    ) -> ForgeResult<Self> {
        if captures.is_empty() {
            return Err(ForgeError::sprite("no frames to pack"));
        }
        if frame_width == 0 || frame_height == 0 {
            return Err(ForgeError::sprite("frame dimensions must be non-zero"));
        }
        let (cols, rows) = grid_for(captures.len());
        let width = cols
            .checked_mul(frame_width)
            .ok_or_else(|| ForgeError::sprite("atlas width overflows"))?;
        let height = rows
            .checked_mul(frame_height)
            .ok_or_else(|| ForgeError::sprite("atlas height overflows"))?;
        if width > MAX_ATLAS_EDGE || height > MAX_ATLAS_EDGE {
            return Err(ForgeError::sprite(format!(
                "atlas {width}x{height} exceeds {MAX_ATLAS_EDGE}px"
            )));
        }

        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let mut frames = Vec::with_capacity(captures.len());
        for (i, cap) in captures.iter().enumerate() {
            if cap.image.dimensions() != (frame_width, frame_height) {
                return Err(ForgeError::sprite(format!(
                    "frame {}/{}/{} is {:?}, expected {frame_width}x{frame_height}",
                    cap.state,
                    cap.direction,
                    cap.frame_index,
                    cap.image.dimensions()
                )));
            }
            if frames.iter().any(|f: &FrameRecord| {
                f.state == cap.state
                    && f.direction == cap.direction
                    && f.frame_index == cap.frame_index
            }) {
                return Err(ForgeError::sprite(format!(
                    "duplicate frame {}/{}/{}",
                    cap.state, cap.direction, cap.frame_index
                )));
            }
            let i = i as u32;
            let x = (i % cols) * frame_width;
            let y = (i / cols) * frame_height;
            for (px, py, pixel) in cap.image.enumerate_pixels() {
                image.put_pixel(x + px, y + py, *pixel);
            }
            frames.push(FrameRecord {
                state: cap.state,
                direction: cap.direction,
                frame_index: cap.frame_index,
                x,
                y,
                width: frame_width,
                height: frame_height,
            });
        }

        Ok(Self {
            key,
            image,
            frame_width,
            frame_height,
            frames,
        })
    }

    /// Rebuild from stored parts, checking that every record lies inside the image.
    pub fn from_parts(
        key: ContentKey,
        image: RgbaImage,
        frame_width: u32,
        frame_height: u32,
        frames: Vec<FrameRecord>,
    ) -> ForgeResult<Self> {
        let (w, h) = image.dimensions();
        for f in &frames {
            let fits = f.x.checked_add(f.width).is_some_and(|r| r <= w)
                && f.y.checked_add(f.height).is_some_and(|b| b <= h);
            if !fits {
                return Err(ForgeError::sprite(format!(
                    "frame {}/{}/{} lies outside the {w}x{h} atlas",
                    f.state, f.direction, f.frame_index
                )));
            }
        }
        Ok(Self {
            key,
            image,
            frame_width,
            frame_height,
            frames,
        })
    }

    pub fn key(&self) -> ContentKey {
        self.key
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn frame(
        &self,
        state: AnimationState,
        direction: Direction,
        frame_index: u32,
    ) -> Option<&FrameRecord> {
        self.frames.iter().find(|f| {
            f.state == state && f.direction == direction && f.frame_index == frame_index
        })
    }

    /// Copy one frame out of the sheet.
    pub fn frame_image(
        &self,
        state: AnimationState,
        direction: Direction,
        frame_index: u32,
    ) -> Option<RgbaImage> {
        let f = self.frame(state, direction, frame_index)?;
        Some(image::imageops::crop_imm(&self.image, f.x, f.y, f.width, f.height).to_image())
    }
}

/// `(cols, rows)` of the packing grid for `n` frames.
pub fn grid_for(n: usize) -> (u32, u32) {
    if n == 0 {
        return (0, 0);
    }
    let mut cols = (n as f64).sqrt().ceil() as usize;
    // Guard against float rounding for perfect squares.
    while cols > 1 && (cols - 1) * (cols - 1) >= n {
        cols -= 1;
    }
    let rows = n.div_ceil(cols);
    (cols as u32, rows as u32)
}

#[cfg(test)]
#[path = "../../tests/unit/sprite/atlas.rs"]
mod tests;
