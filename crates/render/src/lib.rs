//! Visual masking of image regions.
//!
//! Both styles work on the part of the rectangle that lies inside the image.
//! Rectangles that clip to nothing are ignored.

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Gaussian kernel edge, in pixels
pub const DEFAULT_BLUR_KERNEL: u32 = 51;
const MIN_BLUR_KERNEL: u32 = 3;

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Intersection with a `width` x `height` image as `(x, y, w, h)`
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.is_empty() {
            return None;
        }

        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.w)).min(i64::from(width));
        let y1 = (i64::from(self.y) + i64::from(self.h)).min(i64::from(height));

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// Masking technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaskStyle {
    /// Gaussian blur
    #[default]
    Blur,
    /// Solid black fill
    #[serde(alias = "black")]
    Blackout,
}

impl fmt::Display for MaskStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskStyle::Blur => write!(f, "blur"),
            MaskStyle::Blackout => write!(f, "blackout"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown mask style: {0}")]
pub struct ParseMaskStyleError(String);

impl FromStr for MaskStyle {
    type Err = ParseMaskStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(MaskStyle::Blur),
            "black" | "blackout" => Ok(MaskStyle::Blackout),
            _ => Err(ParseMaskStyleError(s.to_string())),
        }
    }
}

/// Applies masks with a fixed blur kernel
#[derive(Debug, Clone, Copy)]
pub struct Redactor {
    blur_kernel: u32,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_KERNEL)
    }
}

impl Redactor {
    /// Even kernels are rounded up to the next odd size.
    pub fn new(blur_kernel: u32) -> Self {
        let k = blur_kernel.max(MIN_BLUR_KERNEL);
        let k = if k % 2 == 0 { k + 1 } else { k };
        Self { blur_kernel: k }
    }

    pub fn blur_kernel(&self) -> u32 {
        self.blur_kernel
    }

    /// Gaussian sigma for the kernel, same rule OpenCV uses for sigma = 0
    pub fn blur_sigma(&self) -> f32 {
        0.3 * ((self.blur_kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Mask `rect` in place. Returns false when the rectangle clipped to nothing.
    pub fn apply_mask(&self, image: &mut RgbImage, rect: Rect, style: MaskStyle) -> bool {
        let Some((x, y, w, h)) = rect.clip(image.width(), image.height()) else {
            log::debug!("[Render] skipping empty region {:?}", rect);
            return false;
        };

        match style {
            MaskStyle::Blackout => blackout(image, x, y, w, h),
            MaskStyle::Blur => self.blur(image, x, y, w, h),
        }
        true
    }

    fn blur(&self, image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
        let region = imageops::crop_imm(image, x, y, w, h).to_image();
        let blurred = imageproc::filter::gaussian_blur_f32(&region, self.blur_sigma());
        imageops::replace(image, &blurred, i64::from(x), i64::from(y));
    }
}

fn blackout(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    let rect = imageproc::rect::Rect::at(x as i32, y as i32).of_size(w, h);
    draw_filled_rect_mut(image, rect, Rgb([0u8, 0u8, 0u8]));
}

/// Mask with the default blur kernel
pub fn apply_mask(image: &mut RgbImage, rect: Rect, style: MaskStyle) -> bool {
    Redactor::default().apply_mask(image, rect, style)
}
