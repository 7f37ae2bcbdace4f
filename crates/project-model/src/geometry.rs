//! Placement geometry: canvas-percentage rectangles, fractional crop boxes,
//! and fit modes.

use serde::{Deserialize, Serialize};

/// Top-left corner of a clip, in percent of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Clip size, in percent of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

/// A crop region within the source frame.
///
/// Coordinates are fractional: `(0.0, 0.0)` is top-left,
/// `(1.0, 1.0)` is bottom-right of the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for CropBox {
    fn default() -> Self {
        Self::FULL
    }
}

/// Minimum crop extent along either axis.
const MIN_CROP_FRACTION: f64 = 0.05;

impl CropBox {
    /// The full source frame (no crop).
    pub const FULL: CropBox = CropBox {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Clamp the box into `[0, 1]`, keeping at least 5% along each axis.
    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
            width: self.width.clamp(MIN_CROP_FRACTION, 1.0),
            height: self.height.clamp(MIN_CROP_FRACTION, 1.0),
        }
    }

    /// Resolve against a source frame of `src_w` x `src_h` pixels.
    ///
    /// The result is at least 2x2 and shifted to stay inside the frame.
    /// Returns `None` when the crop would keep the whole frame or the source
    /// dimensions are unusable.
    pub fn to_pixels(&self, src_w: u32, src_h: u32) -> Option<PixelRect> {
        if src_w <= 1 || src_h <= 1 {
            return None;
        }
        let c = self.clamped();
        let (sw, sh) = (src_w as f64, src_h as f64);

        let w = ((sw * c.width).round() as u32).clamp(2, src_w);
        let h = ((sh * c.height).round() as u32).clamp(2, src_h);
        let x = ((sw * c.x).round() as u32).min(src_w - w);
        let y = ((sh * c.y).round() as u32).min(src_h - h);

        if w >= src_w && h >= src_h && x == 0 && y == 0 {
            return None;
        }
        Some(PixelRect {
            x: x as i64,
            y: y as i64,
            width: w,
            height: h,
        })
    }
}

/// An integer rectangle in output or source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Largest overlay extent, as a multiple of the canvas extent.
pub const MAX_CANVAS_MULTIPLE: u32 = 4;

impl PixelRect {
    /// Resolve a percentage position/size against a canvas. Sizes are at
    /// least one pixel and at most [`MAX_CANVAS_MULTIPLE`] canvases.
    pub fn from_percent(position: Position, size: Size, canvas_w: u32, canvas_h: u32) -> Self {
        let (cw, ch) = (canvas_w as f64, canvas_h as f64);
        Self {
            x: (cw * position.x / 100.0).floor() as i64,
            y: (ch * position.y / 100.0).floor() as i64,
            width: extent(canvas_w, size.width),
            height: extent(canvas_h, size.height),
        }
    }
}

fn extent(canvas: u32, percent: f64) -> u32 {
    let limit = canvas as i64 * MAX_CANVAS_MULTIPLE as i64;
    ((canvas as f64 * percent / 100.0).floor() as i64)
        .min(limit)
        .max(1) as u32
}

/// How a source's aspect ratio maps into a target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FitMode {
    /// Scale to fit inside, letterboxing the remainder.
    #[default]
    Fit,
    /// Scale to cover, cropping the overflow.
    Fill,
    /// Non-uniform scale to the exact target size.
    Stretch,
}

impl From<String> for FitMode {
    fn from(value: String) -> Self {
        FitMode::parse(&value)
    }
}

impl FitMode {
    /// Parse a fit mode name; anything unrecognized is `Fit`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fill" => FitMode::Fill,
            "stretch" => FitMode::Stretch,
            _ => FitMode::Fit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Fit => "fit",
            FitMode::Fill => "fill",
            FitMode::Stretch => "stretch",
        }
    }
}
