//! Shape rasterization.
//!
//! Shapes are drawn into a transparent RGBA image at their pixel rect size
//! and then composited like any other still image.

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_ellipse_mut, draw_filled_rect_mut, draw_hollow_polygon_mut, draw_hollow_rect_mut,
    draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use montage_common::{MontageError, MontageResult};

use crate::color::shape_rgba;

/// Outline color for the optional white border.
const OUTLINE_RGBA: [u8; 4] = [255, 255, 255, 229];

/// Shape vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Filled rectangle; also the fallback for unknown names.
    Rectangle,
    /// Rectangle border only.
    Outline,
    Circle,
    /// Right-pointing block arrow.
    Arrow,
}

impl ShapeKind {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "circle" | "ellipse" => ShapeKind::Circle,
            "outline" => ShapeKind::Outline,
            "arrow" => ShapeKind::Arrow,
            _ => ShapeKind::Rectangle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSprite {
    pub kind: ShapeKind,
    pub width: u32,
    pub height: u32,
    pub fill: [u8; 4],
    /// Draw a white border around filled shapes.
    pub outline: bool,
}

impl ShapeSprite {
    pub fn new(kind: ShapeKind, width: u32, height: u32, color: Option<&str>, outline: bool) -> Self {
        Self {
            kind,
            width,
            height,
            fill: shape_rgba(color, 1.0),
            outline,
        }
    }
}

/// Pixel box the shape is drawn into, inset from the image edge.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl Bounds {
    fn shrink(&self, by: i32) -> Option<Self> {
        let shrunk = Self {
            x: self.x + by,
            y: self.y + by,
            width: self.width - 2 * by,
            height: self.height - 2 * by,
        };
        (shrunk.width > 0 && shrunk.height > 0).then_some(shrunk)
    }

    fn rect(&self) -> Rect {
        Rect::at(self.x, self.y).of_size(self.width as u32, self.height as u32)
    }

    fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Ellipse radii that keep the outermost pixel inside the box.
    fn radii(&self) -> (i32, i32) {
        ((self.width / 2 - 1).max(0), (self.height / 2 - 1).max(0))
    }
}

fn fill_ellipse(img: &mut RgbaImage, bounds: &Bounds, color: Rgba<u8>) {
    let (rx, ry) = bounds.radii();
    if rx > 0 && ry > 0 {
        draw_filled_ellipse_mut(img, bounds.center(), rx, ry, color);
    }
}

/// Draw the shape. The image is at least 2x2.
pub fn rasterize(sprite: &ShapeSprite) -> RgbaImage {
    let w = sprite.width.max(2);
    let h = sprite.height.max(2);
    let stroke = (w.min(h) / 20).max(2) as i32;
    let inset = (stroke / 2).max(1);
    let thin = (stroke / 2).max(1);
    let fill = Rgba(sprite.fill);
    let white = Rgba(OUTLINE_RGBA);

    let mut img = RgbaImage::new(w, h);
    let Some(bounds) = (Bounds {
        x: 0,
        y: 0,
        width: w as i32,
        height: h as i32,
    })
    .shrink(inset) else {
        return img;
    };

    match sprite.kind {
        ShapeKind::Rectangle => {
            if sprite.outline {
                draw_filled_rect_mut(&mut img, bounds.rect(), white);
                if let Some(inner) = bounds.shrink(thin) {
                    draw_filled_rect_mut(&mut img, inner.rect(), fill);
                }
            } else {
                draw_filled_rect_mut(&mut img, bounds.rect(), fill);
            }
        }
        ShapeKind::Outline => {
            for ring in (0..stroke).filter_map(|i| bounds.shrink(i)) {
                draw_hollow_rect_mut(&mut img, ring.rect(), fill);
            }
        }
        ShapeKind::Circle => {
            if sprite.outline {
                fill_ellipse(&mut img, &bounds, white);
                if let Some(inner) = bounds.shrink(stroke) {
                    fill_ellipse(&mut img, &inner, fill);
                }
            } else {
                fill_ellipse(&mut img, &bounds, fill);
            }
        }
        ShapeKind::Arrow => {
            let points = arrow_points(w, h);
            draw_polygon_mut(&mut img, &points, fill);
            if sprite.outline {
                let outline: Vec<Point<f32>> = points
                    .iter()
                    .map(|p| Point::new(p.x as f32, p.y as f32))
                    .collect();
                draw_hollow_polygon_mut(&mut img, &outline, white);
            }
        }
    }
    img
}

/// Block arrow: shaft from 22% to 78% of the height, head from 66% of the width.
fn arrow_points(w: u32, h: u32) -> Vec<Point<i32>> {
    let (wf, hf) = (w as f64, h as f64);
    let head = (wf * 0.66).floor() as i32;
    let top = (hf * 0.22).floor() as i32;
    let bottom = (hf * 0.78).floor() as i32;
    let (right, last_row) = (w as i32 - 1, h as i32 - 1);
    vec![
        Point::new(0, top),
        Point::new(head, top),
        Point::new(head, 0),
        Point::new(right, (hf * 0.5).floor() as i32),
        Point::new(head, last_row),
        Point::new(head, bottom),
        Point::new(0, bottom),
    ]
}

/// Rasterize and write a PNG.
pub fn write_png(sprite: &ShapeSprite, path: &Path) -> MontageResult<()> {
    rasterize(sprite)
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| {
            MontageError::resource(format!("Failed to write shape {}: {e}", path.display()))
        })?;
    tracing::debug!(
        shape = ?sprite.kind,
        width = sprite.width,
        height = sprite.height,
        path = %path.display(),
        "Shape rasterized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn sprite(kind: ShapeKind, w: u32, h: u32, outline: bool) -> ShapeSprite {
        ShapeSprite {
            kind,
            width: w,
            height: h,
            fill: RED,
            outline,
        }
    }

    fn alpha(img: &RgbaImage, x: u32, y: u32) -> u8 {
        img.get_pixel(x, y).0[3]
    }

    #[test]
    fn test_parse_shape_names() {
        assert_eq!(ShapeKind::parse("Circle"), ShapeKind::Circle);
        assert_eq!(ShapeKind::parse("arrow"), ShapeKind::Arrow);
        assert_eq!(ShapeKind::parse("outline"), ShapeKind::Outline);
        assert_eq!(ShapeKind::parse("square"), ShapeKind::Rectangle);
        assert_eq!(ShapeKind::parse("hexagon"), ShapeKind::Rectangle);
    }

    #[test]
    fn test_minimum_size() {
        let img = rasterize(&sprite(ShapeKind::Rectangle, 0, 1, false));
        assert_eq!(img.dimensions(), (2, 2));
    }

    #[test]
    fn test_rectangle_is_inset() {
        let img = rasterize(&sprite(ShapeKind::Rectangle, 100, 60, false));
        assert_eq!(alpha(&img, 0, 0), 0);
        assert_eq!(img.get_pixel(50, 30).0, RED);
        assert_eq!(img.get_pixel(98, 58).0, RED);
        assert_eq!(alpha(&img, 99, 59), 0);
    }

    #[test]
    fn test_rectangle_outline_is_white() {
        let img = rasterize(&sprite(ShapeKind::Rectangle, 100, 60, true));
        assert_eq!(img.get_pixel(1, 30).0, OUTLINE_RGBA);
        assert_eq!(img.get_pixel(50, 30).0, RED);
    }

    #[test]
    fn test_outline_has_hollow_center() {
        // stroke = max(2, 200 / 20) = 10
        let img = rasterize(&sprite(ShapeKind::Outline, 200, 200, false));
        assert_eq!(img.get_pixel(5, 100).0, RED);
        assert_eq!(alpha(&img, 100, 100), 0);
    }

    #[test]
    fn test_circle_corners_are_clear() {
        let img = rasterize(&sprite(ShapeKind::Circle, 80, 80, false));
        assert_eq!(alpha(&img, 2, 2), 0);
        assert_eq!(alpha(&img, 77, 77), 0);
        assert_eq!(img.get_pixel(40, 40).0, RED);
        assert_eq!(img.get_pixel(40, 5).0, RED);
    }

    #[test]
    fn test_circle_outline_ring() {
        let img = rasterize(&sprite(ShapeKind::Circle, 80, 80, true));
        assert_eq!(img.get_pixel(40, 4).0, OUTLINE_RGBA);
        assert_eq!(img.get_pixel(40, 40).0, RED);
    }

    #[test]
    fn test_arrow_shape() {
        let img = rasterize(&sprite(ShapeKind::Arrow, 100, 100, false));
        // shaft
        assert_eq!(img.get_pixel(10, 50).0, RED);
        assert_eq!(alpha(&img, 10, 10), 0);
        assert_eq!(alpha(&img, 10, 90), 0);
        // head
        assert_eq!(img.get_pixel(70, 10).0, RED);
        assert_eq!(img.get_pixel(95, 50).0, RED);
        assert_eq!(alpha(&img, 95, 10), 0);
    }

    #[test]
    fn test_write_png_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shape.png");
        write_png(&sprite(ShapeKind::Circle, 40, 20, true), &path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 20));
    }
}
