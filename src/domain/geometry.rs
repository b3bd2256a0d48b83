//! Page geometry and colour value types
//!
//! Coordinates are in page space with the origin at the top-left corner and
//! `y` growing downwards, which is how text extraction reports block boxes.

use serde::{Deserialize, Serialize};

/// A point in page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point
    pub fn manhattan(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// An axis-aligned rectangle given by its top-left and bottom-right corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    /// Create a new rectangle from its four coordinates
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Create a rectangle from position and size
    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Get the height
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Top-left corner
    pub fn top_left(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    /// Bottom-left corner, the text baseline anchor
    pub fn bottom_left(&self) -> Point {
        Point::new(self.x0, self.y1)
    }

    /// Get the center point
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// A rectangle with no area
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Grow the rectangle by `by` on every side
    pub fn inflate(&self, by: f64) -> Self {
        Self::new(self.x0 - by, self.y0 - by, self.x1 + by, self.y1 + by)
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Self {
        Self::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Bounding envelope of a set of rectangles
    pub fn envelope<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Self> {
        rects.into_iter().fold(None, |acc: Option<Rect>, r| match acc {
            Some(a) => Some(a.union(r)),
            None => Some(*r),
        })
    }

    /// Whether a point lies inside the rectangle (edges inclusive)
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }
}

/// A quadrilateral returned by text search, corners in reading order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub ul: Point,
    pub ur: Point,
    pub ll: Point,
    pub lr: Point,
}

impl Quad {
    /// Axis-aligned quad covering a rectangle
    pub fn from_rect(r: &Rect) -> Self {
        Self {
            ul: Point::new(r.x0, r.y0),
            ur: Point::new(r.x1, r.y0),
            ll: Point::new(r.x0, r.y1),
            lr: Point::new(r.x1, r.y1),
        }
    }

    /// Axis-aligned bounding rectangle
    pub fn rect(&self) -> Rect {
        let xs = [self.ul.x, self.ur.x, self.ll.x, self.lr.x];
        let ys = [self.ul.y, self.ur.y, self.ll.y, self.lr.y];
        Rect::new(
            xs.iter().copied().fold(f64::INFINITY, f64::min),
            ys.iter().copied().fold(f64::INFINITY, f64::min),
            xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    }
}

/// An RGB colour with channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Decode a packed `0xRRGGBB` colour as reported by text extraction
    pub fn from_packed(color: u32) -> Self {
        Self::new(
            ((color >> 16) & 0xFF) as f32 / 255.0,
            ((color >> 8) & 0xFF) as f32 / 255.0,
            (color & 0xFF) as f32 / 255.0,
        )
    }

    /// Perceptual luminance on the 0-255 scale
    pub fn luminance_u8(r: u8, g: u8, b: u8) -> f64 {
        0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 50.0);

        let center = rect.center();
        assert_eq!(center.x, 60.0);
        assert_eq!(center.y, 45.0);
    }

    #[test]
    fn test_rect_from_position_and_size() {
        let rect = Rect::from_position_and_size(10.0, 20.0, 50.0, 30.0);
        assert_eq!(rect, Rect::new(10.0, 20.0, 60.0, 50.0));
    }

    #[test]
    fn test_inflate() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0).inflate(1.5);
        assert_eq!(rect, Rect::new(8.5, 8.5, 21.5, 21.5));
    }

    #[test]
    fn test_envelope() {
        let rects = [
            Rect::new(10.0, 10.0, 12.0, 20.0),
            Rect::new(12.0, 9.0, 15.0, 19.0),
            Rect::new(15.0, 10.0, 18.0, 21.0),
        ];
        assert_eq!(
            Rect::envelope(rects.iter()),
            Some(Rect::new(10.0, 9.0, 18.0, 21.0))
        );
        assert_eq!(Rect::envelope(std::iter::empty()), None);
    }

    #[test]
    fn test_manhattan() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, -2.0);
        assert_eq!(a.manhattan(&b), 7.0);
    }

    #[test]
    fn test_quad_rect() {
        let r = Rect::new(5.0, 6.0, 7.0, 8.0);
        assert_eq!(Quad::from_rect(&r).rect(), r);
    }

    #[test]
    fn test_rgb_from_packed() {
        let c = Rgb::from_packed(0xFF8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn test_luminance() {
        assert_eq!(Rgb::luminance_u8(0, 0, 0), 0.0);
        assert!((Rgb::luminance_u8(255, 255, 255) - 255.0).abs() < 1e-9);
    }
}
