//! Pixel coordinates, regions and rendered samples.

use serde::{Deserialize, Serialize};

/// An 8-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Creates a color from its channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts a linear `[0, 1]` float color, clamping out-of-range channels.
    #[must_use]
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(to_byte(r), to_byte(g), to_byte(b))
    }
}

/// A pixel coordinate in image space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl PixelPoint {
    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A rectangular pixel region.
///
/// `origin` is inclusive, `end` is exclusive, so a region with
/// `origin == end` covers no pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Top-left corner (inclusive).
    pub origin: PixelPoint,
    /// Bottom-right corner (exclusive).
    pub end: PixelPoint,
}

impl Region {
    /// Creates a region from its corners.
    ///
    /// Corners given in the wrong order are swapped per axis.
    #[must_use]
    pub fn new(origin: PixelPoint, end: PixelPoint) -> Self {
        Self {
            origin: PixelPoint::new(origin.x.min(end.x), origin.y.min(end.y)),
            end: PixelPoint::new(origin.x.max(end.x), origin.y.max(end.y)),
        }
    }

    /// Creates a region from an origin and a size.
    #[must_use]
    pub fn from_size(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(
            PixelPoint::new(x, y),
            PixelPoint::new(x.saturating_add(width), y.saturating_add(height)),
        )
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.end.x - self.origin.x
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.end.y - self.origin.y
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Returns true if the region covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Returns true if `(x, y)` lies inside the region.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.origin.x && x < self.end.x && y >= self.origin.y && y < self.end.y
    }

    /// Iterates every coordinate of the region in row-major order.
    pub fn points(&self) -> impl Iterator<Item = PixelPoint> {
        let Region { origin, end } = *self;
        (origin.y..end.y).flat_map(move |y| (origin.x..end.x).map(move |x| PixelPoint::new(x, y)))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})..({},{})",
            self.origin.x, self.origin.y, self.end.x, self.end.y
        )
    }
}

/// One rendered pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSample {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Final color.
    pub color: Rgb,
}

impl PixelSample {
    /// Creates a sample.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, color: Rgb) -> Self {
        Self { x, y, color }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_normalizes_corners() {
        let region = Region::new(PixelPoint::new(10, 2), PixelPoint::new(4, 8));
        assert_eq!(region.origin, PixelPoint::new(4, 2));
        assert_eq!(region.end, PixelPoint::new(10, 8));
        assert_eq!(region.pixel_count(), 36);
    }

    #[test]
    fn test_region_points_cover_every_pixel_once() {
        let region = Region::from_size(3, 5, 4, 2);
        let points: Vec<_> = region.points().collect();
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], PixelPoint::new(3, 5));
        assert_eq!(points[7], PixelPoint::new(6, 6));
        assert!(points.iter().all(|p| region.contains(p.x, p.y)));
    }

    #[test]
    fn test_region_display() {
        assert_eq!(Region::from_size(1, 2, 3, 4).to_string(), "(1,2)..(4,6)");
    }

    #[test]
    fn test_empty_region() {
        let region = Region::from_size(7, 7, 0, 3);
        assert!(region.is_empty());
        assert_eq!(region.points().count(), 0);
    }

    #[test]
    fn test_rgb_from_unit_clamps() {
        assert_eq!(Rgb::from_unit(-1.0, 0.5, 2.0), Rgb::new(0, 128, 255));
    }
}
