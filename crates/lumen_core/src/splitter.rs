//! Splits an image into tile regions for the job queue.

use lumen_shared::Region;

/// Divides a `width x height` image into a `divisions x divisions` grid.
///
/// Tiles are as even as integer division allows; the last column and row
/// absorb the remainder. Tiles come out in row-major order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionSplitter {
    width: u32,
    height: u32,
    divisions: u32,
}

impl RegionSplitter {
    /// Creates a splitter. `divisions` is clamped to `[1, min(width, height)]`
    /// so no tile is ever empty.
    #[must_use]
    pub fn new(width: u32, height: u32, divisions: u32) -> Self {
        let max = width.min(height).max(1);
        Self {
            width,
            height,
            divisions: divisions.clamp(1, max),
        }
    }

    /// Number of tiles produced.
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        let divisions = self.divisions as usize;
        divisions * divisions
    }

    /// Pixels covered by all tiles together.
    #[must_use]
    pub const fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Every tile, row by row.
    pub fn regions(&self) -> impl Iterator<Item = Region> {
        let Self {
            width,
            height,
            divisions,
        } = *self;
        let xs = edges(width, divisions);
        let ys = edges(height, divisions);

        (0..divisions as usize).flat_map(move |row| {
            let (y0, y1) = (ys[row], ys[row + 1]);
            let xs = xs.clone();
            (0..divisions as usize).map(move |col| Region::from_size(xs[col], y0, xs[col + 1] - xs[col], y1 - y0))
        })
    }
}

/// `divisions + 1` cut positions along an axis of `len` pixels.
fn edges(len: u32, divisions: u32) -> Vec<u32> {
    let step = len / divisions;
    (0..=divisions)
        .map(|i| if i == divisions { len } else { i * step })
        .collect()
}
