//! # Canvas
//!
//! Consumer-side framebuffer. Feed it the events coming out of the sink and
//! it keeps the image plus how much of it has arrived.
//!
//! Lives on the consumer thread; it has no locks of its own.

use lumen_shared::{PixelSample, RenderEvent, RenderSummary, Rgb};

/// What applying one event changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanvasUpdate {
    /// Pixels were written. `fresh` counts first-time writes.
    Pixels {
        /// Samples written.
        written: usize,
        /// Samples that landed on a pixel not seen before.
        fresh: usize,
        /// Samples outside the canvas, ignored.
        out_of_bounds: usize,
    },
    /// The render is over.
    Completed(RenderSummary),
    /// Status event with no pixel data.
    Status,
}

/// An RGB framebuffer filled from pixel batches.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
    rendered: Vec<bool>,
    pixels_rendered: u64,
    summary: Option<RenderSummary>,
}

impl Canvas {
    /// A black `width x height` canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; len],
            rendered: vec![false; len],
            pixels_rendered: 0,
            summary: None,
        }
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Color at `(x, y)`, or `None` outside the canvas.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Writes a batch of samples. Later samples win on duplicates.
    pub fn apply_batch(&mut self, batch: &[PixelSample]) -> CanvasUpdate {
        let mut fresh = 0;
        let mut out_of_bounds = 0;
        for sample in batch {
            let Some(i) = self.index(sample.x, sample.y) else {
                out_of_bounds += 1;
                continue;
            };
            self.pixels[i] = sample.color;
            if !self.rendered[i] {
                self.rendered[i] = true;
                fresh += 1;
            }
        }
        self.pixels_rendered += fresh as u64;
        if out_of_bounds > 0 {
            tracing::warn!(out_of_bounds, "samples outside the canvas ignored");
        }
        CanvasUpdate::Pixels {
            written: batch.len() - out_of_bounds,
            fresh,
            out_of_bounds,
        }
    }

    /// Applies one sink event.
    pub fn apply(&mut self, event: &RenderEvent) -> CanvasUpdate {
        match event {
            RenderEvent::PixelBatchReady(batch) => self.apply_batch(batch),
            RenderEvent::RenderCompleted(summary) => {
                self.summary = Some(summary.clone());
                CanvasUpdate::Completed(summary.clone())
            }
            RenderEvent::JobStarted { .. }
            | RenderEvent::JobError { .. }
            | RenderEvent::WorkerExited { .. } => CanvasUpdate::Status,
        }
    }

    /// Distinct pixels written so far.
    #[inline]
    #[must_use]
    pub const fn pixels_rendered(&self) -> u64 {
        self.pixels_rendered
    }

    /// Total pixels on the canvas.
    #[inline]
    #[must_use]
    pub const fn pixels_to_render(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Fraction of the canvas written, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        match self.pixels_to_render() {
            0 => 1.0,
            total => self.pixels_rendered as f64 / total as f64,
        }
    }

    /// Every pixel has arrived.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.pixels_rendered == self.pixels_to_render()
    }

    /// Summary from the `RenderCompleted` event, once seen.
    #[must_use]
    pub const fn summary(&self) -> Option<&RenderSummary> {
        self.summary.as_ref()
    }
}
