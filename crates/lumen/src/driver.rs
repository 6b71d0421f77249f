//! # Render Driver
//!
//! Runs one render end to end:
//!
//! ```text
//!   main thread                          control thread
//!   ───────────                          ──────────────
//!   start pool, submit tiles
//!   spawn control ─────────────────────> pool.stop()  (drain, join, flush)
//!   recv events ──> Canvas                    │
//!   ... until RenderCompleted <───────────────┘
//!   join control
//! ```
//!
//! The main thread is the single event consumer. Stopping happens on a
//! second thread so a bounded event channel cannot deadlock the shutdown.

use crossbeam_channel::Receiver;
use lumen_core::{
    Canvas, CanvasUpdate, ChannelSink, PoolConfig, Priority, RenderConfig, RenderError,
    RenderResult, World, WorkerPool,
};
use lumen_shared::{RenderEvent, RenderSummary};
use std::sync::Arc;
use std::thread;

/// Everything a finished render leaves behind.
#[derive(Debug)]
pub struct RenderOutcome {
    /// The assembled image.
    pub canvas: Canvas,
    /// Final accounting from the pool.
    pub summary: RenderSummary,
    /// Pixel batches received.
    pub batches: usize,
    /// Worker errors reported during the render.
    pub errors: Vec<String>,
}

/// Renders `scene` as described by `config`.
///
/// # Errors
///
/// Returns an error if the config is invalid, the pool cannot start, or
/// shutdown reports a thread panic or sink failure.
pub fn run_render<W: World>(config: &RenderConfig, scene: W) -> RenderResult<RenderOutcome> {
    config.validate()?;
    let span = tracing::info_span!("render", width = config.width, height = config.height);
    let _entered = span.enter();

    let (sink, events) = ChannelSink::with_capacity(config.event_capacity);
    let pool_config = PoolConfig::from(config);
    let pool = WorkerPool::start(&pool_config, Arc::new(scene), Arc::new(sink))?;

    let splitter = config.splitter();
    pool.submit_regions(splitter.regions(), Priority::Low);
    tracing::info!(
        width = config.width,
        height = config.height,
        tiles = splitter.tile_count(),
        workers = pool_config.workers,
        "render submitted"
    );

    let mut consumer = Consumer::new(Canvas::new(config.width, config.height));
    let stopped = thread::scope(|scope| {
        let control = thread::Builder::new()
            .name("lumen-control".into())
            .spawn_scoped(scope, move || pool.stop())
            .map_err(|source| RenderError::Spawn {
                role: "control".into(),
                source,
            })?;

        consumer.drain(&events);

        control.join().map_err(|_| RenderError::ThreadPanicked {
            role: "control".into(),
            message: "pool shutdown panicked".into(),
        })?
    });

    let summary = stopped?;
    if consumer.canvas.summary().is_none() {
        tracing::warn!("event stream ended without RenderCompleted");
    }

    Ok(RenderOutcome {
        canvas: consumer.canvas,
        summary,
        batches: consumer.batches,
        errors: consumer.errors,
    })
}

/// Main-thread event handling.
struct Consumer {
    canvas: Canvas,
    batches: usize,
    errors: Vec<String>,
    /// Last progress decile logged.
    decile: u32,
}

impl Consumer {
    fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            batches: 0,
            errors: Vec::new(),
            decile: 0,
        }
    }

    /// Applies events until `RenderCompleted` or every sender is gone.
    fn drain(&mut self, events: &Receiver<RenderEvent>) {
        for event in events {
            match &event {
                RenderEvent::JobStarted { worker } => tracing::debug!(worker, "worker ready"),
                RenderEvent::JobError { worker, message } => {
                    tracing::warn!(worker, %message, "worker failed");
                    self.errors.push(message.clone());
                }
                RenderEvent::WorkerExited { worker } => tracing::debug!(worker, "worker exited"),
                RenderEvent::PixelBatchReady(_) | RenderEvent::RenderCompleted(_) => {}
            }

            match self.canvas.apply(&event) {
                CanvasUpdate::Pixels { .. } => {
                    self.batches += 1;
                    self.log_progress();
                }
                CanvasUpdate::Completed(_) => break,
                CanvasUpdate::Status => {}
            }
        }
    }

    fn log_progress(&mut self) {
        let decile = (self.canvas.progress() * 10.0).floor() as u32;
        if decile > self.decile {
            self.decile = decile;
            tracing::info!(
                percent = decile * 10,
                pixels = self.canvas.pixels_rendered(),
                of = self.canvas.pixels_to_render(),
                "progress"
            );
        }
    }
}

/// Character ramp from dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

/// Downsamples the canvas to `columns` characters wide.
///
/// Rows are sampled at twice the column step since terminal cells are
/// roughly twice as tall as they are wide.
#[must_use]
pub fn ascii_preview(canvas: &Canvas, columns: u32) -> String {
    let columns = columns.clamp(1, canvas.width().max(1));
    let step_x = (canvas.width() / columns).max(1);
    let step_y = step_x * 2;

    let mut out = String::new();
    for y in (0..canvas.height()).step_by(step_y as usize) {
        for x in (0..canvas.width()).step_by(step_x as usize) {
            let luma = canvas.pixel(x, y).map_or(0.0, |c| {
                0.2126 * f32::from(c.r) + 0.7152 * f32::from(c.g) + 0.0722 * f32::from(c.b)
            });
            let index = (luma / 256.0 * RAMP.len() as f32) as usize;
            out.push(char::from(RAMP[index.min(RAMP.len() - 1)]));
        }
        out.push('\n');
    }
    out
}
