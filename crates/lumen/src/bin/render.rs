//! # LUMEN Render
//!
//! Renders the built-in sphere scene with the worker pool and prints an
//! ASCII preview plus the render summary.
//!
//! ```bash
//! # Defaults: 400x400, 10x10 tiles, one worker per core
//! ./lumen_render
//!
//! # From a config file
//! RUST_LOG=debug ./lumen_render render.toml
//! ```

use lumen::core::RenderConfig;
use lumen::{ascii_preview, init_logging, run_render, SphereScene};
use std::process::ExitCode;

/// Preview width in characters.
const PREVIEW_COLUMNS: u32 = 64;

fn main() -> ExitCode {
    if let Err(err) = init_logging() {
        eprintln!("logging disabled: {err}");
    }

    let config = match std::env::args().nth(1) {
        Some(path) => match RenderConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(%path, error = %err, "cannot load config");
                return ExitCode::FAILURE;
            }
        },
        None => RenderConfig::default(),
    };

    let scene = SphereScene::demo(config.width, config.height);
    let outcome = match run_render(&config, scene) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "render failed");
            return ExitCode::FAILURE;
        }
    };

    println!("{}", ascii_preview(&outcome.canvas, PREVIEW_COLUMNS));

    let summary = &outcome.summary;
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Image:      {}x{}", config.width, config.height);
    println!("  Jobs:       {}/{}", summary.jobs_completed, summary.jobs_submitted);
    println!("  Samples:    {}", summary.samples_delivered);
    println!("  Batches:    {}", outcome.batches);
    println!("  Failures:   {}", summary.failed_workers);
    println!("  Elapsed:    {:.1?}", summary.elapsed);
    println!(
        "  Status:     {}",
        if summary.complete { "COMPLETE" } else { "INCOMPLETE" }
    );
    println!("═══════════════════════════════════════════════════════════════════");

    for message in &outcome.errors {
        eprintln!("  ✗ {message}");
    }

    if summary.complete {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
