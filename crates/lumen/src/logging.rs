//! Logging setup for the render driver.
//!
//! Console output only, filtered by `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=lumen_core=debug lumen_render scene.toml
//! ```

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// The console format: thread names so worker and aggregator lines can be
/// told apart, and one line with timings when a span such as `render` closes.
pub fn console_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_thread_names(true)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
}

/// Installs the global subscriber writing [`console_layer`] to stdout.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer(std::io::stdout))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Another test may have installed it already.
        let _ = init_logging();
        assert!(init_logging().is_err());
    }
}
