//! Diagnostic logging via `tracing`.
//!
//! Everything goes to stderr so stdout stays clean for report output.
//! `RUST_LOG` takes precedence over the level picked from `--verbose`.

use tracing_subscriber::EnvFilter;

/// Log line encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "funcreg=debug" } else { "funcreg=warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Calling it twice is harmless; the second
/// call is ignored.
pub fn init(verbose: bool, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_ansi(false).with_current_span(true).try_init(),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "logging already initialised");
    }
}
