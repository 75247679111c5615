//! Folio command-line host.
//!
//! The `Session` owns the active tool mode, the batch settings and the
//! record store; the `folio` binary drives it from file paths given on the
//! command line and exports results into an output directory.

pub mod session;

pub use session::Session;

/// Initialize tracing for the CLI. `RUST_LOG` overrides the configured filter.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Truncate a name to max_len characters, appending "..." if truncated.
pub fn truncate_name(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
