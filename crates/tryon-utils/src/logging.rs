//! Logging and observability infrastructure for tryon
//!
//! Structured logging with `tracing`. Session actions (uploads, garment
//! generation, try-on composition) each run inside an `action` span so their
//! provider calls and fetches can be correlated.

use std::io::IsTerminal;
use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_error_message;

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and NO_COLOR is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize tracing subscriber for structured logging
///
/// Sets up tracing with either compact (default) or verbose format.
/// `RUST_LOG` takes precedence over the built-in filters.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("tryon=debug,tryon_engine=debug,tryon_provider=debug,info")
            } else {
                EnvFilter::try_new("tryon=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Create a span for one session action
pub fn action_span(action: &str) -> tracing::Span {
    span!(Level::INFO, "action", action = %action)
}

/// Log action start
pub fn log_action_start(action: &str) {
    info!(action = %action, "Starting action");
}

/// Log action completion with duration
pub fn log_action_complete(action: &str, duration_ms: u128) {
    info!(
        action = %action,
        duration_ms = %duration_ms,
        "Action completed"
    );
}

/// Log a failed action at warn level
///
/// Error messages are redacted so API keys and URL credentials never reach the log.
pub fn log_action_error(action: &str, error: &str, duration_ms: u128) {
    let sanitized_error = redact_error_message(error);
    warn!(
        action = %action,
        duration_ms = %duration_ms,
        error = %sanitized_error,
        "Action failed"
    );
}
