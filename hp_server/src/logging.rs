//! Structured logging configuration.
//!
//! Library code logs through the `log` facade; the subscriber installed here
//! picks those records up alongside native `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Example
///
/// ```no_run
/// use hp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `connection_id` - Socket the event happened on
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use hp_server::logging::log_security_event;
///
/// log_security_event("rate_limit", "4f1c", "Too many messages");
/// ```
pub fn log_security_event(event_type: &str, connection_id: &str, message: &str) {
    tracing::warn!(
        event_type = event_type,
        connection_id = connection_id,
        "SECURITY: {}",
        message
    );
}

/// Log a connection opening or closing
pub fn log_connection(connection_id: &str, opened: bool, duration_secs: Option<u64>) {
    if opened {
        tracing::info!(connection_id = connection_id, "WebSocket connected");
    } else {
        tracing::info!(
            connection_id = connection_id,
            duration_secs = duration_secs,
            "WebSocket disconnected"
        );
    }
}
