//! Tracing setup for binlift.
//!
//! The library only emits `tracing` events and spans. Harness binaries and
//! tests install a subscriber with one of the initializers below; the first
//! call wins and later calls are no-ops.

use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "binlift=info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event, with the current span attached
    Json,
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `default_filter`. A subscriber installed by someone
/// else is left in place.
pub fn init_tracing_with(format: LogFormat, default_filter: &str) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));
        let registry = tracing_subscriber::registry().with(env_filter);

        let installed = match format {
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::CLOSE)
                        .with_target(true)
                        .with_current_span(true),
                )
                .try_init(),
        };

        if installed.is_ok() {
            info!(?format, filter = default_filter, "binlift tracing initialized");
        }
    });
}

/// Install the subscriber described by a [`LoggingConfig`].
pub fn init_from_config(config: &LoggingConfig) {
    init_tracing_with(config.format, &config.filter);
}

/// Human-readable output at the default filter.
pub fn init_tracing() {
    init_tracing_with(LogFormat::Pretty, DEFAULT_FILTER);
}

/// JSON output at the default filter.
pub fn init_tracing_json() {
    init_tracing_with(LogFormat::Json, DEFAULT_FILTER);
}

/// Span around a top-level IR operation (save, load, merge).
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Log an [`IrError`](crate::error::IrError) leaving a top-level operation
/// and hand it back.
///
/// Recoverable errors are logged at `warn`, the rest at `error`.
#[macro_export]
macro_rules! log_error {
    ($op:expr, $err:expr) => {{
        let e: $crate::error::IrError = $err;
        if e.is_recoverable() {
            tracing::warn!(operation = $op, error = %e, "IR operation rejected");
        } else {
            tracing::error!(operation = $op, error = %e, "IR operation failed");
        }
        e
    }};
}
