//! Logging and tracing infrastructure for ropcheck.
//!
//! Structured logging through the tracing crate. Log output goes to stderr
//! so gadget dumps on stdout stay machine-readable.

use std::sync::Once;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Subsequent calls are ignored.
pub fn init_tracing(default_level: &str) {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_names(true);

        // try_init: a test harness may already have installed a subscriber
        let _ = tracing_subscriber::registry()
            .with(env_filter(default_level))
            .with(fmt_layer)
            .try_init();

        debug!("ropcheck tracing initialized");
    });
}

/// Initialize tracing with JSON output for structured logging.
pub fn init_tracing_json(default_level: &str) {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true);

        let _ = tracing_subscriber::registry()
            .with(env_filter(default_level))
            .with(fmt_layer)
            .try_init();

        debug!("ropcheck tracing initialized (JSON mode)");
    });
}

/// Macro for creating spans
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Macro for logging and returning errors
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "Operation failed");
        e
    }};
    ($err:expr, $msg:expr) => {{
        let e = $err;
        tracing::error!(error = %e, message = $msg, "Operation failed");
        e
    }};
}
