// src/logging.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Console logging for the binaries. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_target(false)
        .init();
}
