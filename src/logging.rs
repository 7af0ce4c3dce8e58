use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "QRCRAFT_LOG";

/// Picks the filter: `QRCRAFT_LOG` if set and valid, else `fallback`, else `warn`.
pub fn build_filter(env_value: Option<&str>, fallback: &str) -> EnvFilter {
    env_value
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_new(fallback).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

/// Initialize tracing to stderr.
///
/// Stdout carries command output, so logs never go there. Calling this twice is harmless: the
/// second global subscriber is rejected and ignored.
pub fn init_tracing(fallback_level: &str) {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env_value.as_deref(), fallback_level);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        assert_eq!(build_filter(Some("debug"), "info").to_string(), "debug");
        assert_eq!(build_filter(None, "info").to_string(), "info");
        assert_eq!(build_filter(Some("a=loud"), "qrcraft=debug").to_string(), "qrcraft=debug");
        assert_eq!(build_filter(None, "b=loud").to_string(), "warn");
    }
}
