//! Tracing setup shared by `examinerd` and the `examiner` CLI.
//!
//! [`init_tracing`] installs one global subscriber: an `EnvFilter` (from
//! `RUST_LOG`, else [`default_directives`]) and a plain-text or JSON
//! formatter.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
///
/// HTTP access logs from `tower_http` are kept at debug so request lines show
/// at the default level; connection-level chatter from the HTTP stack is
/// capped at warn.
pub fn default_directives(level: Level) -> String {
    let access = if level < Level::DEBUG { Level::DEBUG } else { level };
    format!(
        "{level},tower_http={access},hyper=warn,hyper_util=warn,h2=warn,rustls=warn,reqwest=warn"
    )
    .to_ascii_lowercase()
}

/// Install the global subscriber. `json` switches to newline-delimited JSON.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry
            .with(fmt::layer().with_target(false).json())
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_keep_access_logs_visible() {
        let info = default_directives(Level::INFO);
        assert!(info.starts_with("info,"));
        assert!(info.contains("tower_http=debug"));
        assert!(info.contains("hyper=warn"));

        let trace = default_directives(Level::TRACE);
        assert!(trace.starts_with("trace,"));
        assert!(trace.contains("tower_http=trace"));
    }

    #[test]
    fn default_directives_parse_as_filter() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
        tracing::info!("still logging");
    }
}
