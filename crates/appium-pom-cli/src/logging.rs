//! Log output for the CLI.
//!
//! Library events go to stderr through a `tracing-subscriber` fmt layer so
//! stdout stays clean for `--format json`. `RUST_LOG` overrides the level
//! derived from `-v`/`-q`.

use crate::config::Verbosity;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is unset.
///
/// Targets match by prefix, so this also covers `appium_pom_cli`.
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> String {
    format!("appium_pom={}", verbosity.level())
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(verbosity: Verbosity, color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(color)
                .with_target(verbosity.is_verbose()),
        )
        .with(filter)
        .try_init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_follows_verbosity() {
        assert_eq!(default_filter(Verbosity::Normal), "appium_pom=warn");
        assert_eq!(default_filter(Verbosity::Debug), "appium_pom=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Verbosity::Quiet, false);
        init_logging(Verbosity::Trace, false);
    }
}
