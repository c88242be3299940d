//! Diagnostic logging setup.
//!
//! The library only emits `tracing` events; binaries call [`init`] once to
//! install a subscriber. `RUST_LOG` takes precedence over the defaults.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "chatline=info";
const VERBOSE_FILTER: &str = "chatline=debug";

/// Filter used when `RUST_LOG` is unset or invalid.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for rendered output. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "chatline=info");
        assert_eq!(default_filter(true), "chatline=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
        tracing::debug!("still alive");
    }
}
