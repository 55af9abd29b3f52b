//! cli::logging
//!
//! Installs the global `tracing` subscriber.
//!
//! Level precedence: `--quiet` forces ERROR, then a `RUST_LOG` that parses
//! as a single level, then `--debug` (DEBUG), otherwise WARN. A `RUST_LOG`
//! holding per-target directives is added on top of the chosen level.

use std::str::FromStr;

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pick the base log level from flags and the environment.
pub fn log_level(quiet: bool, debug: bool, rust_log: Option<&str>) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }

    if let Some(level) = rust_log.and_then(|v| LevelFilter::from_str(v).ok()) {
        return level;
    }

    if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Install the subscriber. Logs go to stderr so stdout stays clean.
pub fn init(quiet: bool, debug: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let level = log_level(quiet, debug, rust_log.as_deref());

    let env_filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    let layer = fmt::layer()
        .without_time()
        .with_target(debug)
        .with_writer(std::io::stderr);

    // A second init (tests running the CLI in-process) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init();
}
