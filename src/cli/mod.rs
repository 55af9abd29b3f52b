//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and install logging
//! - Delegate to command handlers
//! - Map failures to messages and exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::site`] flows or the [`crate::pipeline`] directly. Every write to
//! the content branch goes through the commit pipeline.

pub mod args;
pub mod commands;
pub mod logging;

pub use args::{Cli, Shell};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::pipeline::CommitError;
use crate::site::SiteError;
use crate::ui::output::{self, Verbosity};

/// Exit code for a lost compare-and-swap.
pub const EXIT_CONFLICT: u8 = 3;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    logging::init(cli.quiet, cli.debug);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let ctx = commands::Context {
        config,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx).await
}

/// Print a failure the way the user should see it.
pub fn report(err: &anyhow::Error) {
    output::error(format!("{:#}", err));
    if let Some(message) = user_message(err) {
        output::hint(message, Verbosity::Normal);
    }
}

/// Process exit code for a failure.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if is_conflict(err) {
        EXIT_CONFLICT
    } else {
        1
    }
}

fn is_conflict(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<SiteError>()
            .is_some_and(SiteError::is_conflict)
            || cause
                .downcast_ref::<CommitError>()
                .is_some_and(CommitError::is_conflict)
    })
}

fn user_message(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| {
        if let Some(site) = cause.downcast_ref::<SiteError>() {
            return Some(site.user_message());
        }
        cause
            .downcast_ref::<CommitError>()
            .map(|commit| commit.user_message().to_string())
    })
}
