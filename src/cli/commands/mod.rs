//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls a site flow or the commit pipeline
//! 3. Formats and displays output
//!
//! Handlers never talk to the object store directly.

mod about;
mod commit;
mod completion;
mod guestbook;
mod tip;

pub use about::{about_save, about_show};
pub use commit::{commit, parse_file_arg};
pub use completion::completion;
pub use guestbook::{guestbook_list, guestbook_post};
pub use tip::tip;

use anyhow::Result;

use super::args::{AboutCommand, Command, GuestbookCommand};
use crate::core::config::Config;
use crate::site::{Site, SiteError};
use crate::ui::output::Verbosity;

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub verbosity: Verbosity,
}

impl Context {
    /// Open the site flows against the configured remote.
    pub fn site(&self) -> Result<Site, SiteError> {
        Site::connect(&self.config.site)
    }
}

/// Dispatch a parsed command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Tip => tip(ctx).await,
        Command::About(AboutCommand::Show) => about_show(ctx).await,
        Command::About(AboutCommand::Save {
            title,
            description,
            content_file,
        }) => about_save(ctx, title, description, content_file).await,
        Command::Guestbook(GuestbookCommand::List) => guestbook_list(ctx).await,
        Command::Guestbook(GuestbookCommand::Post { nickname, content }) => {
            guestbook_post(ctx, &nickname, &content).await
        }
        Command::Commit { message, files } => commit(ctx, &message, &files).await,
        Command::Completion { shell } => completion(shell),
    }
}
