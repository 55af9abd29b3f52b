//! guestbook commands - List and post messages

use super::Context;
use crate::content::MessageDraft;
use crate::site::SiteError;
use crate::ui::output;
use anyhow::Result;

/// Print all messages, oldest first.
pub async fn guestbook_list(ctx: &Context) -> Result<()> {
    let site = ctx.site()?;
    let book = site.load_guestbook().await?;
    output::print(output::format_guestbook(&book.document));
    Ok(())
}

/// Post a message.
///
/// The draft is validated before any connection is made, so an invalid
/// message fails even without a configured remote.
pub async fn guestbook_post(ctx: &Context, nickname: &str, content: &str) -> Result<()> {
    let limit = ctx.config.site.guestbook.max_content_chars;
    let draft = MessageDraft::new(nickname, content, limit).map_err(SiteError::Invalid)?;

    let site = ctx.site()?;
    let posted = site.post_message(&draft).await?;

    if posted.attempts > 1 {
        tracing::info!(attempts = posted.attempts, "posted after concurrent updates");
    }
    output::success(
        format!(
            "posted message {}\n{}",
            posted.message.id,
            output::format_outcome(&posted.outcome)
        ),
        ctx.verbosity,
    );
    Ok(())
}
