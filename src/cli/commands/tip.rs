//! tip command - Show the content branch tip

use super::Context;
use crate::ui::output::{self, Verbosity};
use anyhow::Result;

/// Print the commit and tree the content branch points at.
pub async fn tip(ctx: &Context) -> Result<()> {
    if ctx.verbosity == Verbosity::Debug {
        match ctx.config.path() {
            Some(path) => eprintln!("config: {}", path.display()),
            None => eprintln!("config: defaults"),
        }
    }

    let site = ctx.site()?;
    let tip = site.tip().await?;
    output::print(output::format_tip(site.branch().as_str(), &tip));
    Ok(())
}
