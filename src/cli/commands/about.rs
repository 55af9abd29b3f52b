//! about commands - Show and edit the about document

use std::path::PathBuf;

use super::Context;
use crate::content::AboutDocument;
use crate::ui::output;
use anyhow::{bail, Context as _, Result};

/// Print the about document.
pub async fn about_show(ctx: &Context) -> Result<()> {
    let site = ctx.site()?;
    let about = site.load_about().await?;
    output::print(output::format_about(&about.document));
    Ok(())
}

/// Change fields of the about document and save it.
///
/// The save is a compare-and-swap on the tip the document was read at, also
/// when the branch has no about document yet and a new one is built from
/// the flags.
pub async fn about_save(
    ctx: &Context,
    title: Option<String>,
    description: Option<String>,
    content_file: Option<PathBuf>,
) -> Result<()> {
    if title.is_none() && description.is_none() && content_file.is_none() {
        bail!("nothing to change: pass --title, --description or --content-file");
    }

    let content = match content_file {
        Some(path) => Some(
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read '{}'", path.display()))?,
        ),
        None => None,
    };

    let site = ctx.site()?;
    let current = site.read_about().await?;
    let document = match current.document {
        Some(document) => document,
        None => {
            tracing::info!(path = %site.about_path(), "creating about document");
            AboutDocument::default()
        }
    }
    .with_changes(title, description, content);
    let outcome = site.save_about_on(&current.tip, &document).await?;

    output::success(output::format_outcome(&outcome), ctx.verbosity);
    Ok(())
}
