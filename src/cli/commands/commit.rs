//! commit command - Commit local files in one commit

use std::path::PathBuf;

use super::Context;
use crate::core::types::RepoPath;
use crate::pipeline::ChangeSet;
use crate::ui::output;
use anyhow::{anyhow, Context as _, Result};

/// Split a `REPO_PATH=LOCAL_FILE` argument.
pub fn parse_file_arg(arg: &str) -> Result<(RepoPath, PathBuf)> {
    let (repo_path, local) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("'{}' is not of the form REPO_PATH=LOCAL_FILE", arg))?;
    if local.is_empty() {
        return Err(anyhow!("'{}' names no local file", arg));
    }
    let repo_path = RepoPath::new(repo_path).with_context(|| format!("in argument '{}'", arg))?;
    Ok((repo_path, PathBuf::from(local)))
}

/// Read every local file and commit them together.
pub async fn commit(ctx: &Context, message: &str, files: &[String]) -> Result<()> {
    let mut changes = ChangeSet::new();
    for arg in files {
        let (repo_path, local) = parse_file_arg(arg)?;
        let content = tokio::fs::read(&local)
            .await
            .with_context(|| format!("failed to read '{}'", local.display()))?;
        changes.insert_bytes(repo_path, content);
    }

    let site = ctx.site()?;
    let outcome = site
        .pipeline()
        .commit_files(site.branch(), message, &changes)
        .await?;

    output::success(output::format_outcome(&outcome), ctx.verbosity);
    Ok(())
}
