//! pipeline::reapply
//!
//! Caller-driven re-read and reapply after a concurrent modification.
//!
//! The pipeline itself never retries. A flow whose change can be recomputed
//! from fresh content (appending to a list) opts into [`ConflictPolicy::Reapply`];
//! the helper then re-reads the paths at the new tip and asks the flow to
//! rebuild its change set from that content before trying again.

use serde::{Deserialize, Serialize};

use super::changes::ChangeSet;
use super::commit::{CommitOutcome, CommitPipeline, Snapshot};
use super::errors::CommitError;
use crate::core::types::{BranchName, RepoPath};

/// What a flow does when its commit loses the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Report the conflict to the caller.
    #[default]
    Surface,
    /// Re-read and rebuild the change, up to `max_attempts` commits in total.
    Reapply { max_attempts: u32 },
}

impl ConflictPolicy {
    /// Total number of commit attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        match self {
            ConflictPolicy::Surface => 1,
            ConflictPolicy::Reapply { max_attempts } => (*max_attempts).max(1),
        }
    }
}

/// A change built from a [`Snapshot`], plus whatever the flow wants back
/// from the attempt that succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommit<T = ()> {
    pub message: String,
    pub changes: ChangeSet,
    pub value: T,
}

impl PreparedCommit {
    pub fn new(message: impl Into<String>, changes: ChangeSet) -> Self {
        Self::with_value(message, changes, ())
    }
}

impl<T> PreparedCommit<T> {
    pub fn with_value(message: impl Into<String>, changes: ChangeSet, value: T) -> Self {
        Self {
            message: message.into(),
            changes,
            value,
        }
    }
}

/// A commit that landed through [`CommitPipeline::commit_with_policy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T = ()> {
    pub outcome: CommitOutcome,
    /// The value prepared by the winning attempt
    pub value: T,
    /// Number of commit attempts, 1 when there was no conflict
    pub attempts: u32,
}

impl CommitPipeline {
    /// Snapshot `paths`, let `prepare` build the change, commit it against
    /// the snapshot's tip, and repeat on conflict as `policy` allows.
    ///
    /// `prepare` is called once per attempt with content read at the tip
    /// that attempt commits against. Errors from `prepare` and any failure
    /// other than a conflict end the loop immediately. When attempts run
    /// out the last `ConcurrentModification` is returned.
    pub async fn commit_with_policy<F, T, E>(
        &self,
        branch: &BranchName,
        paths: &[RepoPath],
        policy: ConflictPolicy,
        mut prepare: F,
    ) -> Result<Applied<T>, E>
    where
        F: FnMut(&Snapshot) -> Result<PreparedCommit<T>, E>,
        E: From<CommitError>,
    {
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;

        loop {
            let snapshot = self.snapshot(branch, paths).await?;
            let prepared = prepare(&snapshot)?;

            let result = self
                .commit_files_on(branch, &snapshot.tip, &prepared.message, &prepared.changes)
                .await;

            match result {
                Err(err) if err.is_conflict() && attempt < max_attempts => {
                    tracing::warn!(
                        %branch,
                        attempt,
                        max_attempts,
                        "reapplying after concurrent modification"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(E::from(err)),
                Ok(outcome) => {
                    return Ok(Applied {
                        outcome,
                        value: prepared.value,
                        attempts: attempt,
                    })
                }
            }
        }
    }
}
