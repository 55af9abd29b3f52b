//! site
//!
//! The two application flows that persist content: saving the about
//! document and posting a guestbook message.
//!
//! # Flows
//!
//! | flow           | path (default)                    | change                 | on conflict (default) |
//! |----------------|-----------------------------------|------------------------|-----------------------|
//! | `save_about`   | `src/app/about/list.json`         | whole-document overwrite | surface             |
//! | `post_message` | `public/guestbook/messages.json`  | list append            | reapply, 3 attempts   |
//!
//! Posting always re-reads the message list at the tip it commits against,
//! so two visitors posting at once both end up on the board.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sitegit::core::config::SiteConfig;
//! use sitegit::core::types::BranchName;
//! use sitegit::site::Site;
//! use sitegit::store::mock::MockStore;
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new().with_branch(&BranchName::new("main").unwrap(), &[]);
//! let site = Site::from_config(&SiteConfig::default(), Arc::new(store)).unwrap();
//!
//! let draft = site.draft("ada", "hello there").unwrap();
//! let posted = site.post_message(&draft).await.unwrap();
//! assert_eq!(site.load_guestbook().await.unwrap().document.ids(), vec![posted.message.id.as_str()]);
//! # });
//! ```

mod errors;

pub use errors::SiteError;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth;
use crate::content::{AboutDocument, Document, Guestbook, GuestbookMessage, MessageDraft};
use crate::core::config::SiteConfig;
use crate::core::types::{BranchName, RepoPath};
use crate::pipeline::{
    ChangeSet, CommitOutcome, CommitPipeline, ConflictPolicy, PreparedCommit, Snapshot,
};
use crate::store::github::GitHubStore;
use crate::store::{BranchTip, ObjectStore};

/// Commit message for about document saves.
pub const ABOUT_COMMIT_MESSAGE: &str = "Update about page";

/// A document together with the tip it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub tip: BranchTip,
    pub document: T,
}

/// A guestbook message that landed on the branch.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub message: GuestbookMessage,
    pub outcome: CommitOutcome,
    /// Commit attempts, more than 1 when another post won a race
    pub attempts: u32,
}

/// The site's persistence handle.
#[derive(Debug, Clone)]
pub struct Site {
    pipeline: CommitPipeline,
    branch: BranchName,
    about_path: RepoPath,
    about_policy: ConflictPolicy,
    guestbook_path: RepoPath,
    guestbook_policy: ConflictPolicy,
    max_content_chars: usize,
}

impl Site {
    /// Build the flows over `store` from configuration.
    pub fn from_config(
        config: &SiteConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, SiteError> {
        Ok(Self {
            pipeline: CommitPipeline::new(store),
            branch: config.remote.branch_name()?,
            about_path: config.about.repo_path()?,
            about_policy: config.about.on_conflict,
            guestbook_path: config.guestbook.repo_path()?,
            guestbook_policy: config.guestbook.on_conflict,
            max_content_chars: config.guestbook.max_content_chars,
        })
    }

    /// Build the flows over the GitHub repository named in configuration.
    pub fn connect(config: &SiteConfig) -> Result<Self, SiteError> {
        let (owner, repo) = config.remote.repository()?;
        let store = GitHubStore::with_options(
            auth::from_config(&config.auth),
            owner,
            repo,
            config.remote.api_base.as_str(),
            Duration::from_secs(config.remote.timeout_secs),
        )?;
        tracing::debug!(?store, "connected");
        Self::from_config(config, Arc::new(store))
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    pub fn about_path(&self) -> &RepoPath {
        &self.about_path
    }

    pub fn pipeline(&self) -> &CommitPipeline {
        &self.pipeline
    }

    /// Current tip of the content branch.
    pub async fn tip(&self) -> Result<BranchTip, SiteError> {
        Ok(self.pipeline.resolve_tip(&self.branch).await?)
    }

    /// Read the about document.
    ///
    /// # Errors
    ///
    /// `MissingDocument` when the branch has no about document.
    pub async fn load_about(&self) -> Result<Versioned<AboutDocument>, SiteError> {
        let Versioned { tip, document } = self.read_about().await?;
        let document =
            document.ok_or_else(|| SiteError::MissingDocument(self.about_path.clone()))?;
        Ok(Versioned { tip, document })
    }

    /// Read the about document, or `None` if the branch has none yet.
    ///
    /// The tip is returned either way, so creating the document can be a
    /// compare-and-swap against the state that was read.
    pub async fn read_about(&self) -> Result<Versioned<Option<AboutDocument>>, SiteError> {
        let snapshot = self.read(&self.about_path).await?;
        let document = snapshot
            .get(&self.about_path)
            .map(|bytes| decode(&self.about_path, bytes))
            .transpose()?;
        Ok(Versioned {
            document,
            tip: snapshot.tip,
        })
    }

    /// Overwrite the about document at the current tip.
    ///
    /// Retries according to the about conflict policy; each attempt writes
    /// `document` unchanged.
    pub async fn save_about(&self, document: &AboutDocument) -> Result<CommitOutcome, SiteError> {
        let changes = ChangeSet::single(self.about_path.clone(), document)?;
        let applied = self
            .pipeline
            .commit_with_policy(&self.branch, &[], self.about_policy, |_| {
                Ok::<_, SiteError>(PreparedCommit::new(ABOUT_COMMIT_MESSAGE, changes.clone()))
            })
            .await?;
        Ok(applied.outcome)
    }

    /// Overwrite the about document, but only if the branch is still at
    /// `base`, the tip the document was loaded from.
    ///
    /// A concurrent edit is always reported, whatever the policy says.
    pub async fn save_about_on(
        &self,
        base: &BranchTip,
        document: &AboutDocument,
    ) -> Result<CommitOutcome, SiteError> {
        let changes = ChangeSet::single(self.about_path.clone(), document)?;
        Ok(self
            .pipeline
            .commit_files_on(&self.branch, base, ABOUT_COMMIT_MESSAGE, &changes)
            .await?)
    }

    /// Read the guestbook. A branch without a message list has an empty one.
    pub async fn load_guestbook(&self) -> Result<Versioned<Guestbook>, SiteError> {
        let snapshot = self.read(&self.guestbook_path).await?;
        Ok(Versioned {
            document: guestbook_from(&snapshot, &self.guestbook_path)?,
            tip: snapshot.tip,
        })
    }

    /// Validate a visitor's submission against the configured limits.
    pub fn draft(&self, nickname: &str, content: &str) -> Result<MessageDraft, SiteError> {
        MessageDraft::new(nickname, content, self.max_content_chars).map_err(SiteError::Invalid)
    }

    /// Append a message to the guestbook.
    ///
    /// Every attempt re-reads the list at the tip it commits against and
    /// places the message among the messages already there.
    pub async fn post_message(&self, draft: &MessageDraft) -> Result<PostedMessage, SiteError> {
        let path = &self.guestbook_path;
        let commit_message = format!("New guestbook message: {}", draft.nickname());

        let applied = self
            .pipeline
            .commit_with_policy(
                &self.branch,
                std::slice::from_ref(path),
                self.guestbook_policy,
                |snapshot| {
                    let mut book = guestbook_from(snapshot, path)?;
                    let message = GuestbookMessage::compose(
                        draft,
                        book.messages(),
                        Utc::now(),
                        &mut rand::rng(),
                    );
                    book.push(message.clone());
                    let changes = ChangeSet::single(path.clone(), &book)?;
                    Ok::<_, SiteError>(PreparedCommit::with_value(
                        commit_message.as_str(),
                        changes,
                        message,
                    ))
                },
            )
            .await?;

        tracing::info!(id = %applied.value.id, attempts = applied.attempts, "guestbook message posted");
        Ok(PostedMessage {
            message: applied.value,
            outcome: applied.outcome,
            attempts: applied.attempts,
        })
    }

    async fn read(&self, path: &RepoPath) -> Result<Snapshot, SiteError> {
        Ok(self
            .pipeline
            .snapshot(&self.branch, std::slice::from_ref(path))
            .await?)
    }
}

fn decode<D: Document>(path: &RepoPath, bytes: &[u8]) -> Result<D, SiteError> {
    D::decode(bytes).map_err(|source| SiteError::Decode {
        path: path.clone(),
        source,
    })
}

fn guestbook_from(snapshot: &Snapshot, path: &RepoPath) -> Result<Guestbook, SiteError> {
    match snapshot.get(path) {
        Some(bytes) => decode(path, bytes),
        None => Ok(Guestbook::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::X_RANGE;
    use crate::store::mock::{FailOn, MockStore};
    use crate::store::StoreError;

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn about_doc() -> AboutDocument {
        AboutDocument {
            title: "About".into(),
            description: "Who I am".into(),
            content: "# Hello".into(),
        }
    }

    fn site_with(store: &MockStore) -> Site {
        Site::from_config(&SiteConfig::default(), Arc::new(store.clone())).unwrap()
    }

    #[tokio::test]
    async fn missing_about_document() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let err = site_with(&store).load_about().await.unwrap_err();
        assert!(matches!(err, SiteError::MissingDocument(_)));
    }

    #[tokio::test]
    async fn save_then_load_about() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let site = site_with(&store);

        let outcome = site.save_about(&about_doc()).await.unwrap();
        let loaded = site.load_about().await.unwrap();

        assert_eq!(loaded.document, about_doc());
        assert_eq!(loaded.tip.commit, outcome.commit);
        let commit = store.commit(&outcome.commit).unwrap();
        assert_eq!(commit.message, ABOUT_COMMIT_MESSAGE);
    }

    #[tokio::test]
    async fn stale_about_save_is_rejected() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let site = site_with(&store);
        site.save_about(&about_doc()).await.unwrap();

        let loaded = site.load_about().await.unwrap();
        let theirs = about_doc().with_changes(Some("Theirs".into()), None, None);
        site.save_about(&theirs).await.unwrap();

        let mine = loaded.document.with_changes(None, None, Some("mine".into()));
        let err = site.save_about_on(&loaded.tip, &mine).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(site.load_about().await.unwrap().document, theirs);
    }

    #[tokio::test]
    async fn creating_about_over_a_concurrent_create_is_rejected() {
        let path = RepoPath::new(crate::core::config::schema::DEFAULT_ABOUT_PATH).unwrap();
        let store = MockStore::new().with_branch(&main(), &[]);
        let site = site_with(&store);

        let read = site.read_about().await.unwrap();
        assert!(read.document.is_none());

        let theirs = about_doc().with_changes(Some("Theirs".into()), None, None);
        store
            .push_commit(&main(), &[(&path, theirs.encode().unwrap().as_slice())], "theirs")
            .unwrap();

        let mine = AboutDocument::default().with_changes(Some("Mine".into()), None, None);
        let err = site.save_about_on(&read.tip, &mine).await.unwrap_err();

        assert!(matches!(
            err,
            SiteError::Commit(crate::pipeline::CommitError::ConcurrentModification { .. })
        ));
        assert_eq!(site.load_about().await.unwrap().document, theirs);
    }

    #[tokio::test]
    async fn read_about_returns_tip_for_missing_document() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let site = site_with(&store);

        let read = site.read_about().await.unwrap();
        assert_eq!(read.tip, store.tip(&main()).unwrap());

        let created = site.save_about_on(&read.tip, &about_doc()).await.unwrap();
        assert_eq!(store.tip(&main()).unwrap().commit, created.commit);
    }

    #[tokio::test]
    async fn post_keeps_existing_entries_as_written() {
        let path = RepoPath::new(crate::core::config::schema::DEFAULT_GUESTBOOK_PATH).unwrap();
        let existing = r##"[
  {"id":"1704067200000-a1","nickname":"kim","content":"hi","timestamp":"2024-01-01T08:00:00+08:00","color":"#fef3c7","x":50,"y":20,"scale":1},
  {"id":"1704067200001-b2","nickname":"lee","content":"yo","timestamp":"yesterday","color":"#dbeafe","x":12.5,"y":70}
]"##;
        let store = MockStore::new().with_branch(&main(), &[(&path, existing.as_bytes())]);
        let site = site_with(&store);

        site.post_message(&site.draft("ada", "hello").unwrap())
            .await
            .unwrap();

        let stored = store.file_at(&main(), &path).unwrap();
        let before: serde_json::Value = serde_json::from_str(existing).unwrap();
        let after: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        let after = after.as_array().unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(after[..2], before.as_array().unwrap()[..]);
    }

    #[tokio::test]
    async fn corrupt_about_document() {
        let path = RepoPath::new(crate::core::config::schema::DEFAULT_ABOUT_PATH).unwrap();
        let store = MockStore::new().with_branch(&main(), &[(&path, b"not json")]);
        let err = site_with(&store).load_about().await.unwrap_err();
        assert!(matches!(err, SiteError::Decode { .. }));
    }

    #[tokio::test]
    async fn empty_guestbook_when_file_is_absent() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let book = site_with(&store).load_guestbook().await.unwrap();
        assert!(book.document.is_empty());
    }

    #[tokio::test]
    async fn post_appends_and_places_message() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let site = site_with(&store);

        let first = site.post_message(&site.draft("ada", "hi").unwrap()).await.unwrap();
        let second = site.post_message(&site.draft("bob", "yo").unwrap()).await.unwrap();

        let book = site.load_guestbook().await.unwrap().document;
        assert_eq!(
            book.ids(),
            vec![first.message.id.as_str(), second.message.id.as_str()]
        );
        assert_eq!(first.attempts, 1);
        assert!(first.message.position.x >= X_RANGE.0 && first.message.position.x <= X_RANGE.1);
        let commit = store.commit(&second.outcome.commit).unwrap();
        assert_eq!(commit.message, "New guestbook message: bob");
    }

    #[tokio::test]
    async fn post_reapplies_over_a_concurrent_post() {
        let path = RepoPath::new(crate::core::config::schema::DEFAULT_GUESTBOOK_PATH).unwrap();
        let store = MockStore::new().with_branch(&main(), &[(&path, b"[]")]);
        let site = site_with(&store);

        let theirs = site.draft("eve", "first!").unwrap();
        let mut book = Guestbook::default();
        book.push(GuestbookMessage::compose(
            &theirs,
            &[],
            Utc::now(),
            &mut rand::rng(),
        ));
        let encoded = book.encode().unwrap();
        store.interleave_commit(&[(&path, encoded.as_slice())], "New guestbook message: eve");

        let posted = site.post_message(&site.draft("ada", "hi").unwrap()).await.unwrap();

        assert_eq!(posted.attempts, 2);
        let book = site.load_guestbook().await.unwrap().document;
        assert_eq!(book.len(), 2);
        assert_eq!(book.messages()[0].nickname, "eve");
        assert_eq!(book.messages()[1].nickname, "ada");
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_locally() {
        let store = MockStore::new().with_branch(&main(), &[]);
        let site = site_with(&store);
        let err = site.draft("ada", &"x".repeat(101)).unwrap_err();
        assert!(matches!(err, SiteError::Invalid(_)));
        assert_eq!(err.user_message(), "message is 101 characters, the limit is 100");
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn store_failure_surfaces_generic_message() {
        let store = MockStore::new()
            .with_branch(&main(), &[])
            .fail_on(FailOn::CreateTree(StoreError::NetworkError("reset".into())));
        let site = site_with(&store);
        let before = store.tip(&main()).unwrap();

        let err = site.save_about(&about_doc()).await.unwrap_err();

        assert_eq!(err.user_message(), "Saving failed. Please try again later.");
        assert_eq!(store.tip(&main()).unwrap(), before);
    }

    #[test]
    fn connect_requires_repository() {
        let err = Site::connect(&SiteConfig::default()).unwrap_err();
        assert!(matches!(err, SiteError::Config(_)));
    }
}
