//! store::github
//!
//! [`ObjectStore`] implementation over the GitHub git-data REST API.
//!
//! # Endpoints
//!
//! | primitive       | request                                              |
//! |-----------------|------------------------------------------------------|
//! | `resolve_ref`   | `GET git/ref/heads/{branch}`, then `GET git/commits/{sha}` |
//! | `create_blob`   | `POST git/blobs`                                     |
//! | `create_tree`   | `POST git/trees`                                     |
//! | `create_commit` | `POST git/commits`                                   |
//! | `update_ref`    | `PATCH git/refs/heads/{branch}` with `force: false`  |
//! | `read_file`     | `GET git/trees/{sha}` per path component, then `GET git/blobs/{sha}` |
//!
//! # Compare-and-swap
//!
//! The REST API has no "expected old value" for ref updates. A non-forced
//! update is rejected unless the new commit descends from the current tip.
//! The pipeline's new commit has exactly one parent, the expected tip, so
//! the update succeeds only while the branch still points at that tip (or,
//! after a history rewrite, at one of its ancestors). A rejection comes back
//! as 422 "not a fast forward" and is reported as [`RefUpdate::Conflict`].
//!
//! # Authentication
//!
//! The [`CredentialProvider`] is asked for a credential on every request. A
//! provider failure is reported as `StoreError::AuthUnavailable` and the
//! request is not sent. Requests are never retried here.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitegit::auth::EnvCredential;
//! use sitegit::store::github::GitHubStore;
//!
//! let store = GitHubStore::new(Arc::new(EnvCredential::new("GITHUB_TOKEN")), "owner", "site")?;
//! let tip = store.resolve_ref(&BranchName::new("main")?).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    check_unique_paths, BlobEncoding, BranchTip, ObjectStore, RefUpdate, StoreError, TreeEntry,
};
use crate::auth::CredentialProvider;
use crate::core::config::schema::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use crate::core::types::{BranchName, ObjectId, RepoPath};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("sitegit/", env!("CARGO_PKG_VERSION"));

/// GitHub-backed object store for one repository.
pub struct GitHubStore {
    /// HTTP client (carries the request timeout)
    client: Client,
    /// Source of the bearer credential
    credentials: Arc<dyn CredentialProvider>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to keep the provider (and anything it caches) out of logs
impl std::fmt::Debug for GitHubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStore")
            .field("credential_source", &self.credentials.source())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubStore {
    /// Create a store for `owner/repo` on github.com with the default timeout.
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Self::with_options(credentials, owner, repo, DEFAULT_API_BASE, DEFAULT_TIMEOUT)
    }

    /// Create a store with a custom API base URL and per-request timeout.
    ///
    /// Use this for GitHub Enterprise (`https://github.example.com/api/v3`)
    /// or a local test server.
    pub fn with_options(
        credentials: Arc<dyn CredentialProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Build common headers, fetching a fresh credential.
    async fn headers(&self) -> Result<HeaderMap, StoreError> {
        let token = self
            .credentials
            .credential()
            .await
            .map_err(|e| StoreError::AuthUnavailable(e.to_string()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            StoreError::AuthUnavailable("credential is not a valid header value".into())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Attach headers and send.
    async fn dispatch(
        &self,
        op: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, StoreError> {
        let request = request.headers(self.headers().await?);
        tracing::debug!(op, owner = %self.owner, repo = %self.repo, "sending request");
        request.send().await.map_err(|e| transport_error(op, e))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        op: &'static str,
        url: &str,
    ) -> Result<T, StoreError> {
        let response = self.dispatch(op, self.client.get(url)).await?;
        self.handle_response(op, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        op: &'static str,
        url: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let response = self.dispatch(op, self.client.post(url).json(body)).await?;
        self.handle_response(op, response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        op: &'static str,
        response: Response,
    ) -> Result<T, StoreError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout(format!("{op}: {e}"))
                } else {
                    StoreError::ApiError {
                        status: status.as_u16(),
                        message: format!("failed to parse {op} response: {e}"),
                    }
                }
            })
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    /// Map an error response to a [`StoreError`].
    async fn error_from_response(&self, response: Response, status: StatusCode) -> StoreError {
        // Read headers before the body consumes the response.
        let headers = response.headers();
        let required_permissions = headers
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let rate_limit_exhausted = headers
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        classify_error(status, message, required_permissions, rate_limit_exhausted)
    }

    /// Fetch a tree listing (non-recursive).
    async fn get_tree(&self, tree: &str) -> Result<GitHubTree, StoreError> {
        self.get_json("read_tree", &self.repo_url(&format!("git/trees/{}", tree)))
            .await
    }
}

#[async_trait]
impl ObjectStore for GitHubStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn resolve_ref(&self, branch: &BranchName) -> Result<BranchTip, StoreError> {
        let url = self.repo_url(&format!("git/ref/{}", branch.ref_path()));
        let reference: GitHubRef = self.get_json("resolve_ref", &url).await?;

        let url = self.repo_url(&format!("git/commits/{}", reference.object.sha));
        let commit: GitHubCommit = self.get_json("resolve_ref", &url).await?;

        Ok(BranchTip {
            commit: parse_id(commit.sha)?,
            tree: parse_id(commit.tree.sha)?,
        })
    }

    async fn create_blob(
        &self,
        content: &[u8],
        encoding: BlobEncoding,
    ) -> Result<ObjectId, StoreError> {
        let content = match encoding {
            BlobEncoding::Utf8 => std::str::from_utf8(content)
                .map_err(|_| {
                    StoreError::InvalidRequest("utf-8 blob content is not valid UTF-8".into())
                })?
                .to_string(),
            BlobEncoding::Base64 => BASE64.encode(content),
        };
        let body = CreateBlobBody {
            content: &content,
            encoding: encoding.as_str(),
        };

        let created: GitHubSha = self
            .post_json("create_blob", &self.repo_url("git/blobs"), &body)
            .await?;
        parse_id(created.sha)
    }

    async fn create_tree(
        &self,
        base_tree: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> Result<ObjectId, StoreError> {
        check_unique_paths(entries)?;

        let body = CreateTreeBody {
            base_tree: base_tree.map(ObjectId::as_str),
            tree: entries
                .iter()
                .map(|e| CreateTreeItem {
                    path: e.path.as_str(),
                    mode: e.mode.as_str(),
                    kind: e.kind.as_str(),
                    sha: e.id.as_str(),
                })
                .collect(),
        };

        let created: GitHubSha = self
            .post_json("create_tree", &self.repo_url("git/trees"), &body)
            .await?;
        parse_id(created.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId, StoreError> {
        let body = CreateCommitBody {
            message,
            tree: tree.as_str(),
            parents: parents.iter().map(ObjectId::as_str).collect(),
        };

        let created: GitHubSha = self
            .post_json("create_commit", &self.repo_url("git/commits"), &body)
            .await?;
        parse_id(created.sha)
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        expected: &ObjectId,
        new_tip: &ObjectId,
    ) -> Result<RefUpdate, StoreError> {
        let url = self.repo_url(&format!("git/refs/{}", branch.ref_path()));
        let body = UpdateRefBody {
            sha: new_tip.as_str(),
            force: false,
        };

        tracing::debug!(%branch, expected = %expected, new_tip = %new_tip, "updating ref");
        let response = self
            .dispatch("update_ref", self.client.patch(&url).json(&body))
            .await?;
        let status = response.status();

        if status.is_success() {
            return Ok(RefUpdate::Updated);
        }

        match self.error_from_response(response, status).await {
            StoreError::ApiError { status, message } if is_ref_conflict(status, &message) => {
                Ok(RefUpdate::Conflict { current: None })
            }
            other => Err(other),
        }
    }

    async fn read_file(
        &self,
        tree: &ObjectId,
        path: &RepoPath,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let components: Vec<&str> = path.components().collect();
        let (file_name, dirs) = match components.split_last() {
            Some(split) => split,
            None => return Ok(None),
        };

        let mut current = tree.as_str().to_string();
        for dir in dirs {
            let listing = self.get_tree(&current).await?;
            match listing
                .tree
                .into_iter()
                .find(|e| e.path == *dir && e.kind == "tree")
            {
                Some(entry) => current = entry.sha,
                None => return Ok(None),
            }
        }

        let listing = self.get_tree(&current).await?;
        let blob_sha = match listing
            .tree
            .into_iter()
            .find(|e| e.path == *file_name && e.kind == "blob")
        {
            Some(entry) => entry.sha,
            None => return Ok(None),
        };

        let blob: GitHubBlob = self
            .get_json("read_blob", &self.repo_url(&format!("git/blobs/{}", blob_sha)))
            .await?;
        blob.into_bytes().map(Some)
    }
}

/// Map a reqwest transport failure; timeouts stay distinguishable.
fn transport_error(op: &'static str, err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout(format!("{op}: {err}"))
    } else {
        StoreError::NetworkError(format!("{op}: {err}"))
    }
}

/// Map a non-success status and message to a [`StoreError`].
fn classify_error(
    status: StatusCode,
    message: String,
    required_permissions: Option<String>,
    rate_limit_exhausted: bool,
) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED => StoreError::AuthFailed("Invalid or expired token".into()),
        StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited,
        StatusCode::FORBIDDEN if rate_limit_exhausted => StoreError::RateLimited,
        StatusCode::FORBIDDEN => {
            let mut err_msg = format!("Permission denied: {}", message);
            if let Some(perms) = required_permissions {
                err_msg.push_str(&format!(" [required: {}]", perms));
            }
            StoreError::AuthFailed(err_msg)
        }
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        _ if status.is_server_error() => StoreError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => StoreError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

/// Whether a failed ref update means the branch moved.
///
/// Only a 422 "not a fast forward" qualifies; a 409 such as "Git Repository
/// is empty" stays an API error.
fn is_ref_conflict(status: u16, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    status == 422 && (message.contains("fast forward") || message.contains("fast-forward"))
}

fn parse_id(sha: String) -> Result<ObjectId, StoreError> {
    ObjectId::new(sha).map_err(|e| StoreError::ApiError {
        status: 200,
        message: format!("malformed object id in response: {e}"),
    })
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<CreateTreeItem<'a>>,
}

#[derive(Serialize)]
struct CreateTreeItem<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Any response whose interesting part is the object sha.
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeEntry>,
}

#[derive(Deserialize)]
struct GitHubTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Deserialize)]
struct GitHubBlob {
    content: String,
    encoding: String,
}

impl GitHubBlob {
    fn into_bytes(self) -> Result<Vec<u8>, StoreError> {
        match self.encoding.as_str() {
            "base64" => {
                // GitHub wraps base64 content at 60 columns.
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                BASE64.decode(compact).map_err(|e| StoreError::ApiError {
                    status: 200,
                    message: format!("blob content is not valid base64: {e}"),
                })
            }
            "utf-8" | "utf8" => Ok(self.content.into_bytes()),
            other => Err(StoreError::ApiError {
                status: 200,
                message: format!("unsupported blob encoding '{other}'"),
            }),
        }
    }
}
