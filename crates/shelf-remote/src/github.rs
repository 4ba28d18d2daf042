//! GitHub contents API remote store.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use shelf_core::codec::{decode_transport, encode_transport};
use shelf_core::{
    defaults, AuthProvider, Error, RemoteFile, RemoteStore, RepoRef, Result, VersionToken,
};

use crate::config::RemoteConfig;
use crate::error::{to_shelf_error, RemoteErrorCode};

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    #[serde(default)]
    message: String,
}

/// Remote store backed by a GitHub repository.
pub struct GitHubStore {
    client: Client,
    config: RemoteConfig,
    auth: Arc<dyn AuthProvider>,
}

impl GitHubStore {
    /// Create a new store with the given configuration.
    pub fn new(config: RemoteConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            component = "remote",
            api_url = %config.api_url,
            branch = %config.branch,
            "Initializing GitHub remote store"
        );

        Ok(Self {
            client,
            config,
            auth,
        })
    }

    /// Create from environment variables.
    pub fn from_env(auth: Arc<dyn AuthProvider>) -> Result<Self> {
        Self::new(RemoteConfig::from_env(), auth)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), endpoint)
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> String {
        self.url(&format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.name,
            path.trim_start_matches('/')
        ))
    }

    /// Build an authenticated request. Signed-out callers never reach the wire.
    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let credentials = self.auth.auth_headers();
        if credentials.is_empty() {
            return Err(Error::Unauthorized("no credential available".to_string()));
        }

        let mut req = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", defaults::API_VERSION);
        for (name, value) in credentials {
            req = req.header(name, value);
        }
        Ok(req)
    }

    /// Send a request, retrying network failures and 5xx responses with
    /// exponential backoff. Any other response is handed back to the caller.
    async fn send<F>(&self, op: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut attempt: u32 = 0;
        loop {
            let failure = match build()?.send().await {
                Ok(resp) if !resp.status().is_server_error() => return Ok(resp),
                Ok(resp) => format!("server returned {}", resp.status()),
                Err(e) => e.to_string(),
            };

            if attempt >= self.config.transient_retries {
                return Err(Error::Transient(format!("{}: {}", op, failure)));
            }

            let delay_ms = backoff_delay_ms(self.config.retry_backoff_ms, attempt);
            attempt += 1;
            warn!(
                component = "remote",
                op,
                attempt,
                delay_ms,
                error = %failure,
                "Transient failure, retrying"
            );
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    /// Turn an unsuccessful response into an Error.
    async fn error_from(resp: Response, context: &str) -> Error {
        let status = resp.status().as_u16();
        let (remaining, reset) = rate_limit_headers(resp.headers());
        let message = resp
            .json::<GitHubErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();

        let code = RemoteErrorCode::from_response(status, remaining, &message);
        let mut detail = format!("{} ({}): {}", context, status, message);
        if code == RemoteErrorCode::RateLimited {
            if let Some(reset) = reset {
                detail.push_str(&format!(", resets at {}", reset.to_rfc3339()));
            }
        }
        debug!(component = "remote", status, ?code, "Remote request failed");
        to_shelf_error(code, &detail)
    }
}

/// Exponential backoff: `base * 2^attempt`, saturating.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
}

fn rate_limit_headers(headers: &HeaderMap) -> (Option<u64>, Option<chrono::DateTime<Utc>>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
    };
    let remaining = header("x-ratelimit-remaining").and_then(|v| v.parse().ok());
    let reset = header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    (remaining, reset)
}

#[async_trait]
impl RemoteStore for GitHubStore {
    #[instrument(skip(self, repo), fields(component = "remote", op = "repository_exists", repo = %repo))]
    async fn repository_exists(&self, repo: &RepoRef) -> Result<bool> {
        let url = self.url(&format!("/repos/{}/{}", repo.owner, repo.name));
        let resp = self
            .send("repository_exists", || self.request(Method::GET, &url))
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::error_from(resp, &format!("checking {}", repo)).await),
        }
    }

    #[instrument(skip(self, repo), fields(component = "remote", op = "create_repository", repo = %repo))]
    async fn create_repository(&self, repo: &RepoRef) -> Result<()> {
        let url = self.url("/user/repos");
        let body = CreateRepoRequest {
            name: &repo.name,
            description: defaults::REPO_DESCRIPTION,
            private: true,
            auto_init: true,
        };
        let resp = self
            .send("create_repository", || {
                Ok(self.request(Method::POST, &url)?.json(&body))
            })
            .await?;

        match resp.status() {
            s if s.is_success() => {
                info!(repo = %repo, "Created backing repository");
                Ok(())
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                debug!(repo = %repo, "Repository already exists");
                Ok(())
            }
            _ => Err(Self::error_from(resp, &format!("creating {}", repo)).await),
        }
    }

    #[instrument(skip(self, repo), fields(component = "remote", op = "read_file", repo = %repo))]
    async fn read_file(&self, repo: &RepoRef, path: &str) -> Result<Option<RemoteFile>> {
        let url = self.contents_url(repo, path);
        let branch = self.config.branch.as_str();
        let resp = self
            .send("read_file", || {
                Ok(self.request(Method::GET, &url)?.query(&[("ref", branch)]))
            })
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                debug!(path, "File not found");
                Ok(None)
            }
            s if s.is_success() => {
                let body: ContentsResponse = resp.json().await?;
                let content = match body.encoding.as_deref() {
                    None | Some("base64") => decode_transport(&body.content)?,
                    Some(other) => {
                        return Err(Error::Request(format!(
                            "{} returned with unsupported encoding '{}'",
                            path, other
                        )))
                    }
                };
                Ok(Some(RemoteFile {
                    content,
                    version: VersionToken::new(body.sha),
                }))
            }
            _ => Err(Self::error_from(resp, &format!("reading {}", path)).await),
        }
    }

    #[instrument(skip(self, repo, content, version), fields(component = "remote", op = "write_file", repo = %repo))]
    async fn write_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &str,
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken> {
        let url = self.contents_url(repo, path);
        let body = WriteRequest {
            message,
            content: encode_transport(content),
            sha: version.map(VersionToken::as_str),
            branch: &self.config.branch,
        };
        let resp = self
            .send("write_file", || {
                Ok(self.request(Method::PUT, &url)?.json(&body))
            })
            .await?;

        if resp.status().is_success() {
            let written: WriteResponse = resp.json().await?;
            debug!(path, sha = %written.content.sha, "File written");
            return Ok(VersionToken::new(written.content.sha));
        }

        // Creating a file someone else just created: GitHub asks for the sha.
        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY && version.is_none() {
            return Err(Error::Conflict(format!("{} already exists", path)));
        }
        Err(Self::error_from(resp, &format!("writing {}", path)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenAuth;

    fn store(api_url: &str) -> GitHubStore {
        GitHubStore::new(
            RemoteConfig::default().with_api_url(api_url),
            Arc::new(TokenAuth::new("octocat", "t")),
        )
        .unwrap()
    }

    #[test]
    fn test_contents_url() {
        let store = store("https://api.github.com/");
        let repo = RepoRef::new("octocat", "shelf-data");
        assert_eq!(
            store.contents_url(&repo, "/data/stars.json"),
            "https://api.github.com/repos/octocat/shelf-data/contents/data/stars.json"
        );
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay_ms(250, 0), 250);
        assert_eq!(backoff_delay_ms(250, 3), 2000);
        assert_eq!(backoff_delay_ms(250, 64), u64::MAX);
        assert_eq!(backoff_delay_ms(250, 200), u64::MAX);
        assert_eq!(backoff_delay_ms(0, 200), 0);
    }

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1707552000".parse().unwrap());
        let (remaining, reset) = rate_limit_headers(&headers);
        assert_eq!(remaining, Some(0));
        assert_eq!(reset.unwrap().timestamp(), 1_707_552_000);
    }

    #[test]
    fn test_request_requires_credentials() {
        let store = GitHubStore::new(RemoteConfig::default(), Arc::new(TokenAuth::signed_out()))
            .unwrap();
        let err = store
            .request(Method::GET, "https://api.github.com/user")
            .unwrap_err();
        assert!(err.requires_login());
    }
}
