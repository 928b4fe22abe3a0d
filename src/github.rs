use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::StatsError;
use crate::ignore::IgnoreList;
use crate::service::LanguageSource;
use crate::stats::LanguageTotals;

const API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 100;
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;
const MAX_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// The three GitHub REST calls the collector needs.
pub trait GithubApi {
    /// Login of the authenticated user.
    fn username(&self) -> impl Future<Output = Result<String>> + Send;

    /// Every repository visible to the authenticated user.
    fn repositories(&self) -> impl Future<Output = Result<Vec<Repository>>> + Send;

    /// Bytes per language for one repository.
    fn repo_languages(
        &self,
        owner: &str,
        repo: &str,
    ) -> impl Future<Output = Result<HashMap<String, u64>>> + Send;
}

#[derive(Clone)]
pub struct GithubClient {
    token: Option<Arc<String>>,
    http: Arc<Client>,
    base_url: Arc<String>,
}

impl GithubClient {
    /// Create a GitHub REST client. Without a token only public data is reachable.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: Option<String>, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(http, token, base_url))
    }

    pub fn with_client(http: Client, token: Option<String>, base_url: &str) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()).map(Arc::new),
            http: Arc::new(http),
            base_url: Arc::new(base_url.trim_end_matches('/').to_string()),
        }
    }

    /// Low-level GET with basic retry/backoff; decodes the body as `T`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        const MAX_RETRIES: usize = 4;
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0usize;

        loop {
            attempt += 1;

            let mut req = self
                .http
                .get(&url)
                .header(ACCEPT, "application/vnd.github+json")
                .header(USER_AGENT, "langcard");
            if let Some(token) = &self.token {
                req = req.bearer_auth(token.as_str());
            }

            let resp = req
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("Network error requesting {url}: {e}"))?;

            let status = resp.status();

            if status.is_success() {
                return resp
                    .json::<T>()
                    .await
                    .with_context(|| format!("Failed to decode JSON from {url}"));
            }

            // If rate limited, honor Retry-After header when present
            if status.as_u16() == 429 {
                if attempt >= MAX_RETRIES {
                    return Err(anyhow::anyhow!(
                        "GitHub API returned 429 (rate-limited) for {url} and retries exhausted"
                    ));
                }
                let wait_secs = retry_after_secs(resp.headers());
                crate::warn!("rate-limited by GitHub, retrying {url} in {wait_secs}s");
                sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            if status.is_server_error() && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(250u64.saturating_mul(1 << (attempt - 1)));
                sleep(backoff).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "GitHub API returned HTTP {} for {url}: {body}",
                status.as_u16()
            ));
        }
    }
}

/// Seconds to wait before retrying a rate-limited request, capped at a minute.
fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
        .min(MAX_RETRY_AFTER_SECS)
}

impl GithubApi for GithubClient {
    async fn username(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        let user: User = self
            .get_json("/user")
            .await
            .context("Failed to get authenticated user")?;
        Ok(user.login)
    }

    async fn repositories(&self) -> Result<Vec<Repository>> {
        let mut out = Vec::new();
        let mut page = 1usize;

        loop {
            let batch: Vec<Repository> = self
                .get_json(&format!("/user/repos?per_page={PER_PAGE}&page={page}"))
                .await
                .with_context(|| format!("Failed to list repositories (page {page})"))?;

            let last_page = batch.len() < PER_PAGE;
            out.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }

        Ok(out)
    }

    async fn repo_languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>> {
        self.get_json(&format!("/repos/{owner}/{repo}/languages"))
            .await
            .with_context(|| format!("Failed to fetch languages for {owner}/{repo}"))
    }
}

/// Sums language bytes over the user's non-fork repositories.
///
/// Failing to identify the user or list repositories aborts with
/// `SourceUnavailable`. A repository whose languages cannot be fetched is
/// skipped with a warning.
pub async fn collect_language_totals<A: GithubApi + Sync>(
    api: &A,
    ignored: &IgnoreList,
) -> crate::error::Result<LanguageTotals> {
    let username = api
        .username()
        .await
        .map_err(|e| StatsError::SourceUnavailable(format!("{e:#}")))?;
    let repos = api
        .repositories()
        .await
        .map_err(|e| StatsError::SourceUnavailable(format!("{e:#}")))?;

    let mut totals = LanguageTotals::new();
    let mut skipped = 0usize;

    for repo in repos.iter().filter(|r| !r.fork) {
        let owner = repo
            .owner
            .as_ref()
            .map(|o| o.login.as_str())
            .unwrap_or(username.as_str());

        let languages = match api.repo_languages(owner, &repo.name).await {
            Ok(languages) => languages,
            Err(e) => {
                // don't fail the whole request for one repo; log and continue.
                let err = StatsError::PartialFetchFailure {
                    repo: repo.name.clone(),
                    message: format!("{e:#}"),
                };
                crate::warn!("{err}");
                skipped += 1;
                continue;
            }
        };

        for (language, bytes) in &languages {
            if !ignored.contains(language) {
                totals.record(language, *bytes);
            }
        }
    }

    crate::info!(
        "collected {} languages from {} repositories for {username} ({skipped} skipped)",
        totals.len(),
        repos.len()
    );

    Ok(totals)
}

/// `LanguageSource` backed by the GitHub API and an ignore-list.
pub struct GithubSource<A = GithubClient> {
    api: A,
    ignored: IgnoreList,
}

impl<A: GithubApi + Sync> GithubSource<A> {
    pub fn new(api: A, ignored: IgnoreList) -> Self {
        Self { api, ignored }
    }
}

impl<A: GithubApi + Send + Sync> LanguageSource for GithubSource<A> {
    fn language_totals(
        &self,
    ) -> impl Future<Output = crate::error::Result<LanguageTotals>> + Send {
        collect_language_totals(&self.api, &self.ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::LanguageUsage;

    #[derive(Default)]
    struct FakeApi {
        username: Option<String>,
        repos: Option<Vec<Repository>>,
        languages: HashMap<String, HashMap<String, u64>>,
    }

    impl FakeApi {
        fn new(user: &str) -> Self {
            Self {
                username: Some(user.to_string()),
                repos: Some(Vec::new()),
                languages: HashMap::new(),
            }
        }

        fn repo(mut self, name: &str, fork: bool, langs: &[(&str, u64)]) -> Self {
            self.repos.get_or_insert_with(Vec::new).push(Repository {
                name: name.to_string(),
                fork,
                owner: None,
            });
            self.languages.insert(
                name.to_string(),
                langs.iter().map(|(l, b)| (l.to_string(), *b)).collect(),
            );
            self
        }

        /// A repository whose languages endpoint fails.
        fn broken_repo(mut self, name: &str) -> Self {
            self.repos.get_or_insert_with(Vec::new).push(Repository {
                name: name.to_string(),
                fork: false,
                owner: None,
            });
            self
        }
    }

    impl GithubApi for FakeApi {
        async fn username(&self) -> Result<String> {
            self.username
                .clone()
                .ok_or_else(|| anyhow::anyhow!("HTTP 401 for /user"))
        }

        async fn repositories(&self) -> Result<Vec<Repository>> {
            self.repos
                .clone()
                .ok_or_else(|| anyhow::anyhow!("HTTP 500 for /user/repos"))
        }

        async fn repo_languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>> {
            assert_eq!(owner, "octocat");
            self.languages
                .get(repo)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("HTTP 404 for {repo}"))
        }
    }

    fn no_ignores() -> IgnoreList {
        IgnoreList::default()
    }

    #[tokio::test]
    async fn sums_bytes_across_repositories() {
        let api = FakeApi::new("octocat")
            .repo("one", false, &[("Rust", 1000), ("Go", 200)])
            .repo("two", false, &[("Rust", 500)]);

        let totals = collect_language_totals(&api, &no_ignores()).await.unwrap();
        assert_eq!(totals.get("Rust"), Some(LanguageUsage { bytes: 1500, repos: 2 }));
        assert_eq!(totals.get("Go"), Some(LanguageUsage { bytes: 200, repos: 1 }));
    }

    #[tokio::test]
    async fn skips_forks() {
        let api = FakeApi::new("octocat")
            .repo("mine", false, &[("Rust", 100)])
            .repo("theirs", true, &[("Java", 9000)]);

        let totals = collect_language_totals(&api, &no_ignores()).await.unwrap();
        assert!(totals.get("Java").is_none());
        assert_eq!(totals.len(), 1);
    }

    #[tokio::test]
    async fn drops_ignored_languages() {
        let api = FakeApi::new("octocat").repo("site", false, &[("HTML", 5000), ("TypeScript", 10)]);
        let ignored: IgnoreList = ["HTML"].into_iter().collect();

        let totals = collect_language_totals(&api, &ignored).await.unwrap();
        assert!(totals.get("HTML").is_none());
        assert_eq!(totals.get("TypeScript").map(|u| u.bytes), Some(10));
    }

    #[tokio::test]
    async fn single_repo_failure_is_skipped() {
        let api = FakeApi::new("octocat")
            .broken_repo("gone")
            .repo("ok", false, &[("C", 42)]);

        let totals = collect_language_totals(&api, &no_ignores()).await.unwrap();
        assert_eq!(totals.get("C").map(|u| u.bytes), Some(42));
    }

    #[tokio::test]
    async fn unknown_user_is_fatal() {
        let api = FakeApi {
            username: None,
            ..FakeApi::new("octocat")
        };
        let err = collect_language_totals(&api, &no_ignores()).await.unwrap_err();
        assert!(matches!(err, StatsError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn repository_listing_failure_is_fatal() {
        let api = FakeApi {
            repos: None,
            ..FakeApi::new("octocat")
        };
        let err = collect_language_totals(&api, &no_ignores()).await.unwrap_err();
        assert!(matches!(err, StatsError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn source_wraps_collector() {
        let api = FakeApi::new("octocat").repo("one", false, &[("Zig", 7)]);
        let source = GithubSource::new(api, no_ignores());
        let totals = source.language_totals().await.unwrap();
        assert_eq!(totals.get("Zig").map(|u| u.bytes), Some(7));
    }

    #[test]
    fn repository_payload_defaults() {
        let repos: Vec<Repository> = serde_json::from_str(
            r#"[{"name": "a", "fork": true, "owner": {"login": "org"}}, {"name": "b"}]"#,
        )
        .unwrap();
        assert!(repos[0].fork);
        assert_eq!(repos[0].owner.as_ref().map(|o| o.login.as_str()), Some("org"));
        assert!(!repos[1].fork);
        assert!(repos[1].owner.is_none());
    }

    #[test]
    fn retry_after_is_capped() {
        let wait = |value: Option<&str>| {
            let mut headers = HeaderMap::new();
            if let Some(value) = value {
                headers.insert(RETRY_AFTER, value.parse().unwrap());
            }
            retry_after_secs(&headers)
        };

        assert_eq!(wait(None), DEFAULT_RETRY_AFTER_SECS);
        assert_eq!(wait(Some("0")), 0);
        assert_eq!(wait(Some("7")), 7);
        assert_eq!(wait(Some("86400")), MAX_RETRY_AFTER_SECS);
        assert_eq!(wait(Some("Wed, 21 Oct 2015 07:28:00 GMT")), DEFAULT_RETRY_AFTER_SECS);
    }

    #[test]
    fn empty_token_means_anonymous() {
        let client = GithubClient::with_base_url(Some(String::new()), "http://localhost/").unwrap();
        assert!(client.token.is_none());
        assert_eq!(client.base_url.as_str(), "http://localhost");
    }
}
