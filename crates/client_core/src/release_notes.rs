//! Best-effort "what's new" fetch against a GitHub-style releases API.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use shared::protocol::ReleaseNotes;

const DEFAULT_API_BASE: &str = "https://api.github.com";

pub struct ReleaseNotesClient {
    http: Client,
    api_base: String,
}

impl ReleaseNotesClient {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into(),
        }
    }

    /// Fetches the release published under `tag`. The caller treats failure
    /// as "no what's-new content"; nothing here retries.
    pub async fn fetch_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<ReleaseNotes> {
        let url = format!(
            "{}/repos/{owner}/{repo}/releases/tags/{tag}",
            self.api_base
        );
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, "desktop-chat-client")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("release notes request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("release notes request returned {status}: {url}"));
        }

        response
            .json::<ReleaseNotes>()
            .await
            .context("release notes response was not a release object")
    }
}

impl Default for ReleaseNotesClient {
    fn default() -> Self {
        Self::new()
    }
}
