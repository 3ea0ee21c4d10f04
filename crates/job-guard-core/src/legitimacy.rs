use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::risk::LegitimacyResult;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const LINKEDIN_BASE: &str = "https://www.linkedin.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; job-guard/0.3)";

/// Verifies the public footprint of the company behind a posting.
#[async_trait]
pub trait LegitimacyProbe: Send + Sync {
    async fn check(
        &self,
        company_name: Option<&str>,
        website: Option<&str>,
    ) -> Result<LegitimacyResult>;
}

/// Probe that treats an HTTP 200 from the website or LinkedIn company page as proof of existence.
#[derive(Debug, Clone)]
pub struct HttpLegitimacyProbe {
    http: Client,
    linkedin_base: String,
}

impl HttpLegitimacyProbe {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build legitimacy probe HTTP client")?;
        Ok(Self {
            http,
            linkedin_base: LINKEDIN_BASE.to_string(),
        })
    }

    /// Override the LinkedIn host, mainly for tests.
    pub fn with_linkedin_base(mut self, base: impl Into<String>) -> Self {
        self.linkedin_base = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn responds_ok(&self, url: &str) -> bool {
        match self.http.get(url).send().await {
            Ok(response) => {
                debug!(%url, status = %response.status(), "probe response");
                response.status() == StatusCode::OK
            }
            Err(err) => {
                debug!(%url, error = %err, "probe request failed");
                false
            }
        }
    }

    async fn website_exists(&self, website: Option<&str>) -> bool {
        match website.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => self.responds_ok(&with_scheme(url)).await,
            None => false,
        }
    }

    async fn linkedin_exists(&self, company_name: Option<&str>) -> bool {
        match company_name.and_then(linkedin_slug) {
            Some(slug) => {
                let url = format!("{}/company/{}", self.linkedin_base, slug);
                self.responds_ok(&url).await
            }
            None => false,
        }
    }
}

#[async_trait]
impl LegitimacyProbe for HttpLegitimacyProbe {
    #[instrument(name = "probe_company", skip(self))]
    async fn check(
        &self,
        company_name: Option<&str>,
        website: Option<&str>,
    ) -> Result<LegitimacyResult> {
        let (website_exists, linkedin_exists) = tokio::join!(
            self.website_exists(website),
            self.linkedin_exists(company_name)
        );
        Ok(LegitimacyResult {
            website_exists,
            linkedin_exists,
        })
    }
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// `Acme & Sons` becomes `acme-and-sons`.
pub fn linkedin_slug(company_name: &str) -> Option<String> {
    let slug = company_name
        .trim()
        .to_lowercase()
        .replace(' ', "-")
        .replace('&', "and");
    (!slug.is_empty()).then_some(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn slug_matches_linkedin_convention() {
        assert_eq!(linkedin_slug("Acme & Sons").as_deref(), Some("acme-and-sons"));
        assert_eq!(linkedin_slug("  Globex ").as_deref(), Some("globex"));
        assert_eq!(linkedin_slug("   "), None);
    }

    #[test]
    fn scheme_is_added_when_missing() {
        assert_eq!(with_scheme("acme.com"), "https://acme.com");
        assert_eq!(with_scheme("http://acme.com"), "http://acme.com");
    }

    #[tokio::test]
    async fn detects_existing_website_and_linkedin_page() {
        let server = MockServer::start_async().await;
        let site = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("welcome");
            })
            .await;
        let linkedin = server
            .mock_async(|when, then| {
                when.method(GET).path("/company/acme-and-sons");
                then.status(200);
            })
            .await;

        let probe = HttpLegitimacyProbe::new()
            .unwrap()
            .with_linkedin_base(server.base_url());
        let result = probe
            .check(Some("Acme & Sons"), Some(&server.url("/")))
            .await
            .unwrap();

        site.assert_async().await;
        linkedin.assert_async().await;
        assert_eq!(
            result,
            LegitimacyResult {
                website_exists: true,
                linkedin_exists: true,
            }
        );
    }

    #[tokio::test]
    async fn non_ok_status_counts_as_missing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/company/ghost-co");
                then.status(404);
            })
            .await;

        let probe = HttpLegitimacyProbe::new()
            .unwrap()
            .with_linkedin_base(server.base_url());
        let result = probe.check(Some("Ghost Co"), None).await.unwrap();
        assert_eq!(result, LegitimacyResult::default());
    }

    #[tokio::test]
    async fn unreachable_website_counts_as_missing() {
        let probe = HttpLegitimacyProbe::with_timeout(Duration::from_millis(500)).unwrap();
        let result = probe
            .check(None, Some("http://127.0.0.1:9/"))
            .await
            .unwrap();
        assert!(!result.website_exists);
        assert!(!result.linkedin_exists);
    }
}
