//! Portal session bootstrap.
//!
//! The directory API only answers requests that carry the anti-forgery token
//! embedded in the portal's search page. Bootstrapping fetches that page once,
//! extracts the token and returns a client that attaches it, together with a
//! fresh correlation id, to every later request.

use crate::error::{ClientError, Result};
use crate::{excerpt, headers};
use annuaire_core::PortalConfig;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Number of body characters kept in bootstrap diagnostics.
const EXCERPT_CHARS: usize = 500;

/// Number of token characters shown in logs.
const TOKEN_LOG_PREFIX: usize = 9;

/// `<meta name="csrf-token" content="...">`, attributes in the portal's order
static CSRF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta\s+name="csrf-token"\s+content="([^"]+)""#)
        .expect("CSRF regex is hardcoded and valid")
});

/// A client pre-loaded with the session token and correlation id.
///
/// Lives for one orchestration run; tokens are never refreshed.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    client: Client,
    correlation_id: Uuid,
}

impl AuthenticatedSession {
    /// Build a session around an already extracted token, with an empty cookie jar.
    ///
    /// # Errors
    /// Returns error if the token cannot be used as a header value or the client cannot be built.
    pub fn new(config: &PortalConfig, csrf_token: &str) -> Result<Self> {
        Self::with_cookie_jar(config, csrf_token, Arc::new(Jar::default()))
    }

    /// Build a session that shares `jar` with the client that fetched the token.
    ///
    /// # Errors
    /// Returns error if the token cannot be used as a header value or the client cannot be built.
    pub fn with_cookie_jar(config: &PortalConfig, csrf_token: &str, jar: Arc<Jar>) -> Result<Self> {
        let correlation_id = Uuid::new_v4();
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers::session_headers(
                csrf_token,
                &correlation_id.to_string(),
            )?)
            .cookie_provider(jar)
            .build()?;

        Ok(Self {
            client,
            correlation_id,
        })
    }

    /// HTTP client carrying the session headers.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Correlation id attached to every request of this session.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Produces authenticated sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Perform the bootstrap handshake.
    ///
    /// # Errors
    /// Returns `ClientError::Bootstrap` if the token cannot be extracted, or
    /// `ClientError::Transport` if the page cannot be fetched.
    async fn create_session(&self) -> Result<AuthenticatedSession>;
}

/// Bootstraps sessions by scraping the portal's search page.
pub struct PortalSessionFactory {
    config: PortalConfig,
    page_url: String,
}

impl PortalSessionFactory {
    /// Create a factory for the configured portal.
    #[must_use]
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            page_url: format!("{}/recherche/", config.portal_url.trim_end_matches('/')),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SessionFactory for PortalSessionFactory {
    #[tracing::instrument(skip_all)]
    async fn create_session(&self) -> Result<AuthenticatedSession> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .default_headers(headers::page_headers())
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        tracing::info!("Fetching search page to establish session...");
        let body = client
            .get(&self.page_url)
            .timeout(Duration::from_secs(self.config.bootstrap_timeout_secs))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let Some(token) = extract_csrf_token(&body) else {
            let snippet = excerpt(&body, EXCERPT_CHARS);
            tracing::error!("Could not extract CSRF token. Response snippet: {}", snippet);
            return Err(ClientError::Bootstrap {
                reason: "csrf-token meta tag not found on search page".to_string(),
                excerpt: snippet,
            });
        };

        let session = AuthenticatedSession::with_cookie_jar(&self.config, token, jar)?;

        tracing::info!(
            "Authenticated session created successfully (CSRF: {}..., correlation: {})",
            excerpt(token, TOKEN_LOG_PREFIX),
            session.correlation_id()
        );

        Ok(session)
    }
}

/// Find the `csrf-token` meta tag value in a page.
#[must_use]
pub fn extract_csrf_token(html: &str) -> Option<&str> {
    CSRF_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
