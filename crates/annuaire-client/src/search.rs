//! Directory search client.
//!
//! Every search is preceded by a randomized politeness delay. Responses that are
//! not JSON are treated as an anti-bot block page and reported as unavailable.

use crate::error::{ClientError, Result};
use crate::excerpt;
use crate::session::AuthenticatedSession;
use annuaire_core::{AppConfig, ProfessionId};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

/// Marker that must appear in the response content type.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Number of body characters logged when a response is rejected.
const PREVIEW_CHARS: usize = 500;

/// Parameters of one directory search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Profession code to search for
    pub profession_id: ProfessionId,
    /// Search center latitude
    pub center_lat: f64,
    /// Search center longitude
    pub center_lng: f64,
    /// Search polygon, passed through verbatim
    pub bbox: String,
}

impl SearchQuery {
    /// Query string parameters, in the order the portal's front end sends them.
    ///
    /// `centre` is `lng,lat`, the reverse of the usual order. Coordinates always
    /// carry a fractional part, so a whole degree is sent as `5.0`, not `5`.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("nom", String::new()),
            ("idProfession", self.profession_id.to_string()),
            (
                "centre",
                format!("{:?},{:?}", self.center_lng, self.center_lat),
            ),
            ("bbox", self.bbox.clone()),
            ("bboxElargie", "true".to_string()),
            ("professionType", "PROFESSION".to_string()),
        ]
    }
}

/// Runs directory searches with an authenticated session.
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    /// Run one search and return the decoded JSON body unexamined.
    ///
    /// # Errors
    /// Returns `ClientError::Unavailable` if the request fails or the response is not JSON.
    async fn search(&self, session: &AuthenticatedSession, query: &SearchQuery) -> Result<Value>;
}

/// Directory search against the portal's `recherche` endpoint.
pub struct PortalDirectory {
    endpoint: String,
    timeout: Duration,
    min_delay: Duration,
    max_delay: Duration,
}

impl PortalDirectory {
    /// Create a search client from the application configuration.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let (min_delay, max_delay) = config.scraping.delay_bounds();
        Self {
            endpoint: format!("{}/recherche", config.portal.api_url.trim_end_matches('/')),
            timeout: Duration::from_secs(config.portal.search_timeout_secs),
            min_delay,
            max_delay,
        }
    }
}

#[async_trait]
impl DirectorySearch for PortalDirectory {
    #[tracing::instrument(skip_all, fields(profession = %query.profession_id))]
    async fn search(&self, session: &AuthenticatedSession, query: &SearchQuery) -> Result<Value> {
        tracing::info!(
            "Fetching provider data for profession ID {}",
            query.profession_id
        );

        let delay = politeness_delay(self.min_delay, self.max_delay);
        tracing::info!("Polite delay: {:.2}s", delay.as_secs_f64());
        tokio::time::sleep(delay).await;

        let response = session
            .client()
            .get(&self.endpoint)
            .query(&query.to_params())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        tracing::info!("Full Request URL: {}", response.url());
        tracing::info!("HTTP Status Code: {}", response.status());

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_json_content_type(&content_type) {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Response preview:\n{}...", excerpt(&body, PREVIEW_CHARS));
            return Err(unavailable(format!(
                "expected JSON but got '{content_type}', likely blocked"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| unavailable(format!("failed to decode JSON body: {e}")))
    }
}

fn unavailable(reason: String) -> ClientError {
    tracing::error!("API request failed: {}", reason);
    ClientError::Unavailable { reason }
}

/// Whether a `Content-Type` value announces JSON.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains(JSON_CONTENT_TYPE)
}

/// Draw a delay uniformly from `[min, max]`.
///
/// Returns `min` when the range is empty or inverted.
#[must_use]
pub fn politeness_delay(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> SearchQuery {
        SearchQuery {
            profession_id: ProfessionId::GENERAL_PRACTITIONER,
            center_lat: 43.28,
            center_lng: 5.38,
            bbox: "5.2,43.1,5.5,43.1,5.5,43.4,5.2,43.4,5.2,43.1".to_string(),
        }
    }

    #[test]
    fn test_params_reverse_center() {
        let params = query().to_params();
        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(lookup("nom"), Some(""));
        assert_eq!(lookup("idProfession"), Some("37"));
        assert_eq!(lookup("centre"), Some("5.38,43.28"));
        assert_eq!(
            lookup("bbox"),
            Some("5.2,43.1,5.5,43.1,5.5,43.4,5.2,43.4,5.2,43.1")
        );
        assert_eq!(lookup("bboxElargie"), Some("true"));
        assert_eq!(lookup("professionType"), Some("PROFESSION"));
    }

    #[test]
    fn test_params_keep_whole_degree_fraction() {
        let query = SearchQuery {
            center_lat: 43.0,
            center_lng: 5.0,
            ..query()
        };
        let params = query.to_params();
        let centre = params
            .iter()
            .find(|(k, _)| *k == "centre")
            .map(|(_, v)| v.as_str());
        assert_eq!(centre, Some("5.0,43.0"));
    }

    #[test]
    fn test_params_encode_into_url() {
        let client = reqwest::Client::new();
        let request = client
            .get("https://annuairesante.ameli.fr/ansa-fo-api/recherche")
            .query(&query().to_params())
            .build()
            .expect("build request");

        let url = request.url().as_str();
        assert!(url.contains("nom=&idProfession=37"));
        assert!(url.contains("centre=5.38%2C43.28"));
        assert!(url.contains("bboxElargie=true"));
    }

    #[test]
    fn test_json_content_type() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json;charset=UTF-8"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(!is_json_content_type("text/html; charset=utf-8"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn test_politeness_delay_within_bounds() {
        let min = Duration::from_secs(5);
        let max = Duration::from_secs(12);
        for _ in 0..100 {
            let delay = politeness_delay(min, max);
            assert!(delay >= min && delay <= max, "out of range: {delay:?}");
        }
    }

    #[test]
    fn test_politeness_delay_degenerate_range() {
        assert_eq!(politeness_delay(Duration::ZERO, Duration::ZERO), Duration::ZERO);
        assert_eq!(
            politeness_delay(Duration::from_secs(3), Duration::from_secs(1)),
            Duration::from_secs(3)
        );
    }
}
