//! Scrape orchestrator.
//!
//! One run takes a city name and a profession code through the whole pipeline:
//! city cache lookup, geocoding on a miss, session bootstrap, directory search,
//! mapping and batch persistence. Runs are strictly sequential.

use crate::error::Result;
use crate::mapping::to_new_provider;
use annuaire_client::{
    is_empty_response, ClientError, DirectorySearch, Geocoder, PortalDirectory, PortalGeocoder,
    PortalSessionFactory, SearchPayload, SearchQuery, SessionFactory,
};
use annuaire_core::{AppConfig, CityName, ProfessionId};
use annuaire_db::{cities, providers, City, Database, NewCity, NewProvider};
use std::sync::Arc;

/// How a scrape run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// Providers were stored for the city
    Saved {
        /// Cached city the providers reference
        city_id: i64,
        /// Number of provider rows written
        providers: usize,
        /// Number of malformed records that were dropped
        skipped: usize,
    },
    /// Geocoding returned nothing; nothing was stored
    CityNotResolved,
    /// The search was blocked or failed; the city stays cached
    SearchUnavailable {
        /// Cached city the search was for
        city_id: i64,
    },
    /// The search answered with an empty body
    NoData {
        /// Cached city the search was for
        city_id: i64,
    },
    /// An unexpected error stopped the run
    Aborted {
        /// Error description
        reason: String,
    },
}

/// Drives one scrape run at a time against the configured collaborators.
pub struct ScrapeOrchestrator {
    /// City and provider cache
    db: Arc<Database>,
    /// City name resolution
    geocoder: Arc<dyn Geocoder>,
    /// Session bootstrap
    sessions: Arc<dyn SessionFactory>,
    /// Directory search
    directory: Arc<dyn DirectorySearch>,
}

impl ScrapeOrchestrator {
    /// Create an orchestrator from explicit collaborators.
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        geocoder: Arc<dyn Geocoder>,
        sessions: Arc<dyn SessionFactory>,
        directory: Arc<dyn DirectorySearch>,
    ) -> Self {
        Self {
            db,
            geocoder,
            sessions,
            directory,
        }
    }

    /// Create an orchestrator talking to the portal described by `config`.
    ///
    /// # Errors
    /// Returns error if the geocoding HTTP client cannot be built.
    pub fn from_config(db: Arc<Database>, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            db,
            Arc::new(PortalGeocoder::new(&config.portal)?),
            Arc::new(PortalSessionFactory::new(&config.portal)),
            Arc::new(PortalDirectory::new(config)),
        ))
    }

    /// Run the pipeline for `city` and `profession`.
    ///
    /// Never fails: errors are logged and reported as [`ScrapeOutcome::Aborted`].
    pub async fn run(&self, city: &CityName, profession: ProfessionId) -> ScrapeOutcome {
        match self.execute(city, profession).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Scrape for {} aborted: {}", city, e);
                ScrapeOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Run the pipeline, returning unexpected errors to the caller.
    ///
    /// Geocoding misses and unavailable searches are not errors; they end the run
    /// with the matching outcome.
    ///
    /// # Errors
    /// Returns error if the session bootstrap or a storage operation fails.
    #[tracing::instrument(skip_all, fields(city = %city, profession = %profession))]
    pub async fn execute(&self, city: &CityName, profession: ProfessionId) -> Result<ScrapeOutcome> {
        let Some(cached) = self.resolve_city(city).await? else {
            return Ok(ScrapeOutcome::CityNotResolved);
        };
        let city_id = cached.id;

        let session = self.sessions.create_session().await?;
        let query = SearchQuery {
            profession_id: profession,
            center_lat: cached.center_lat,
            center_lng: cached.center_lng,
            bbox: cached.bbox,
        };

        let body = match self.directory.search(&session, &query).await {
            Ok(body) => body,
            Err(ClientError::Unavailable { reason }) => {
                tracing::warn!("No provider data fetched for city {}: {}", city, reason);
                return Ok(ScrapeOutcome::SearchUnavailable { city_id });
            }
            Err(e) => return Err(e.into()),
        };

        if is_empty_response(&body) {
            tracing::warn!("No provider data found for city {}", city);
            return Ok(ScrapeOutcome::NoData { city_id });
        }

        let payload = SearchPayload::from_value(&body);
        let rows: Vec<NewProvider> = payload
            .providers
            .iter()
            .map(|record| to_new_provider(record, city_id))
            .collect();

        let saved = providers::insert_batch(self.db.pool(), &rows).await?;
        tracing::info!("Saved {} providers for city {}", saved, city);

        Ok(ScrapeOutcome::Saved {
            city_id,
            providers: saved,
            skipped: payload.skipped,
        })
    }

    /// Return the cached city, geocoding and caching it first on a miss.
    ///
    /// `None` means the geocoder found nothing.
    async fn resolve_city(&self, city: &CityName) -> Result<Option<City>> {
        if let Some(cached) = cities::find_by_name(self.db.pool(), city.as_str()).await? {
            tracing::info!(
                "Using cached coordinates for {}: ({}, {})",
                city,
                cached.center_lat,
                cached.center_lng
            );
            return Ok(Some(cached));
        }

        let location = match self.geocoder.resolve(city).await {
            Ok(location) => location,
            Err(ClientError::NotFound { reason, .. }) => {
                tracing::warn!("Could not resolve coordinates for {}: {}", city, reason);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let stored = cities::insert_or_get(
            self.db.pool(),
            &NewCity {
                name: city.as_str().to_string(),
                center_lat: location.center_lat,
                center_lng: location.center_lng,
                bbox: location.bbox,
            },
        )
        .await?;
        tracing::info!("Saved new city {} with id {}", city, stored.id);

        Ok(Some(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annuaire_client::{AuthenticatedSession, ResolvedLocation};
    use annuaire_core::PortalConfig;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn resolve(&self, city: &CityName) -> annuaire_client::Result<ResolvedLocation> {
            Err(ClientError::NotFound {
                query: city.to_string(),
                reason: "empty result list".to_string(),
            })
        }
    }

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn resolve(&self, _city: &CityName) -> annuaire_client::Result<ResolvedLocation> {
            Ok(ResolvedLocation {
                center_lat: 45.76,
                center_lng: 4.83,
                bbox: "4.7,45.7,4.9,45.7,4.9,45.8".to_string(),
            })
        }
    }

    struct StaticSessions;

    #[async_trait]
    impl SessionFactory for StaticSessions {
        async fn create_session(&self) -> annuaire_client::Result<AuthenticatedSession> {
            AuthenticatedSession::new(&PortalConfig::default(), "token")
        }
    }

    struct CannedDirectory(Value);

    #[async_trait]
    impl DirectorySearch for CannedDirectory {
        async fn search(
            &self,
            _session: &AuthenticatedSession,
            _query: &SearchQuery,
        ) -> annuaire_client::Result<Value> {
            Ok(self.0.clone())
        }
    }

    async fn orchestrator(geocoder: Arc<dyn Geocoder>, body: Value) -> ScrapeOrchestrator {
        let db = Database::new(":memory:").await.expect("create test db");
        db.run_migrations().await.expect("run migrations");
        ScrapeOrchestrator::new(
            Arc::new(db),
            geocoder,
            Arc::new(StaticSessions),
            Arc::new(CannedDirectory(body)),
        )
    }

    fn lyon() -> CityName {
        CityName::new("Lyon").expect("valid city")
    }

    #[tokio::test]
    async fn test_unresolved_city() {
        let orch = orchestrator(Arc::new(NoGeocoder), json!({ "data": [] })).await;

        let outcome = orch.run(&lyon(), ProfessionId::GENERAL_PRACTITIONER).await;
        assert_eq!(outcome, ScrapeOutcome::CityNotResolved);
        assert!(cities::list(orch.db.pool()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_null_body_is_no_data() {
        let orch = orchestrator(Arc::new(FixedGeocoder), Value::Null).await;

        let outcome = orch.run(&lyon(), ProfessionId::GENERAL_PRACTITIONER).await;
        let ScrapeOutcome::NoData { city_id } = outcome else {
            panic!("expected NoData, got {outcome:?}");
        };
        assert_eq!(
            providers::count_by_city(orch.db.pool(), city_id)
                .await
                .expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn test_empty_object_is_no_data() {
        let orch = orchestrator(Arc::new(FixedGeocoder), json!({})).await;

        let outcome = orch.run(&lyon(), ProfessionId::GENERAL_PRACTITIONER).await;
        assert!(matches!(outcome, ScrapeOutcome::NoData { .. }));
    }

    #[tokio::test]
    async fn test_saves_decodable_records() {
        let body = json!({
            "data": [
                { "nom": "MARTIN", "carteVitale": true },
                42,
                { "nom": "BERNARD" }
            ]
        });
        let orch = orchestrator(Arc::new(FixedGeocoder), body).await;

        let outcome = orch.run(&lyon(), ProfessionId::GENERAL_PRACTITIONER).await;
        let ScrapeOutcome::Saved {
            city_id,
            providers: saved,
            skipped,
        } = outcome
        else {
            panic!("expected Saved, got {outcome:?}");
        };
        assert_eq!(saved, 2);
        assert_eq!(skipped, 1);

        let stored = providers::list_by_city(orch.db.pool(), city_id)
            .await
            .expect("list providers");
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|p| p.fields.city_id == city_id));
    }

    #[tokio::test]
    async fn test_empty_data_list_saves_nothing() {
        let orch = orchestrator(Arc::new(FixedGeocoder), json!({ "data": [] })).await;

        let outcome = orch.run(&lyon(), ProfessionId::GENERAL_PRACTITIONER).await;
        assert!(matches!(
            outcome,
            ScrapeOutcome::Saved {
                providers: 0,
                skipped: 0,
                ..
            }
        ));
    }
}
