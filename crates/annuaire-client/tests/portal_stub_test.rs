//! Client tests against a local stand-in for the portal.

use annuaire_client::{
    AuthenticatedSession, ClientError, DirectorySearch, Geocoder, PortalDirectory,
    PortalGeocoder, PortalSessionFactory, SearchPayload, SearchQuery, SessionFactory,
};
use annuaire_core::{AppConfig, CityName, PortalConfig, ProfessionId};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TOKEN: &str = "stub-csrf-token";

#[derive(Default)]
struct StubState {
    page_html: String,
    block_search: bool,
    geocode_queries: Mutex<Vec<String>>,
    search_params: Mutex<Vec<HashMap<String, String>>>,
    correlation_ids: Mutex<Vec<String>>,
}

async fn search_page(State(state): State<Arc<StubState>>) -> Html<String> {
    Html(state.page_html.clone())
}

async fn geocode(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let city = params.get("adresse").cloned().unwrap_or_default();
    state
        .geocode_queries
        .lock()
        .expect("lock")
        .push(city.clone());

    match city.as_str() {
        "Marseille" => Json(json!([{
            "label": "Marseille",
            "geometry": {
                "centre": { "coordinates": [5.38, 43.28] },
                "bbox": { "coordinates": [[[5.2, 43.1], [5.5, 43.1], [5.5, 43.4]]] }
            }
        }]))
        .into_response(),
        "Panne" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure").into_response(),
        _ => Json(json!([])).into_response(),
    }
}

async fn search(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.search_params.lock().expect("lock").push(params);

    let token_ok = headers
        .get("x-csrf-token")
        .is_some_and(|v| v.as_bytes() == TOKEN.as_bytes());
    if let Some(id) = headers.get("correlationid").and_then(|v| v.to_str().ok()) {
        state
            .correlation_ids
            .lock()
            .expect("lock")
            .push(id.to_string());
    }

    if state.block_search || !token_ok {
        return Html("<html><body>Request blocked</body></html>").into_response();
    }

    Json(json!({
        "data": [
            {
                "prenom": "Claire",
                "nom": "MARTIN",
                "profession": { "specialite": { "libelle": "Médecin généraliste" } },
                "ville": "MARSEILLE",
                "codePostal": "13001",
                "carteVitale": true
            },
            { "prenom": "Paul", "nom": "DURAND" }
        ]
    }))
    .into_response()
}

async fn spawn_stub(state: StubState) -> (String, Arc<StubState>) {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/recherche/", get(search_page))
        .route("/ansa-fo-api/recherche/adresse", get(geocode))
        .route("/ansa-fo-api/recherche", get(search))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });

    (format!("http://{addr}"), state)
}

fn token_page() -> String {
    format!(
        "<html><head><meta name=\"csrf-token\" content=\"{TOKEN}\"></head><body></body></html>"
    )
}

fn config_for(base: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.portal = PortalConfig {
        portal_url: base.to_string(),
        api_url: format!("{base}/ansa-fo-api"),
        ..PortalConfig::default()
    };
    config.scraping.min_delay_ms = 0;
    config.scraping.max_delay_ms = 0;
    config
}

fn marseille_query(bbox: String) -> SearchQuery {
    SearchQuery {
        profession_id: ProfessionId::GENERAL_PRACTITIONER,
        center_lat: 43.28,
        center_lng: 5.38,
        bbox,
    }
}

#[tokio::test]
async fn test_geocode_known_city() {
    let (base, state) = spawn_stub(StubState::default()).await;
    let geocoder = PortalGeocoder::new(&config_for(&base).portal).expect("create geocoder");

    let city = CityName::new("Marseille").expect("valid city");
    let location = geocoder.resolve(&city).await.expect("resolve Marseille");

    assert!((location.center_lat - 43.28).abs() < f64::EPSILON);
    assert!((location.center_lng - 5.38).abs() < f64::EPSILON);
    assert_eq!(location.bbox, "5.2,43.1,5.5,43.1,5.5,43.4");
    assert_eq!(*state.geocode_queries.lock().expect("lock"), vec!["Marseille"]);
}

#[tokio::test]
async fn test_geocode_unknown_city_is_not_found() {
    let (base, _state) = spawn_stub(StubState::default()).await;
    let geocoder = PortalGeocoder::new(&config_for(&base).portal).expect("create geocoder");

    let city = CityName::new("Atlantis").expect("valid city");
    let err = geocoder.resolve(&city).await.expect_err("no such city");
    assert!(matches!(err, ClientError::NotFound { query, .. } if query == "Atlantis"));
}

#[tokio::test]
async fn test_geocode_server_error_is_not_found() {
    let (base, state) = spawn_stub(StubState::default()).await;
    let geocoder = PortalGeocoder::new(&config_for(&base).portal).expect("create geocoder");

    let city = CityName::new("Panne").expect("valid city");
    let err = geocoder.resolve(&city).await.expect_err("HTTP 500");
    match err {
        ClientError::NotFound { query, reason } => {
            assert_eq!(query, "Panne");
            assert!(reason.contains("500"), "unexpected reason: {reason}");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(state.geocode_queries.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn test_geocode_unreachable_host_is_not_found() {
    let mut portal = PortalConfig::default();
    portal.api_url = "http://127.0.0.1:1/ansa-fo-api".to_string();
    let geocoder = PortalGeocoder::new(&portal).expect("create geocoder");

    let city = CityName::new("Marseille").expect("valid city");
    let err = geocoder.resolve(&city).await.expect_err("connection refused");
    assert!(matches!(err, ClientError::NotFound { .. }));
}

#[tokio::test]
async fn test_bootstrap_and_search() {
    let (base, state) = spawn_stub(StubState {
        page_html: token_page(),
        ..StubState::default()
    })
    .await;
    let config = config_for(&base);

    let session = PortalSessionFactory::new(&config.portal)
        .create_session()
        .await
        .expect("bootstrap session");
    let body = PortalDirectory::new(&config)
        .search(&session, &marseille_query("5.2,43.1,5.5,43.4".to_string()))
        .await
        .expect("search");

    let payload = SearchPayload::from_value(&body);
    assert_eq!(payload.providers.len(), 2);
    assert_eq!(payload.skipped, 0);
    assert_eq!(
        payload.providers[0].specialty_label(),
        Some("Médecin généraliste")
    );
    assert!(payload.providers[1].specialty_label().is_none());

    let params = state.search_params.lock().expect("lock");
    assert_eq!(params.len(), 1);
    assert_eq!(params[0]["centre"], "5.38,43.28");
    assert_eq!(params[0]["idProfession"], "37");
    assert_eq!(params[0]["bbox"], "5.2,43.1,5.5,43.4");
    assert_eq!(params[0]["nom"], "");

    let ids = state.correlation_ids.lock().expect("lock");
    assert_eq!(ids.as_slice(), [session.correlation_id().to_string()]);
}

#[tokio::test]
async fn test_bootstrap_without_token_fails() {
    let (base, _state) = spawn_stub(StubState {
        page_html: "<html><body>Maintenance en cours</body></html>".to_string(),
        ..StubState::default()
    })
    .await;

    let err = PortalSessionFactory::new(&config_for(&base).portal)
        .create_session()
        .await
        .expect_err("no token on page");

    match err {
        ClientError::Bootstrap { excerpt, .. } => assert!(excerpt.contains("Maintenance")),
        other => panic!("expected Bootstrap error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blocked_search_is_unavailable() {
    let (base, _state) = spawn_stub(StubState {
        page_html: token_page(),
        block_search: true,
        ..StubState::default()
    })
    .await;
    let config = config_for(&base);

    let session = PortalSessionFactory::new(&config.portal)
        .create_session()
        .await
        .expect("bootstrap session");
    let err = PortalDirectory::new(&config)
        .search(&session, &marseille_query(String::new()))
        .await
        .expect_err("HTML block page");

    assert!(matches!(err, ClientError::Unavailable { reason } if reason.contains("text/html")));
}

#[tokio::test(start_paused = true)]
async fn test_search_waits_before_sending() {
    let (base, state) = spawn_stub(StubState::default()).await;
    let mut config = config_for(&base);
    config.scraping.min_delay_ms = 5_000;
    config.scraping.max_delay_ms = 5_000;

    let session = AuthenticatedSession::new(&config.portal, TOKEN).expect("build session");
    let directory = PortalDirectory::new(&config);
    let handle = tokio::spawn(async move {
        directory
            .search(&session, &marseille_query(String::new()))
            .await
    });

    // Let the search start its delay, then stop just short of it
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(4_999)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert!(!handle.is_finished());
    assert!(state.search_params.lock().expect("lock").is_empty());
    handle.abort();
}

#[tokio::test]
async fn test_search_is_sent_after_delay() {
    let (base, state) = spawn_stub(StubState {
        page_html: token_page(),
        ..StubState::default()
    })
    .await;
    let mut config = config_for(&base);
    config.scraping.min_delay_ms = 200;
    config.scraping.max_delay_ms = 200;

    let session = AuthenticatedSession::new(&config.portal, TOKEN).expect("build session");
    let started = Instant::now();
    PortalDirectory::new(&config)
        .search(&session, &marseille_query(String::new()))
        .await
        .expect("search");

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(state.search_params.lock().expect("lock").len(), 1);
}
