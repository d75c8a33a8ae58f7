//! Annuaire Client - HTTP access to the Ameli health provider directory.
//!
//! The directory is not a public API. Searches only succeed when they look like
//! they come from the portal's own front end, so this crate reproduces its three
//! steps:
//!
//! 1. **Geocoding** - resolve a city name to a center point and search polygon
//! 2. **Session bootstrap** - fetch the search page and extract its anti-forgery token
//! 3. **Search** - query providers around the resolved location with the token attached
//!
//! Each step sits behind a trait ([`Geocoder`], [`SessionFactory`],
//! [`DirectorySearch`]) so callers can substitute their own implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use annuaire_client::{
//!     DirectorySearch, Geocoder, PortalDirectory, PortalGeocoder, PortalSessionFactory,
//!     SearchPayload, SearchQuery, SessionFactory,
//! };
//! use annuaire_core::{AppConfig, CityName, ProfessionId};
//!
//! let config = AppConfig::default();
//! let location = PortalGeocoder::new(&config.portal)?
//!     .resolve(&CityName::new("Marseille")?)
//!     .await?;
//! let session = PortalSessionFactory::new(&config.portal).create_session().await?;
//!
//! let query = SearchQuery {
//!     profession_id: ProfessionId::GENERAL_PRACTITIONER,
//!     center_lat: location.center_lat,
//!     center_lng: location.center_lng,
//!     bbox: location.bbox,
//! };
//! let body = PortalDirectory::new(&config).search(&session, &query).await?;
//! let payload = SearchPayload::from_value(&body);
//! println!("{} providers", payload.providers.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod geocoder;
pub mod headers;
pub mod payload;
pub mod search;
pub mod session;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use geocoder::{Geocoder, PortalGeocoder, ResolvedLocation};
pub use payload::{is_empty_response, ProviderRecord, SearchPayload};
pub use search::{DirectorySearch, PortalDirectory, SearchQuery};
pub use session::{AuthenticatedSession, PortalSessionFactory, SessionFactory};

/// First `max_chars` characters of `text`, cut on a character boundary.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
