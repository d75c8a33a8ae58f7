//! Annuaire Scraper - City-keyed provider directory scraping.
//!
//! This crate ties the portal client to the local cache. A run resolves a city
//! (from the cache when possible), searches the directory for one profession
//! around it and stores every provider found, linked to the city.
//!
//! # Example
//!
//! ```rust,ignore
//! use annuaire_core::{AppConfig, CityName, ProfessionId};
//! use annuaire_db::Database;
//! use annuaire_scraper::{ScrapeOrchestrator, ScrapeOutcome};
//! use std::sync::Arc;
//!
//! let config = AppConfig::load_with_env()?;
//! let db = Database::new(config.database_path()?).await?;
//! db.run_migrations().await?;
//!
//! let orchestrator = ScrapeOrchestrator::from_config(Arc::new(db), &config)?;
//! let city = CityName::new("Marseille")?;
//! if let ScrapeOutcome::Saved { providers, .. } =
//!     orchestrator.run(&city, ProfessionId::GENERAL_PRACTITIONER).await
//! {
//!     println!("stored {providers} providers");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod mapping;
pub mod orchestrator;

// Re-export commonly used types
pub use error::{Result, ScrapeError};
pub use mapping::to_new_provider;
pub use orchestrator::{ScrapeOrchestrator, ScrapeOutcome};
