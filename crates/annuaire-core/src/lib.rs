//! Annuaire Core - Foundation crate for the provider directory cache.
//!
//! This crate provides shared types, error handling and configuration management
//! that the storage, client and scraper crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and environment overrides
//! - [`types`] - Shared newtypes (`CityName`, `ProfessionId`, `Timestamp`)
//!
//! # Example
//!
//! ```rust
//! use annuaire_core::{AppConfig, CityName, ProfessionId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! let city = CityName::new("  Marseille ")?;
//! assert_eq!(city.as_str(), "Marseille");
//! assert_eq!(ProfessionId::GENERAL_PRACTITIONER.get(), 37);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, PortalConfig, ScrapingConfig, StorageConfig};
pub use error::{AnnuaireError, ConfigError, ConfigResult, Result};
pub use types::{CityName, ProfessionId, Timestamp};
