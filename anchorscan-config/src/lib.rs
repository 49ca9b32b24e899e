//! Configuration library for the anchorscan agent.
//!
//! Values come from an optional TOML file, a `.env` file and the process
//! environment, with the environment taking precedence. The loader returns
//! the resolved [`Config`] together with non-fatal [`ConfigWarnings`]; hard
//! misconfiguration surfaces as a [`ConfigGuardRailError`].

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{ApiConfig, Config, ConfigMetadata, RadioConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
