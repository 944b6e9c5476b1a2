//! Harness configuration supplied by the owning test module.
//!
//! [`HarnessConfig`] mirrors the configuration map the test module hands the
//! connector. Behavior toggles default to off; path fields are validated for
//! existence at connector construction, since a missing bootstrap entry point
//! is a configuration bug no test can recover from.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::BootError;

/// Default base URL used to seed the initial boot's current request.
pub const DEFAULT_BASE_URL: &str = "http://localhost";

/// Configuration recognized by the connector.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Start every test with exception handling bypassed, so application
    /// errors reach the caller instead of becoming error responses.
    pub disable_exception_handling: bool,
    /// Skip middleware execution in the HTTP kernel.
    pub disable_middleware: bool,
    /// Replace the event bus with a muted stand-in that records but never
    /// runs listeners.
    pub disable_events: bool,
    /// Detach the ORM's model-event dispatcher on every boot.
    pub disable_model_events: bool,
    /// Path to the host's bootstrap entry point, if it lives on disk.
    pub bootstrap_file: Option<PathBuf>,
    /// Path to the environment file handed to the host's bootstrapper.
    pub environment_file: Option<PathBuf>,
    /// Project root directory handed to the host's bootstrapper.
    pub project_dir: Option<PathBuf>,
    /// Base URL override; defaults to [`DEFAULT_BASE_URL`].
    pub url: Option<String>,
}

impl HarnessConfig {
    /// Base URL for seeding the initial request.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Check that every configured path exists.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::MissingBootstrapFile`] or
    /// [`BootError::MissingEnvironmentFile`] when a configured path is
    /// absent. Unset paths are not an error; the host bootstrapper decides
    /// whether it needs them.
    pub fn validate(&self) -> Result<(), BootError> {
        if let Some(path) = &self.bootstrap_file
            && !path.exists()
        {
            return Err(BootError::MissingBootstrapFile(path.clone()));
        }
        if let Some(path) = &self.environment_file
            && !path.exists()
        {
            return Err(BootError::MissingEnvironmentFile(path.clone()));
        }
        Ok(())
    }
}
