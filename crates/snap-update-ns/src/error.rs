//! Failures that end an invocation.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::telemetry::TelemetryError;
use crate::update::UpdateError;

/// Errors surfaced by [`crate::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The bootstrap step failed for a reason other than a missing namespace.
    #[error(transparent)]
    Bootstrap(BootstrapError),
    /// The update itself failed.
    #[error(transparent)]
    Update(#[from] UpdateError),
}
