//! Loading configuration without exposing the helper's own arguments.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};

use update_ns_config::Config;

/// Source of the helper configuration.
pub trait ConfigLoader {
    /// Loads the configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loads defaults, the configuration file and `SNAP_UPDATE_NS_*` variables.
///
/// Only the program name is handed to the command-line layer: the real
/// arguments belong to the bootstrap step.
#[derive(Debug, Clone)]
pub struct SystemConfigLoader {
    program: OsString,
}

impl SystemConfigLoader {
    /// Loader reporting `program` as the binary name.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemConfigLoader {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([self.program.clone()])
    }
}
