//! Configuration for the snap mount namespace update helper.
//!
//! Values are layered by `ortho_config`: compiled-in defaults, then a
//! configuration file, then `SNAP_UPDATE_NS_*` environment variables. The
//! helper's positional arguments are parsed by the bootstrap step and never
//! reach this layer.

mod defaults;
mod logging;
mod paths;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_FREEZER_ROOT, DEFAULT_LOG_FILTER, DEFAULT_MOUNT_PROFILE_DIR, DEFAULT_NS_DIR,
    DEFAULT_RUNTIME_DIR_BASE, default_freezer_root, default_log_filter, default_log_format,
    default_mount_profile_dir, default_ns_dir, default_runtime_dir_base,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{SnapPaths, freezer_state_file, namespace_file_name, runtime_dir};

/// Runtime configuration shared by the helper's components.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SNAP_UPDATE_NS_")]
pub struct Config {
    /// `tracing` filter expression applied to emitted events.
    #[ortho_config(default = defaults::default_log_filter())]
    pub log_filter: String,
    /// Output format of emitted events.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Directory of preserved namespaces and current profiles.
    #[ortho_config(default = defaults::default_ns_dir())]
    pub ns_dir: Utf8PathBuf,
    /// Directory of desired profiles.
    #[ortho_config(default = defaults::default_mount_profile_dir())]
    pub mount_profile_dir: Utf8PathBuf,
    /// Root of the freezer cgroup hierarchy.
    #[ortho_config(default = defaults::default_freezer_root())]
    pub freezer_root: Utf8PathBuf,
    /// Parent of per-user runtime directories.
    #[ortho_config(default = defaults::default_runtime_dir_base())]
    pub runtime_dir_base: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: defaults::default_log_filter(),
            log_format: defaults::default_log_format(),
            ns_dir: defaults::default_ns_dir(),
            mount_profile_dir: defaults::default_mount_profile_dir(),
            freezer_root: defaults::default_freezer_root(),
            runtime_dir_base: defaults::default_runtime_dir_base(),
        }
    }
}

impl Config {
    /// Filter expression for the subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Locations derived for `instance`.
    #[must_use]
    pub fn paths<'a>(&'a self, instance: &'a str) -> SnapPaths<'a> {
        SnapPaths::new(self, instance)
    }
}
