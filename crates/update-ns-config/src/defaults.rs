use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory holding preserved mount namespaces and current profiles.
///
/// The bootstrap step runs before configuration is loaded and always uses
/// this location.
pub const DEFAULT_NS_DIR: &str = "/run/snapd/ns";

/// Directory holding the desired mount profiles written by snapd.
pub const DEFAULT_MOUNT_PROFILE_DIR: &str = "/var/lib/snapd/mount";

/// Root of the freezer cgroup hierarchy.
pub const DEFAULT_FREEZER_ROOT: &str = "/sys/fs/cgroup/freezer";

/// Parent of per-user runtime directories.
pub const DEFAULT_RUNTIME_DIR_BASE: &str = "/run/user";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default namespace directory.
#[must_use]
pub fn default_ns_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_NS_DIR)
}

/// Default desired profile directory.
#[must_use]
pub fn default_mount_profile_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_MOUNT_PROFILE_DIR)
}

/// Default freezer cgroup root.
#[must_use]
pub fn default_freezer_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_FREEZER_ROOT)
}

/// Default runtime directory base.
#[must_use]
pub fn default_runtime_dir_base() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_RUNTIME_DIR_BASE)
}
