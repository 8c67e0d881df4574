//! Filesystem locations derived from configuration and an instance name.
//!
//! The free functions hold the naming rules and take their root explicitly,
//! so callers that run before configuration is loaded (the bootstrap step)
//! or that own their root (the freezer) apply the same rules as
//! [`SnapPaths`].

use camino::{Utf8Path, Utf8PathBuf};

use crate::Config;

/// File name of the preserved mount namespace of `instance`.
#[must_use]
pub fn namespace_file_name(instance: &str) -> String {
    format!("{instance}.mnt")
}

/// Control file of the freezer cgroup of `instance` under `freezer_root`.
#[must_use]
pub fn freezer_state_file(freezer_root: &Utf8Path, instance: &str) -> Utf8PathBuf {
    freezer_root
        .join(format!("snap.{instance}"))
        .join("freezer.state")
}

/// Runtime directory of `uid` under `runtime_dir_base`.
#[must_use]
pub fn runtime_dir(runtime_dir_base: &Utf8Path, uid: u32) -> Utf8PathBuf {
    runtime_dir_base.join(uid.to_string())
}

/// Per-instance profile locations under the configured roots.
#[derive(Debug, Clone, Copy)]
pub struct SnapPaths<'a> {
    config: &'a Config,
    instance: &'a str,
}

impl<'a> SnapPaths<'a> {
    /// Binds `instance` to the roots held by `config`.
    #[must_use]
    pub const fn new(config: &'a Config, instance: &'a str) -> Self {
        Self { config, instance }
    }

    /// Desired system profile written by snapd.
    #[must_use]
    pub fn desired_profile(&self) -> Utf8PathBuf {
        self.config
            .mount_profile_dir
            .join(format!("snap.{}.fstab", self.instance))
    }

    /// Desired per-user profile written by snapd.
    #[must_use]
    pub fn desired_user_profile(&self) -> Utf8PathBuf {
        self.config
            .mount_profile_dir
            .join(format!("snap.{}.user-fstab", self.instance))
    }

    /// Profile last applied to the system namespace.
    #[must_use]
    pub fn current_profile(&self) -> Utf8PathBuf {
        self.config
            .ns_dir
            .join(format!("snap.{}.fstab", self.instance))
    }

    /// Profile last applied to the per-user namespace of `uid`.
    #[must_use]
    pub fn current_user_profile(&self, uid: u32) -> Utf8PathBuf {
        self.config
            .ns_dir
            .join(format!("snap.{}.{uid}.user-fstab", self.instance))
    }
}
