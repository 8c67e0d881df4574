//! Fixtures shared by the helper's test suites.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use update_ns_config::{Config, freezer_state_file, namespace_file_name};

use crate::config::ConfigLoader;
use crate::freezer::{CgroupFreezer, FreezerControl, FreezerState};

static OUTCOME_LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that touch the recorded bootstrap outcome.
pub fn lock_outcome() -> MutexGuard<'static, ()> {
    OUTCOME_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Temporary directory tree standing in for the snapd state directories.
pub struct Layout {
    temp_dir: TempDir,
    config: Config,
}

impl Layout {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temporary directory");
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .expect("temporary directory path was not valid UTF-8");
        let config = Config {
            ns_dir: root.join("ns"),
            mount_profile_dir: root.join("mount"),
            freezer_root: root.join("freezer"),
            runtime_dir_base: root.join("run-user"),
            ..Config::default()
        };
        for dir in [&config.ns_dir, &config.mount_profile_dir, &config.freezer_root] {
            fs::create_dir(dir).expect("failed to create state directory");
        }
        Self { temp_dir, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn ns_dir(&self) -> &Path {
        self.config.ns_dir.as_std_path()
    }

    /// Creates the cgroup of `instance` with its processes running.
    pub fn create_cgroup(&self, instance: &str) {
        let freezer = CgroupFreezer::new(self.config.freezer_root.clone());
        let state = freezer.state_path(instance);
        let dir = state.parent().expect("state file has a parent");
        fs::create_dir_all(dir).expect("failed to create cgroup directory");
        fs::write(&state, FreezerState::Thawed.to_string()).expect("failed to write state");
    }

    pub fn freezer_state(&self, instance: &str) -> Option<String> {
        fs::read_to_string(freezer_state_file(&self.config.freezer_root, instance)).ok()
    }

    pub fn write_desired(&self, instance: &str, text: &str) {
        write(self.config.paths(instance).desired_profile(), text);
    }

    pub fn write_desired_user(&self, instance: &str, text: &str) {
        write(self.config.paths(instance).desired_user_profile(), text);
    }

    pub fn write_current(&self, instance: &str, text: &str) {
        write(self.config.paths(instance).current_profile(), text);
    }

    pub fn current(&self, instance: &str) -> Option<String> {
        fs::read_to_string(self.config.paths(instance).current_profile()).ok()
    }

    pub fn current_user(&self, instance: &str, uid: u32) -> Option<String> {
        fs::read_to_string(self.config.paths(instance).current_user_profile(uid)).ok()
    }

    /// Path where the preserved namespace of `instance` would live.
    pub fn namespace_file(&self, instance: &str) -> PathBuf {
        self.ns_dir().join(namespace_file_name(instance))
    }
}

fn write(path: Utf8PathBuf, text: &str) {
    fs::write(&path, text).expect("failed to write profile fixture");
}

/// Loader returning a fixed configuration.
pub struct StubConfigLoader {
    config: Config,
}

impl StubConfigLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StubConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that fails by passing an unknown log format on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("snap-update-ns"),
            OsString::from("--log-format"),
            OsString::from("verbose"),
        ])
    }
}

/// Freezer that records every interaction and never touches the filesystem.
#[derive(Default)]
pub struct RecordingFreezer {
    events: RefCell<Vec<String>>,
    fail_thaw: bool,
}

impl RecordingFreezer {
    pub fn failing_thaw() -> Self {
        Self {
            fail_thaw: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl FreezerControl for RecordingFreezer {
    fn write_state(&self, instance: &str, state: FreezerState) -> io::Result<()> {
        self.events.borrow_mut().push(format!("{instance}={state}"));
        if self.fail_thaw && state == FreezerState::Thawed {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(())
    }

    fn read_state(&self, _instance: &str) -> io::Result<String> {
        Ok(FreezerState::Frozen.to_string())
    }

    fn sleep(&self, _duration: Duration) {}
}
