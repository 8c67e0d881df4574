//! Freezing and thawing the processes of a snap through the freezer cgroup.
//!
//! Freezing is cooperative: after `FROZEN` is written the kernel reports
//! `FREEZING` until every task has stopped. [`freeze`] waits for that
//! transition for at most [`FREEZE_POLL_ATTEMPTS`] reads spaced
//! [`FREEZE_POLL_INTERVAL`] apart, with no pause after the last read.
//! Running out of attempts is not an error: the wait is best effort and the
//! caller proceeds regardless.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

use update_ns_config::{DEFAULT_FREEZER_ROOT, freezer_state_file};

const FREEZER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::freezer");

/// Maximum number of state reads while waiting for a freeze to settle.
pub const FREEZE_POLL_ATTEMPTS: usize = 10;

/// Pause between state reads.
pub const FREEZE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// States of a freezer cgroup as spelled in `freezer.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum FreezerState {
    /// Tasks run normally.
    Thawed,
    /// The kernel is stopping tasks.
    Freezing,
    /// Every task is stopped.
    Frozen,
}

/// Errors raised while driving a freezer cgroup.
#[derive(Debug, Error)]
pub enum FreezerError {
    /// Writing `FROZEN` failed.
    #[error("cannot freeze processes of snap {instance:?}: {source}")]
    Freeze {
        /// Instance whose processes were being frozen.
        instance: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the state while waiting for the freeze failed.
    #[error("cannot determine the freeze state of processes of snap {instance:?}: {source}")]
    State {
        /// Instance whose processes were being frozen.
        instance: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing `THAWED` failed.
    #[error("cannot thaw processes of snap {instance:?}: {source}")]
    Thaw {
        /// Instance whose processes were being thawed.
        instance: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Access to the freezer control file of a snap instance.
pub trait FreezerControl {
    /// Writes `state` to the control file of `instance`.
    fn write_state(&self, instance: &str, state: FreezerState) -> io::Result<()>;

    /// Reads the raw contents of the control file of `instance`.
    fn read_state(&self, instance: &str) -> io::Result<String>;

    /// Blocks between two reads.
    fn sleep(&self, duration: Duration);
}

/// Control files under a freezer cgroup hierarchy.
#[derive(Debug, Clone)]
pub struct CgroupFreezer {
    root: Utf8PathBuf,
}

impl CgroupFreezer {
    /// Uses the hierarchy mounted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Control file of `instance`: `<root>/snap.<instance>/freezer.state`.
    #[must_use]
    pub fn state_path(&self, instance: &str) -> PathBuf {
        freezer_state_file(&self.root, instance).into_std_path_buf()
    }
}

impl Default for CgroupFreezer {
    fn default() -> Self {
        Self::new(DEFAULT_FREEZER_ROOT)
    }
}

impl FreezerControl for CgroupFreezer {
    fn write_state(&self, instance: &str, state: FreezerState) -> io::Result<()> {
        fs::write(self.state_path(instance), state.to_string())
    }

    fn read_state(&self, instance: &str) -> io::Result<String> {
        fs::read_to_string(self.state_path(instance))
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Freezes the processes of `instance` and waits, within bounds, for the
/// kernel to finish.
pub fn freeze(control: &dyn FreezerControl, instance: &str) -> Result<(), FreezerError> {
    control
        .write_state(instance, FreezerState::Frozen)
        .map_err(|source| FreezerError::Freeze {
            instance: instance.to_owned(),
            source,
        })?;
    for attempt in 1..=FREEZE_POLL_ATTEMPTS {
        let raw = control
            .read_state(instance)
            .map_err(|source| FreezerError::State {
                instance: instance.to_owned(),
                source,
            })?;
        if raw.trim().parse::<FreezerState>().ok() != Some(FreezerState::Freezing) {
            debug!(
                target: FREEZER_TARGET,
                instance,
                attempt,
                state = raw.trim(),
                "processes frozen"
            );
            return Ok(());
        }
        if attempt < FREEZE_POLL_ATTEMPTS {
            control.sleep(FREEZE_POLL_INTERVAL);
        }
    }
    warn!(
        target: FREEZER_TARGET,
        instance,
        attempts = FREEZE_POLL_ATTEMPTS,
        "processes still freezing; continuing"
    );
    Ok(())
}

/// Thaws the processes of `instance`.
pub fn thaw(control: &dyn FreezerControl, instance: &str) -> Result<(), FreezerError> {
    control
        .write_state(instance, FreezerState::Thawed)
        .map_err(|source| FreezerError::Thaw {
            instance: instance.to_owned(),
            source,
        })?;
    debug!(target: FREEZER_TARGET, instance, "processes thawed");
    Ok(())
}
