//! Privileged helper that updates the mount namespace of a snap.
//!
//! An invocation proceeds in a fixed order:
//!
//! 1. [`bootstrap::run`] validates the arguments and joins the preserved
//!    mount namespace while the process is still single-threaded.
//! 2. Configuration and telemetry are initialised.
//! 3. [`update::run_update`] loads the desired profile, expands
//!    `$XDG_RUNTIME_DIR` and `$HOME` for per-user profiles, freezes the snap,
//!    hands both profiles to a [`update::Reconciler`], saves the resulting
//!    current profile and thaws the snap.
//!
//! An instance without a preserved namespace has nothing to update and the
//! invocation succeeds quietly.

pub mod bootstrap;
pub mod changes;
pub mod config;
mod error;
pub mod expand;
pub mod freezer;
pub mod telemetry;
pub mod update;

use std::io::Write;
use std::process::ExitCode;

use nix::unistd::getuid;
use tracing::{error, info};

pub use error::RunError;

use crate::bootstrap::{Arguments, BootstrapError};
use crate::config::{ConfigLoader, SystemConfigLoader};
use crate::expand::UserDatabaseResolver;
use crate::freezer::CgroupFreezer;
use crate::update::{Collaborators, PlanningReconciler, UpdateRequest, run_update};

const RUN_TARGET: &str = env!("CARGO_PKG_NAME");

/// Runs the helper after the bootstrap step, reporting failures on `stderr`.
#[must_use]
pub fn run<E: Write>(bootstrap: Result<Arguments, BootstrapError>, stderr: &mut E) -> ExitCode {
    run_with_loader(bootstrap, stderr, &SystemConfigLoader::default())
}

/// Like [`run`], with configuration supplied by `loader`.
#[must_use]
pub fn run_with_loader<E: Write>(
    bootstrap: Result<Arguments, BootstrapError>,
    stderr: &mut E,
    loader: &dyn ConfigLoader,
) -> ExitCode {
    match execute(bootstrap, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(target: RUN_TARGET, error = %failure, "update failed");
            let _ = writeln!(stderr, "{failure}");
            ExitCode::FAILURE
        }
    }
}

fn execute(
    bootstrap: Result<Arguments, BootstrapError>,
    loader: &dyn ConfigLoader,
) -> Result<(), RunError> {
    let config = loader
        .load()
        .map_err(|source| RunError::Config { source })?;
    telemetry::initialise(&config).map_err(|source| RunError::Telemetry { source })?;

    let arguments = match bootstrap {
        Ok(arguments) => arguments,
        Err(BootstrapError::NoNamespace) => {
            info!(target: RUN_TARGET, "mount namespace not created yet; nothing to update");
            return Ok(());
        }
        Err(error) => return Err(RunError::Bootstrap(error)),
    };

    let uid = getuid();
    let request = UpdateRequest::from_arguments(&arguments, uid.as_raw());
    let freezer = CgroupFreezer::new(config.freezer_root.clone());
    let home = UserDatabaseResolver::new(uid);
    let collaborators = Collaborators {
        freezer: &freezer,
        reconciler: &PlanningReconciler,
        home: &home,
    };
    run_update(&config, &request, collaborators)?;
    Ok(())
}

#[cfg(test)]
mod tests;
