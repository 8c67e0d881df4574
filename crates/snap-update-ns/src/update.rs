//! Applying a desired mount profile to a snap's namespace.

use std::io;
use std::path::Path;

use mount_profile::{MountProfile, ProfileError};
use thiserror::Error;
use tracing::{debug, error, info};

use update_ns_config::Config;

use crate::bootstrap::Arguments;
use crate::changes::needed_changes;
use crate::expand::{
    ExpandError, HomeResolver, expand_home_dir_variable, expand_runtime_dir_variable,
};
use crate::freezer::{FreezerControl, FreezerError, freeze, thaw};

const UPDATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::update");

/// Which of an instance's namespaces is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The namespace shared by every process of the snap.
    System,
    /// The per-user namespace of `uid`.
    User {
        /// Real user ID of the invoking user.
        uid: u32,
    },
}

/// One update to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Snap instance being updated.
    pub instance: String,
    /// Namespace being updated.
    pub scope: Scope,
}

impl UpdateRequest {
    /// Builds the request described by the command line of user `uid`.
    #[must_use]
    pub fn from_arguments(arguments: &Arguments, uid: u32) -> Self {
        let scope = if arguments.process_user_fstab {
            Scope::User { uid }
        } else {
            Scope::System
        };
        Self {
            instance: arguments.instance.clone(),
            scope,
        }
    }
}

/// Errors raised while applying mount changes.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A mount operation failed.
    #[error("cannot perform {change}: {source}")]
    Apply {
        /// The change being performed.
        change: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Brings the namespace from `current` to `desired`.
pub trait Reconciler {
    /// Applies the difference and returns the profile now in effect.
    fn reconcile(
        &self,
        instance: &str,
        current: &MountProfile,
        desired: &MountProfile,
    ) -> Result<MountProfile, ReconcileError>;
}

/// Reconciler that computes and logs the changes without performing them.
///
/// The namespace is untouched, so the current profile stays in effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanningReconciler;

impl Reconciler for PlanningReconciler {
    fn reconcile(
        &self,
        instance: &str,
        current: &MountProfile,
        desired: &MountProfile,
    ) -> Result<MountProfile, ReconcileError> {
        let changes = needed_changes(current, desired);
        for change in &changes {
            info!(target: UPDATE_TARGET, instance, %change, "planned mount change");
        }
        debug!(
            target: UPDATE_TARGET,
            instance,
            changes = changes.len(),
            "mount changes planned"
        );
        Ok(current.clone())
    }
}

/// Errors raised while updating a namespace.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A profile could not be loaded or saved.
    #[error(transparent)]
    Profile(#[from] ProfileError),
    /// Variables in the desired profile could not be expanded.
    #[error(transparent)]
    Expand(#[from] ExpandError),
    /// Freezing or thawing failed.
    #[error(transparent)]
    Freezer(#[from] FreezerError),
    /// Applying the changes failed.
    #[error("cannot update mount namespace of snap {instance:?}: {source}")]
    Reconcile {
        /// Instance being updated.
        instance: String,
        /// Underlying failure.
        #[source]
        source: ReconcileError,
    },
}

/// External parts the update relies on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Freezer cgroup access.
    pub freezer: &'a dyn FreezerControl,
    /// Applies mount changes.
    pub reconciler: &'a dyn Reconciler,
    /// Home directory lookup for per-user profiles.
    pub home: &'a dyn HomeResolver,
}

/// Updates the namespace named by `request`.
///
/// The desired profile is loaded and, for per-user namespaces, its
/// variables are expanded. The system namespace is frozen around the
/// reconciliation and thawed again even when it fails. The profile the
/// reconciler reports is saved as the new current profile.
pub fn run_update(
    config: &Config,
    request: &UpdateRequest,
    collaborators: Collaborators<'_>,
) -> Result<(), UpdateError> {
    let instance = request.instance.as_str();
    let paths = config.paths(instance);
    let (desired_path, current_path) = match request.scope {
        Scope::System => (paths.desired_profile(), paths.current_profile()),
        Scope::User { uid } => (paths.desired_user_profile(), paths.current_user_profile(uid)),
    };

    let mut desired = MountProfile::load(desired_path.as_std_path())?;
    if let Scope::User { uid } = request.scope {
        expand_runtime_dir_variable(&mut desired, &config.runtime_dir_base, uid);
        expand_home_dir_variable(&mut desired, collaborators.home)?;
    }
    let current = MountProfile::load(current_path.as_std_path())?;
    debug!(
        target: UPDATE_TARGET,
        instance,
        desired = desired.len(),
        current = current.len(),
        "mount profiles loaded"
    );

    if request.scope != Scope::System {
        return reconcile_and_save(
            collaborators.reconciler,
            instance,
            &current,
            &desired,
            current_path.as_std_path(),
        );
    }

    freeze(collaborators.freezer, instance)?;
    let applied = reconcile_and_save(
        collaborators.reconciler,
        instance,
        &current,
        &desired,
        current_path.as_std_path(),
    );
    let thawed = thaw(collaborators.freezer, instance);
    match (applied, thawed) {
        (Err(failure), Err(thaw_error)) => {
            error!(target: UPDATE_TARGET, instance, error = %thaw_error, "thaw failed after failed update");
            Err(failure)
        }
        (Err(failure), Ok(())) => Err(failure),
        (Ok(()), Err(thaw_error)) => Err(thaw_error.into()),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn reconcile_and_save(
    reconciler: &dyn Reconciler,
    instance: &str,
    current: &MountProfile,
    desired: &MountProfile,
    current_path: &Path,
) -> Result<(), UpdateError> {
    let applied = reconciler
        .reconcile(instance, current, desired)
        .map_err(|source| UpdateError::Reconcile {
            instance: instance.to_owned(),
            source,
        })?;
    applied.save(current_path)?;
    info!(
        target: UPDATE_TARGET,
        instance,
        entries = applied.len(),
        path = %current_path.display(),
        "current mount profile saved"
    );
    Ok(())
}
