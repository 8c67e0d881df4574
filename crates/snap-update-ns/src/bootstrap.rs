//! First step of every invocation: argument validation and namespace entry.
//!
//! Joining a mount namespace with `setns` only moves the calling thread, so
//! it must happen before the process has any other thread. [`run`] is called
//! as the first statement of `main`, before configuration, telemetry or
//! anything else that could spawn threads, and additionally refuses to enter
//! the namespace when `/proc/self/status` reports more than one thread.
//!
//! The result is returned to the caller and also recorded in process-wide
//! state, where [`bootstrap_outcome`] classifies it and [`clear_outcome`]
//! resets it between simulated runs.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::{CloneFlags, setns};
use thiserror::Error;

use update_ns_config::{DEFAULT_NS_DIR, namespace_file_name};

const FROM_SNAP_CONFINE: &str = "--from-snap-confine";
const USER_MOUNTS: &str = "--user-mounts";

const SNAP_NAME_MIN_LEN: usize = 2;
const SNAP_NAME_MAX_LEN: usize = 40;
const INSTANCE_KEY_MAX_LEN: usize = 10;

static RECORDED: Mutex<BootstrapOutcome> = Mutex::new(BootstrapOutcome::Unset);

/// Parsed command line of the helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arguments {
    /// Snap instance whose namespace is updated.
    pub instance: String,
    /// Whether the bootstrap step must join the preserved namespace itself.
    ///
    /// `false` when invoked by snap-confine, which has already placed the
    /// process in the right namespace.
    pub should_enter_namespace: bool,
    /// Whether the per-user profile is applied instead of the system one.
    pub process_user_fstab: bool,
}

/// Raw state recorded by the bootstrap step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Nothing recorded, or the record was cleared.
    #[default]
    Unset,
    /// The bootstrap step completed.
    Success,
    /// The bootstrap step stopped early.
    Failure {
        /// What the step was doing when it stopped.
        message: String,
        /// Raw OS error code, or zero for failures without one.
        errno: i32,
    },
}

/// Classified bootstrap failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    /// The instance has no preserved mount namespace yet.
    #[error("cannot update mount namespace that was not created yet")]
    NoNamespace,
    /// A system call failed.
    #[error("{message}: {}", errno.desc())]
    Os {
        /// What the step was doing when the call failed.
        message: String,
        /// Error reported by the kernel.
        errno: Errno,
    },
    /// The invocation was rejected without a system call failing.
    #[error("{message}")]
    Rejected {
        /// Reason for the rejection.
        message: String,
    },
}

impl BootstrapOutcome {
    /// Maps the recorded state onto success or a classified error.
    pub fn classify(&self) -> Result<(), BootstrapError> {
        match self {
            Self::Unset | Self::Success => Ok(()),
            Self::Failure { message, errno } => Err(classify(message, *errno)),
        }
    }
}

fn classify(message: &str, errno: i32) -> BootstrapError {
    if errno == 0 {
        return BootstrapError::Rejected {
            message: message.to_owned(),
        };
    }
    match Errno::from_raw(errno) {
        Errno::EINVAL | Errno::ENOENT => BootstrapError::NoNamespace,
        other => BootstrapError::Os {
            message: message.to_owned(),
            errno: other,
        },
    }
}

/// Reports whether `name` is a valid snap instance name.
///
/// Instance names are a snap name optionally followed by `_` and an
/// instance key.
#[must_use]
pub fn validate_instance_name(name: &str) -> bool {
    check_instance_name(name).is_ok()
}

fn check_instance_name(name: &str) -> Result<(), &'static str> {
    let (snap_name, instance_key) = match name.split_once('_') {
        Some((snap_name, key)) => (snap_name, Some(key)),
        None => (name, None),
    };
    check_snap_name(snap_name)?;
    match instance_key {
        Some(key) => check_instance_key(key),
        None => Ok(()),
    }
}

fn check_snap_name(name: &str) -> Result<(), &'static str> {
    if !name
        .bytes()
        .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
    {
        return Err("snap name must use lower case letters, digits or dashes");
    }
    if !name.bytes().any(|byte| byte.is_ascii_lowercase()) {
        return Err("snap name must contain at least one letter");
    }
    if name.starts_with('-') {
        return Err("snap name cannot start with a dash");
    }
    if name.ends_with('-') {
        return Err("snap name cannot end with a dash");
    }
    if name.contains("--") {
        return Err("snap name cannot contain two consecutive dashes");
    }
    if name.len() < SNAP_NAME_MIN_LEN {
        return Err("snap name must be longer than 1 character");
    }
    if name.len() > SNAP_NAME_MAX_LEN {
        return Err("snap name must be shorter than 40 characters");
    }
    Ok(())
}

fn check_instance_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("instance key must contain at least one letter or digit");
    }
    if !key
        .bytes()
        .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit())
    {
        return Err("instance key must use lower case letters or digits");
    }
    if key.len() > INSTANCE_KEY_MAX_LEN {
        return Err("instance key must be shorter than 10 characters");
    }
    Ok(())
}

/// Parses `[--from-snap-confine] [--user-mounts] <instance>`.
///
/// The first item is the program name and is skipped.
pub fn process_arguments<I, S>(args: I) -> Result<Arguments, BootstrapError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut instance: Option<String> = None;
    let mut should_enter_namespace = true;
    let mut process_user_fstab = false;
    for arg in args.into_iter().skip(1).map(Into::into) {
        let Ok(arg) = arg.into_string() else {
            return Err(rejected("snap name must be valid UTF-8"));
        };
        if arg.starts_with('-') {
            match arg.as_str() {
                FROM_SNAP_CONFINE => should_enter_namespace = false,
                USER_MOUNTS => process_user_fstab = true,
                _ => return Err(rejected("unsupported option")),
            }
        } else if instance.is_some() {
            return Err(rejected("too many positional arguments"));
        } else {
            instance = Some(arg);
        }
    }
    let instance = instance.ok_or_else(|| rejected("snap name not provided"))?;
    check_instance_name(&instance).map_err(rejected)?;
    Ok(Arguments {
        instance,
        should_enter_namespace,
        process_user_fstab,
    })
}

fn rejected(message: &str) -> BootstrapError {
    BootstrapError::Rejected {
        message: message.to_owned(),
    }
}

/// Runs the bootstrap step against the default namespace directory.
pub fn run<I, S>(args: I) -> Result<Arguments, BootstrapError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    run_in(Path::new(DEFAULT_NS_DIR), args)
}

/// Runs the bootstrap step against the namespace files in `ns_dir`.
///
/// The outcome is recorded before it is returned.
pub fn run_in<I, S>(ns_dir: &Path, args: I) -> Result<Arguments, BootstrapError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let result = bootstrap(ns_dir, args);
    let outcome = match &result {
        Ok(_) => BootstrapOutcome::Success,
        Err(failure) => BootstrapOutcome::Failure {
            message: failure.message.clone(),
            errno: failure.errno,
        },
    };
    record(outcome);
    result.map_err(|failure| classify(&failure.message, failure.errno))
}

struct RawFailure {
    message: String,
    errno: i32,
}

impl RawFailure {
    fn new(message: impl Into<String>, errno: i32) -> Self {
        Self {
            message: message.into(),
            errno,
        }
    }
}

fn bootstrap<I, S>(ns_dir: &Path, args: I) -> Result<Arguments, RawFailure>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let arguments =
        process_arguments(args).map_err(|error| RawFailure::new(error.to_string(), 0))?;
    if arguments.should_enter_namespace {
        enter_namespace(ns_dir, &arguments.instance)?;
    }
    Ok(arguments)
}

fn enter_namespace(ns_dir: &Path, instance: &str) -> Result<(), RawFailure> {
    let path = ns_dir.join(namespace_file_name(instance));
    let file = open_namespace_file(&path).map_err(|error| {
        RawFailure::new(
            "cannot open mount namespace file",
            error.raw_os_error().unwrap_or_default(),
        )
    })?;
    let threads = thread_count()
        .map_err(|error| RawFailure::new(format!("cannot count threads: {error}"), 0))?;
    if threads > 1 {
        return Err(RawFailure::new(
            format!("cannot switch mount namespace: process has {threads} threads"),
            0,
        ));
    }
    setns(&file, CloneFlags::CLONE_NEWNS)
        .map_err(|errno| RawFailure::new("cannot switch mount namespace", errno as i32))
}

fn open_namespace_file(path: &Path) -> io::Result<File> {
    // std adds O_CLOEXEC to every open.
    OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NOFOLLOW.bits())
        .open(path)
}

/// Returns the number of threads in the current process.
pub fn thread_count() -> io::Result<usize> {
    let status = fs::read_to_string("/proc/self/status")?;
    let (_, tail) = status
        .split_once("Threads:")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing thread count"))?;
    let count = tail
        .split_whitespace()
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed thread count"))?;
    count
        .parse::<usize>()
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

fn record(outcome: BootstrapOutcome) {
    *RECORDED.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
}

/// Records a failure as the bootstrap step would.
///
/// Lets tests reproduce outcomes that need privileges to provoke.
pub fn record_failure(message: impl Into<String>, errno: i32) {
    record(BootstrapOutcome::Failure {
        message: message.into(),
        errno,
    });
}

/// Returns the raw recorded state.
#[must_use]
pub fn recorded_outcome() -> BootstrapOutcome {
    RECORDED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Classifies the recorded state.
pub fn bootstrap_outcome() -> Result<(), BootstrapError> {
    recorded_outcome().classify()
}

/// Resets the recorded state to [`BootstrapOutcome::Unset`].
pub fn clear_outcome() {
    record(BootstrapOutcome::Unset);
}
