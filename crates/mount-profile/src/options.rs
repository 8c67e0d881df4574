//! Builders for the `x-snapd.*` mount options understood by snapd tooling.
//!
//! These options never reach the kernel. They steer how the helper prepares
//! mount points (creating directories, files or symlinks), how it tears
//! entries down, and how entries relate to each other.

/// Key selecting the kind of object an entry creates or mounts over.
pub const KIND: &str = "x-snapd.kind";
/// Key naming a directory that must already exist before `ensure-dir` acts.
pub const MUST_EXIST_DIR: &str = "x-snapd.must-exist-dir";
/// Key recording where an entry came from (`layout`, `overname`, ...).
pub const ORIGIN: &str = "x-snapd.origin";
/// Key overriding the identity of an entry.
pub const ID: &str = "x-snapd.id";
/// Key naming the entry a synthetic entry was created for.
pub const NEEDED_BY: &str = "x-snapd.needed-by";
/// Key holding the target of a symlink entry.
pub const SYMLINK: &str = "x-snapd.symlink";
/// Key holding the octal mode of created objects.
pub const MODE: &str = "x-snapd.mode";
/// Key holding the owner of created objects.
pub const USER: &str = "x-snapd.uid";
/// Key holding the group of created objects.
pub const GROUP: &str = "x-snapd.gid";

/// Flag marking entries synthesised to make another entry possible.
pub const SYNTHETIC: &str = "x-snapd.synthetic";
/// Flag requesting a lazy (detaching) unmount.
pub const DETACH: &str = "x-snapd.detach";
/// Flag asking for the entry to be skipped when its source or target is absent.
pub const IGNORE_MISSING: &str = "x-snapd.ignore-missing";

/// [`KIND`] value for entries that ensure a directory exists.
pub const KIND_ENSURE_DIR: &str = "ensure-dir";
/// [`KIND`] value for bind mounts of a single file.
pub const KIND_FILE: &str = "file";
/// [`KIND`] value for entries that create a symlink.
pub const KIND_SYMLINK: &str = "symlink";
/// [`ORIGIN`] value for entries produced for a parallel instance.
pub const ORIGIN_OVERNAME: &str = "overname";

/// Returns `x-snapd.must-exist-dir=<path>`.
#[must_use]
pub fn must_exist_dir(path: &str) -> String {
    format!("{MUST_EXIST_DIR}={path}")
}

/// Returns `x-snapd.needed-by=<id>`.
#[must_use]
pub fn needed_by(id: &str) -> String {
    format!("{NEEDED_BY}={id}")
}

/// Returns `x-snapd.symlink=<target>`.
#[must_use]
pub fn symlink(target: &str) -> String {
    format!("{SYMLINK}={target}")
}

/// Returns `x-snapd.mode=<mode>` with the mode spelled in octal.
#[must_use]
pub fn mode(mode: u32) -> String {
    format!("{MODE}=0{mode:o}")
}

/// Returns `x-snapd.uid=<uid>`.
#[must_use]
pub fn user(uid: u32) -> String {
    format!("{USER}={uid}")
}

/// Returns `x-snapd.gid=<gid>`.
#[must_use]
pub fn group(gid: u32) -> String {
    format!("{GROUP}={gid}")
}

/// Splits `key=value` into its parts; flags yield `None`.
pub(crate) fn split(option: &str) -> Option<(&str, &str)> {
    option.split_once('=')
}
