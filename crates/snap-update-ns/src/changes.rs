//! Planning the mount operations that turn one profile into another.
//!
//! The plan tears the current profile down completely, innermost mount
//! points first, and then builds the desired profile from scratch.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use mount_profile::{EntryKind, MountEntry, MountProfile, options};
use strum::Display;

/// What to do with a mount entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Mount the entry.
    Mount,
    /// Unmount the entry.
    Unmount,
}

/// One planned mount operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Operation to perform.
    pub action: Action,
    /// Entry the operation applies to.
    pub entry: MountEntry,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.action, self.entry)
    }
}

/// Computes the changes that replace `current` with `desired`.
///
/// Synthetic entries other than their tmpfs roots are dropped from the
/// teardown, since detaching the root removes them. Recursive binds, tmpfs
/// mounts and file binds are detached rather than unmounted.
#[must_use]
pub fn needed_changes(current: &MountProfile, desired: &MountProfile) -> Vec<Change> {
    let current = sorted_clean(current);
    let desired = sorted_clean(desired);

    let unmounts = current.into_iter().rev().filter_map(|mut entry| {
        let tmpfs = entry.fs_type == "tmpfs";
        let needs_detach = if entry.is_synthetic() {
            if !tmpfs {
                return None;
            }
            true
        } else {
            entry.opt_bool("rbind")
                || tmpfs
                || (entry.opt_bool("bind") && entry.kind() == EntryKind::File)
        };
        if needs_detach && !entry.detach() {
            entry.options.push(options::DETACH.to_owned());
        }
        Some(Change {
            action: Action::Unmount,
            entry,
        })
    });
    let mounts = desired.into_iter().map(|entry| Change {
        action: Action::Mount,
        entry,
    });
    unmounts.chain(mounts).collect()
}

fn sorted_clean(profile: &MountProfile) -> Vec<MountEntry> {
    let mut entries: Vec<MountEntry> = profile
        .iter()
        .cloned()
        .map(|mut entry| {
            entry.target = clean_path(&entry.target);
            entry
        })
        .collect();
    entries.sort_by(compare_entries);
    entries
}

/// Orders `overname` entries first, then by target with an implicit
/// trailing slash, which keeps a directory adjacent to its children.
fn compare_entries(left: &MountEntry, right: &MountEntry) -> Ordering {
    let overname = |entry: &MountEntry| entry.origin() == Some(options::ORIGIN_OVERNAME);
    overname(right)
        .cmp(&overname(left))
        .then_with(|| with_trailing_slash(&left.target).cmp(&with_trailing_slash(&right.target)))
}

fn with_trailing_slash(path: &str) -> Cow<'_, str> {
    if path.ends_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("{path}/"))
    }
}

/// Lexically normalises `path`: repeated and trailing slashes, `.` and
/// resolvable `..` components are removed.
#[must_use]
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return String::from(".");
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        String::from(".")
    } else {
        joined
    }
}
