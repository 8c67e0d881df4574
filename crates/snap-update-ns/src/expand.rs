//! Substitution of `$XDG_RUNTIME_DIR` and `$HOME` in mount profiles.

use std::borrow::Cow;

use camino::Utf8Path;
use mount_profile::{EntryKind, MountEntry, MountProfile, options};
use nix::errno::Errno;
use nix::unistd::{Uid, User};
use thiserror::Error;

use update_ns_config::runtime_dir;

/// Token replaced by the runtime directory of the invoking user.
pub const XDG_RUNTIME_DIR_TOKEN: &str = "$XDG_RUNTIME_DIR";

/// Token replaced by the home directory of the invoking user.
pub const HOME_TOKEN: &str = "$HOME";

/// Errors raised while resolving a home directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HomeError {
    /// The user database could not be queried.
    #[error("cannot look up user {uid}: {}", source.desc())]
    Lookup {
        /// User being looked up.
        uid: u32,
        /// Error reported by the lookup.
        source: Errno,
    },
    /// The user database has no entry for the user.
    #[error("cannot find user {uid} in the user database")]
    UnknownUser {
        /// User being looked up.
        uid: u32,
    },
    /// The home directory is not valid UTF-8.
    #[error("home directory of user {uid} is not valid UTF-8")]
    NotUtf8 {
        /// User being looked up.
        uid: u32,
    },
}

/// Errors raised while expanding a profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// `$HOME` could not be resolved for an entry that needs it.
    #[error("cannot expand mount entry ({entry}): {source}")]
    Home {
        /// The entry as it read before expansion.
        entry: String,
        /// Reason the home directory is unknown.
        #[source]
        source: HomeError,
    },
}

/// Source of the home directory used for `$HOME`.
pub trait HomeResolver {
    /// Returns the home directory of the user the profile belongs to.
    fn home_dir(&self) -> Result<String, HomeError>;
}

/// Resolves the home directory of a user through the user database.
#[derive(Debug, Clone, Copy)]
pub struct UserDatabaseResolver {
    uid: Uid,
}

impl UserDatabaseResolver {
    /// Resolves the home directory of `uid`.
    #[must_use]
    pub const fn new(uid: Uid) -> Self {
        Self { uid }
    }
}

impl HomeResolver for UserDatabaseResolver {
    fn home_dir(&self) -> Result<String, HomeError> {
        let uid = self.uid.as_raw();
        let user = User::from_uid(self.uid)
            .map_err(|source| HomeError::Lookup { uid, source })?
            .ok_or(HomeError::UnknownUser { uid })?;
        user.dir
            .into_os_string()
            .into_string()
            .map_err(|_| HomeError::NotUtf8 { uid })
    }
}

/// Runtime directory of `uid`: `<base>/<uid>`.
#[must_use]
pub fn runtime_dir_for(base: &Utf8Path, uid: u32) -> String {
    runtime_dir(base, uid).into_string()
}

/// Replaces a leading `token` in `value` with `replacement`.
///
/// The token only matches when it is the whole value or is followed by `/`,
/// so `$FOO` never matches `$FOOBAR`. The flag reports whether a
/// replacement took place.
#[must_use]
pub fn expand_prefix_token<'a>(
    value: &'a str,
    token: &str,
    replacement: &str,
) -> (Cow<'a, str>, bool) {
    match value.strip_prefix(token) {
        Some("") => (Cow::Owned(replacement.to_owned()), true),
        Some(rest) if rest.starts_with('/') => (Cow::Owned(format!("{replacement}{rest}")), true),
        _ => (Cow::Borrowed(value), false),
    }
}

fn expand_in_place(field: &mut String, token: &str, replacement: &str) {
    let (expanded, matched) = expand_prefix_token(field, token, replacement);
    if matched {
        *field = expanded.into_owned();
    }
}

/// Replaces `$XDG_RUNTIME_DIR` in the source and target of every entry.
pub fn expand_runtime_dir_variable(profile: &mut MountProfile, base: &Utf8Path, uid: u32) {
    let dir = runtime_dir_for(base, uid);
    for entry in profile.entries_mut() {
        expand_in_place(&mut entry.source, XDG_RUNTIME_DIR_TOKEN, &dir);
        expand_in_place(&mut entry.target, XDG_RUNTIME_DIR_TOKEN, &dir);
    }
}

/// Replaces `$HOME` in `ensure-dir` entries.
///
/// Only the target and the `x-snapd.must-exist-dir` option are rewritten;
/// other entries are left exactly as they are. The home directory is
/// resolved once, when the first `ensure-dir` entry is met. If resolution
/// fails the profile is left untouched.
pub fn expand_home_dir_variable(
    profile: &mut MountProfile,
    resolver: &dyn HomeResolver,
) -> Result<(), ExpandError> {
    let mut home: Option<String> = None;
    let mut expanded: Vec<(usize, MountEntry)> = Vec::new();
    for (index, entry) in profile.iter().enumerate() {
        if entry.kind() != EntryKind::EnsureDir {
            continue;
        }
        let home_dir = match home.take() {
            Some(dir) => dir,
            None => resolver.home_dir().map_err(|source| ExpandError::Home {
                entry: entry.to_string(),
                source,
            })?,
        };
        expanded.push((index, expand_home_entry(entry, &home_dir)));
        home = Some(home_dir);
    }
    let entries = profile.entries_mut();
    for (index, entry) in expanded {
        if let Some(slot) = entries.get_mut(index) {
            *slot = entry;
        }
    }
    Ok(())
}

fn expand_home_entry(entry: &MountEntry, home_dir: &str) -> MountEntry {
    let mut rewritten = entry.clone();
    expand_in_place(&mut rewritten.target, HOME_TOKEN, home_dir);
    if let Some(must_exist) = entry.must_exist_dir() {
        let (dir, matched) = expand_prefix_token(must_exist, HOME_TOKEN, home_dir);
        if matched {
            rewritten.replace_option(&options::must_exist_dir(&dir));
        }
    }
    rewritten
}
