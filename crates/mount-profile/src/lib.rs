//! In-memory representation of snap mount profiles.
//!
//! A mount profile is an ordered list of mount entries stored in the same
//! textual shape as `/etc/fstab`: one entry per line, six whitespace-separated
//! fields (`source target type options dump pass`). Order is significant,
//! since later entries may rely on directories created by earlier ones.
//!
//! The crate offers:
//!
//! - [`MountEntry`] for a single line, including the octal escaping used for
//!   whitespace inside fields and accessors for the `x-snapd.*` directives.
//! - [`MountProfile`] for the ordered sequence, with [`MountProfile::load`]
//!   treating a missing file as an empty profile and [`MountProfile::save`]
//!   replacing the destination atomically.
//!
//! ```
//! use mount_profile::{MountEntry, MountProfile};
//!
//! let entry: MountEntry = "/snap/foo/1/lib /usr/lib/foo none bind,ro 0 0".parse()?;
//! let profile = MountProfile::from_iter([entry]);
//! assert_eq!(
//!     profile.to_string(),
//!     "/snap/foo/1/lib /usr/lib/foo none bind,ro 0 0\n"
//! );
//! # Ok::<(), mount_profile::EntryParseError>(())
//! ```

mod entry;
mod error;
mod escape;
pub mod options;
mod profile;

pub use entry::{EntryKind, MountEntry};
pub use error::{EntryParseError, OptionError, ProfileError, ProfileParseError};
pub use profile::MountProfile;

#[cfg(test)]
mod tests;
