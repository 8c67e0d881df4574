//! A single line of a mount table.

use std::fmt;
use std::str::FromStr;

use crate::error::{EntryParseError, OptionError};
use crate::escape::{escape, unescape};
use crate::options;

const DEFAULT_MODE: u32 = 0o755;

/// One mount table entry.
///
/// Every field owns its text. Parsing decodes octal escapes and formatting
/// re-encodes them, so a parse followed by a format reproduces the field
/// values and the option order exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountEntry {
    /// Device or bind-mount source; `none` where not applicable.
    pub source: String,
    /// Mount point.
    pub target: String,
    /// Filesystem type, possibly a placeholder such as `none`.
    pub fs_type: String,
    /// Mount options in their on-disk order.
    pub options: Vec<String>,
    /// Dump frequency, passed through untouched.
    pub dump_frequency: u32,
    /// Filesystem check pass number, passed through untouched.
    pub pass_number: u32,
}

/// Kind of object an entry mounts over or creates, from `x-snapd.kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory; spelled as the absence of `x-snapd.kind`.
    Directory,
    /// A regular file.
    File,
    /// A symbolic link.
    Symlink,
    /// A directory that is created on demand beneath `x-snapd.must-exist-dir`.
    EnsureDir,
    /// Any other value, preserved for diagnostics.
    Other(String),
}

impl MountEntry {
    /// Parses one mount table line.
    ///
    /// Between three and six fields are accepted. A missing options field
    /// yields no options and missing numeric fields default to zero.
    pub fn parse(line: &str) -> Result<Self, EntryParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if !(3..=6).contains(&fields.len()) {
            return Err(EntryParseError::FieldCount {
                found: fields.len(),
            });
        }
        let mut fields = fields.into_iter();
        let source = fields.next().map(unescape).unwrap_or_default();
        let target = fields.next().map(unescape).unwrap_or_default();
        let fs_type = fields.next().map(unescape).unwrap_or_default();
        let options = fields
            .next()
            .map(|raw| unescape(raw).split(',').map(str::to_owned).collect())
            .unwrap_or_default();
        let dump_frequency = fields
            .next()
            .map(str::parse::<u32>)
            .transpose()
            .map_err(|source| EntryParseError::DumpFrequency { source })?
            .unwrap_or_default();
        let pass_number = fields
            .next()
            .map(str::parse::<u32>)
            .transpose()
            .map_err(|source| EntryParseError::PassNumber { source })?
            .unwrap_or_default();
        Ok(Self {
            source,
            target,
            fs_type,
            options,
            dump_frequency,
            pass_number,
        })
    }

    /// Returns the value of the first `name=value` option.
    #[must_use]
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.options.iter().find_map(|option| match options::split(option) {
            Some((key, value)) if key == name => Some(value),
            _ => None,
        })
    }

    /// Reports whether the bare flag `name` is present.
    #[must_use]
    pub fn opt_bool(&self, name: &str) -> bool {
        self.options.iter().any(|option| option == name)
    }

    /// Replaces the first option sharing the key of `option`, appending it
    /// when no such option exists.
    ///
    /// Only `key=value` options with a non-empty key and value are applied;
    /// anything else leaves the entry untouched and returns `false`.
    pub fn replace_option(&mut self, option: &str) -> bool {
        let Some((key, value)) = options::split(option) else {
            return false;
        };
        if key.is_empty() || value.is_empty() {
            return false;
        }
        let slot = self
            .options
            .iter_mut()
            .find(|existing| options::split(existing).is_some_and(|(name, _)| name == key));
        match slot {
            Some(existing) => option.clone_into(existing),
            None => self.options.push(option.to_owned()),
        }
        true
    }

    /// Kind of object this entry deals with.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self.opt_str(options::KIND) {
            None | Some("") => EntryKind::Directory,
            Some(options::KIND_FILE) => EntryKind::File,
            Some(options::KIND_SYMLINK) => EntryKind::Symlink,
            Some(options::KIND_ENSURE_DIR) => EntryKind::EnsureDir,
            Some(other) => EntryKind::Other(other.to_owned()),
        }
    }

    /// Directory that must pre-exist for `ensure-dir` entries.
    #[must_use]
    pub fn must_exist_dir(&self) -> Option<&str> {
        self.opt_str(options::MUST_EXIST_DIR)
    }

    /// Origin of the entry, such as `layout` or `overname`.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.opt_str(options::ORIGIN)
    }

    /// Identity of the entry; defaults to the mount point.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        self.opt_str(options::ID).unwrap_or(&self.target)
    }

    /// Identity of the entry this synthetic entry supports.
    #[must_use]
    pub fn needed_by(&self) -> Option<&str> {
        self.opt_str(options::NEEDED_BY)
    }

    /// Target of a symlink entry.
    #[must_use]
    pub fn symlink(&self) -> Option<&str> {
        self.opt_str(options::SYMLINK)
    }

    /// Whether the entry was synthesised for another entry.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.opt_bool(options::SYNTHETIC)
    }

    /// Whether removal should detach rather than unmount.
    #[must_use]
    pub fn detach(&self) -> bool {
        self.opt_bool(options::DETACH)
    }

    /// Whether a missing source or target should skip the entry.
    #[must_use]
    pub fn ignore_missing(&self) -> bool {
        self.opt_bool(options::IGNORE_MISSING)
    }

    /// Whether the entry is a bind mount (plain or recursive).
    #[must_use]
    pub fn is_bind(&self) -> bool {
        self.opt_bool("bind") || self.opt_bool("rbind")
    }

    /// File mode for created objects; `0755` unless overridden.
    pub fn mode(&self) -> Result<u32, OptionError> {
        match self.opt_str(options::MODE) {
            None => Ok(DEFAULT_MODE),
            Some(value) => u32::from_str_radix(value, 8).map_err(|_| OptionError::Mode {
                value: value.to_owned(),
            }),
        }
    }

    /// Owner of created objects; root unless overridden.
    pub fn uid(&self) -> Result<u32, OptionError> {
        match self.opt_str(options::USER) {
            None => Ok(0),
            Some(value) => value.parse().map_err(|_| OptionError::User {
                value: value.to_owned(),
            }),
        }
    }

    /// Group of created objects; root unless overridden.
    pub fn gid(&self) -> Result<u32, OptionError> {
        match self.opt_str(options::GROUP) {
            None => Ok(0),
            Some(value) => value.parse().map_err(|_| OptionError::Group {
                value: value.to_owned(),
            }),
        }
    }
}

impl FromStr for MountEntry {
    type Err = EntryParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Self::parse(line)
    }
}

impl fmt::Display for MountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = if self.options.is_empty() {
            "defaults".to_owned()
        } else {
            self.options.join(",")
        };
        write!(
            f,
            "{} {} {} {} {} {}",
            escape(or_none(&self.source)),
            escape(or_none(&self.target)),
            escape(or_none(&self.fs_type)),
            escape(&options),
            self.dump_frequency,
            self.pass_number
        )
    }
}

fn or_none(field: &str) -> &str {
    if field.is_empty() { "none" } else { field }
}
