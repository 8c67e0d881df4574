//! Ordered sequences of mount entries and their on-disk form.

use std::fmt;
use std::fs::{self, File, Permissions};
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::slice;
use std::vec;

use tempfile::NamedTempFile;

use crate::entry::MountEntry;
use crate::error::{ProfileError, ProfileParseError};

const PROFILE_MODE: u32 = 0o644;

/// An ordered list of mount entries.
///
/// Order is significant: later entries may rely on directories created by
/// earlier ones. The profile owns its entries outright and hands out only
/// borrows or moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountProfile {
    entries: Vec<MountEntry>,
}

impl MountProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in profile order.
    #[must_use]
    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// Mutable access to the entries, for in-place rewriting.
    pub fn entries_mut(&mut self) -> &mut [MountEntry] {
        &mut self.entries
    }

    /// Appends an entry to the end of the profile.
    pub fn push(&mut self, entry: MountEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the profile holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    /// Parses a profile held in memory.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, ProfileParseError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !is_ignorable(line))
            .map(|(index, line)| {
                MountEntry::parse(line).map_err(|source| ProfileParseError {
                    line: index + 1,
                    source,
                })
            })
            .collect()
    }

    /// Reads a profile from `path`.
    ///
    /// A missing file yields an empty profile. Any other failure, including
    /// a malformed line, is an error.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(ProfileError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| ProfileError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if is_ignorable(&line) {
                continue;
            }
            let entry = MountEntry::parse(&line).map_err(|source| ProfileError::Malformed {
                path: path.to_path_buf(),
                source: ProfileParseError {
                    line: index + 1,
                    source,
                },
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Writes every entry, one per line, to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{entry}")?;
        }
        writer.flush()
    }

    /// Replaces the file at `path` with this profile.
    ///
    /// The profile is written to a temporary file next to the destination
    /// and renamed over it, so readers see either the old or the new
    /// contents.
    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        let write_error = |source| ProfileError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        self.write_to(staged.as_file_mut()).map_err(write_error)?;
        fs::set_permissions(staged.path(), Permissions::from_mode(PROFILE_MODE))
            .map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged
            .persist(path)
            .map_err(|error| write_error(error.error))?;
        Ok(())
    }
}

fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

impl fmt::Display for MountProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entries
            .iter()
            .try_for_each(|entry| writeln!(f, "{entry}"))
    }
}

impl FromIterator<MountEntry> for MountProfile {
    fn from_iter<I: IntoIterator<Item = MountEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MountProfile {
    type Item = MountEntry;
    type IntoIter = vec::IntoIter<MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a MountProfile {
    type Item = &'a MountEntry;
    type IntoIter = slice::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
