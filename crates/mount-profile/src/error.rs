//! Errors raised while parsing, loading, or saving mount profiles.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing a single mount entry line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryParseError {
    /// The line did not contain between three and six fields.
    #[error("expected between 3 and 6 fields, found {found}")]
    FieldCount {
        /// Number of whitespace-separated fields present on the line.
        found: usize,
    },
    /// The fifth field was not a decimal integer.
    #[error("cannot parse dump frequency: {source}")]
    DumpFrequency {
        /// Underlying integer parse failure.
        #[source]
        source: ParseIntError,
    },
    /// The sixth field was not a decimal integer.
    #[error("cannot parse check pass number: {source}")]
    PassNumber {
        /// Underlying integer parse failure.
        #[source]
        source: ParseIntError,
    },
}

/// A malformed line encountered while parsing a whole profile.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {source}")]
pub struct ProfileParseError {
    /// One-based line number of the offending entry.
    pub line: usize,
    /// Reason the line was rejected.
    #[source]
    pub source: EntryParseError,
}

/// Errors raised while loading or saving a profile on disk.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Reading the profile failed for a reason other than absence.
    #[error("cannot read mount profile {}: {source}", path.display())]
    Read {
        /// Profile path that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The profile contained a line that is not a valid mount entry.
    #[error("cannot parse mount profile {}: {source}", path.display())]
    Malformed {
        /// Profile path holding the malformed entry.
        path: PathBuf,
        /// Position and reason of the failure.
        #[source]
        source: ProfileParseError,
    },
    /// Writing the profile failed.
    #[error("cannot write mount profile {}: {source}", path.display())]
    Write {
        /// Destination path of the profile.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while interpreting an `x-snapd.*` option value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    /// `x-snapd.mode` did not hold an octal number.
    #[error("cannot parse octal file mode from {value:?}")]
    Mode {
        /// Raw option value.
        value: String,
    },
    /// `x-snapd.uid` did not hold a numeric user ID.
    #[error("cannot parse user name {value:?}")]
    User {
        /// Raw option value.
        value: String,
    },
    /// `x-snapd.gid` did not hold a numeric group ID.
    #[error("cannot parse group name {value:?}")]
    Group {
        /// Raw option value.
        value: String,
    },
}
