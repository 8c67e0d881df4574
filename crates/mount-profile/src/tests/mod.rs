//! Test suites for mount entries and profiles.
