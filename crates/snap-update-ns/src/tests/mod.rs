//! Test suites for the namespace update helper.

mod support;
mod unit;
