//! Test suites for the CLI runtime.

mod support;
