//! Test suites for the daemon bootstrap and process supervision.

mod support;
