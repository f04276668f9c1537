// tests/common.rs
//! Shared test logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route tracing output through the test harness; respects RUST_LOG=
///
/// Idempotent, call it at the start of any test that wants logs.
#[allow(dead_code)]
pub fn setup() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}
