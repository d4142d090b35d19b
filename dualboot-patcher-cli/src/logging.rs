//! Diagnostics for the patcher.
//!
//! Progress meant for the user is printed to stdout by the library. Everything else goes through
//! `tracing` and is filtered with `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Reads `RUST_LOG`, defaulting to `warn`. Output: stderr, compact format.
///
/// ```bash
/// RUST_LOG=dualboot_patcher=debug patchfile cm-10.2-20131010-NIGHTLY-jfltexx.zip
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
