// Path: crates/account/src/telemetry.rs

//! Tracing initialization for binaries and integration tests.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Initializes the global `tracing` subscriber.
///
/// The filter comes from the environment (`RUST_LOG`), defaulting to
/// `info`. Safe to call once per process; later calls fail quietly.
pub fn init_tracing() {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}
