//! Tracing initialization for binaries and tests.

/// Install the global `fmt` subscriber, filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops so test binaries can
/// call it from every test.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
