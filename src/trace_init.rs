//! Tracing initialization for binaries and tests
//!
//! Uses RUST_LOG for filtering, e.g. `RUST_LOG=polarust::decode=trace`.

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initialize tracing for library/binary use.
///
/// Call this once, early, before decoding. Safe to skip entirely -- without
/// a subscriber installed, `tracing` events are simply discarded.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polarust=info"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Initialize tracing for tests. Multiple calls are safe (uses once_cell).
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polarust=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

#[cfg(test)]
mod tests {
    use super::init_test_tracing;

    #[test]
    fn repeated_init_does_not_panic() {
        init_test_tracing();
        init_test_tracing();
    }
}
