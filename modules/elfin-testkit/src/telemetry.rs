//! Tracing setup for test binaries.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "elfin=debug";

/// Install a fmt subscriber routed through the test writer.
///
/// `RUST_LOG` wins over the default directive. Safe to call from every test;
/// only the first call installs anything. Returns whether this call did.
pub fn init() -> bool {
    init_with(DEFAULT_DIRECTIVE)
}

pub fn init_with(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        assert!(!init());
    }
}
