//! Tracing subscriber setup for binaries and tests embedding the library

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "wikigraph=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_directive`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(DEFAULT_DIRECTIVE);
        assert!(!init_tracing("wikigraph_core=debug"));
    }
}
