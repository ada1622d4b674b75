//! Tracing setup for the embedding application

use crate::config::LoggingConfig;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `filter`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .try_init()
        .is_ok()
}

pub fn init_from_config(logging: &LoggingConfig) -> bool {
    init_tracing(&logging.filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_from_config(&LoggingConfig::default());
        assert!(!init_tracing("stakehouse=trace"));
    }
}
