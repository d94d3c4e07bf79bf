//! Tracing Setup
//!
//! Installs the global `tracing-subscriber` for the binary. `RUST_LOG` wins
//! over the configured level.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber; errors if one is already installed
pub fn init(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let config = LogConfig::default();
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
