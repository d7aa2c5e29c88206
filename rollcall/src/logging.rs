//! Logging initialization

use tracing_subscriber::EnvFilter;

use crate::error::{RollcallError, RollcallResult};

/// Default filter when `RUST_LOG` is not set
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "rollcall=debug,rollcall_media=debug,rollcall_client=debug,info"
    } else {
        "info"
    }
}

/// Install the global `tracing` subscriber; `RUST_LOG` wins over `debug`
pub fn init_logging(debug: bool) -> RollcallResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .try_init()
        .map_err(|e| RollcallError::Configuration {
            message: format!("Failed to initialize logging: {}", e),
        })
}
