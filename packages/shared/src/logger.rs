//! Logging setup utilities for the relay.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crate and the binary get the default level. The filter can be
/// overridden entirely with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `crate_name` - The package name of the library (e.g., "archei-relay")
/// * `binary_name` - The name of the binary (e.g., "archei-relay")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use archei_shared::logger::setup_logger;
///
/// setup_logger("archei-relay", "archei-relay", "info");
/// ```
pub fn setup_logger(crate_name: &str, binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_filter(crate_name, binary_name, default_log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the `EnvFilter` directive used when `RUST_LOG` is not set.
///
/// Cargo package names use `-` but tracing targets use `_`, so both names are normalized.
fn default_filter(crate_name: &str, binary_name: &str, default_log_level: &str) -> String {
    let crate_target = crate_name.replace('-', "_");
    let binary_target = binary_name.replace('-', "_");
    if crate_target == binary_target {
        format!("{}={},tower_http={}", crate_target, default_log_level, default_log_level)
    } else {
        format!(
            "{}={},{}={},tower_http={}",
            crate_target, default_log_level, binary_target, default_log_level, default_log_level
        )
    }
}
