//! Logging bootstrap.
//!
//! Built on the `tracing` ecosystem. Library code emits events through the
//! `tracing` macros; embedding applications call one of the `init` functions
//! here (or install their own subscriber) before starting schedulers.
//!
//! `RUST_LOG` takes precedence over the configured level when set, so a
//! deployed binary can be re-leveled without a rebuild.

use tracing::Level;
use tracing_subscriber::EnvFilter;

// Re-export the macros so callers can `use magpie::logging::{info, warn};`.
pub use tracing::{debug, error, info, trace, warn};

/// Console logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to emit when `RUST_LOG` is not set.
    pub level: Level,
    /// Include the event's module target.
    pub with_target: bool,
    /// Include file and line of the call site.
    pub with_file_line: bool,
    /// Colorize output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: true,
            with_file_line: false,
            ansi: true,
        }
    }
}

/// Installs a console subscriber for the given configuration.
///
/// A no-op when a global subscriber is already installed, so tests and
/// embedding applications can call it unconditionally.
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_file(config.with_file_line)
        .with_line_number(config.with_file_line)
        .with_ansi(config.ansi)
        .try_init();
}

/// Default settings: INFO, console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// Development settings: DEBUG with file/line call sites.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        with_file_line: true,
        ..Default::default()
    });
}
