//! Logging setup

use log::LevelFilter;

/// Environment variable that switches the default log level to `Debug`
pub const DEBUG_ENV_VAR: &str = "PSO_CACHE_DEBUG";

/// Initialize `env_logger` for the process
///
/// Safe to call more than once; only the first call installs the logger.
/// A logger installed by the host application takes precedence.
pub fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let log_level = if std::env::var(DEBUG_ENV_VAR).is_ok() {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        if env_logger::Builder::new()
            .filter_level(log_level)
            .try_init()
            .is_err()
        {
            log::debug!("Logger already installed, keeping the existing one");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_logging();
        init_logging();
        log::info!("logging initialized");
    }
}
