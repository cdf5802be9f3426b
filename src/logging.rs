use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose info-level chatter drowns out the service's own events
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "tower_http=warn", "hyper=warn"];

/// Rotation named in config; anything unrecognised means a single file
pub fn rotation(name: &str) -> Rotation {
    match name {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// Filter used when RUST_LOG is unset
pub fn default_directives(level: &str) -> String {
    std::iter::once(level)
        .chain(QUIET_DEPENDENCIES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Keep the guard alive for the process
/// lifetime or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender =
        RollingFileAppender::new(rotation(&config.rotation), &config.log_dir, &config.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true) // Keep target in JSON for structured queries
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation("hourly"), Rotation::HOURLY);
        assert_eq!(rotation("daily"), Rotation::DAILY);
        assert_eq!(rotation("never"), Rotation::NEVER);
        assert_eq!(rotation("weekly"), Rotation::NEVER);
    }

    #[test]
    fn test_default_directives_parse() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("sqlx=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
