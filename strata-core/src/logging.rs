//! Logging setup.
//!
//! Strata only emits `tracing` events; installing a subscriber is left to the
//! application. With the `tracing-subscriber` feature, [`init`] installs one
//! driven by the environment:
//!
//! - `STRATA_DEBUG=true|1|yes` - log at debug level
//! - `STRATA_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `STRATA_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! strata_core::logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Enables debug logging.
pub const DEBUG_VAR: &str = "STRATA_DEBUG";
/// Selects the log level.
pub const LEVEL_VAR: &str = "STRATA_LOG_LEVEL";
/// Selects the output format.
pub const FORMAT_VAR: &str = "STRATA_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line, human oriented.
    Pretty,
    /// Single-line, human oriented.
    Compact,
}

/// Logging configuration resolved from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether the application asked for logging at all.
    pub enabled: bool,
    /// Level filter for strata's own targets.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(
            env::var(DEBUG_VAR).ok().as_deref(),
            env::var(LEVEL_VAR).ok().as_deref(),
            env::var(FORMAT_VAR).ok().as_deref(),
        )
    }

    /// Resolve settings from raw variable values.
    pub fn resolve(debug: Option<&str>, level: Option<&str>, format: Option<&str>) -> Self {
        let debug = debug.is_some_and(is_truthy);
        let fallback = if debug { "debug" } else { "warn" };

        let level_name = level.map(str::to_lowercase);
        let level = match level_name.as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => fallback,
        };

        let format = match format.map(str::to_lowercase).as_deref() {
            Some("pretty") => LogFormat::Pretty,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Json,
        };

        Self {
            enabled: debug || level_name.is_some(),
            level,
            format,
        }
    }

    /// `EnvFilter` directive covering every strata crate.
    pub fn directive(&self) -> String {
        ["strata", "strata_core", "strata_mysql"]
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Whether `STRATA_DEBUG` is set to "true", "1" or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Install a global subscriber once, if the environment asks for logging.
///
/// Later calls are no-ops. Without the `tracing-subscriber` feature nothing is
/// installed and events go to whatever subscriber the application set up.
pub fn init() {
    let settings = LogSettings::from_env();
    if settings.enabled {
        install(settings);
    }
}

/// Install a global subscriber at `level`, whatever the environment says.
///
/// The output format still follows `STRATA_LOG_FORMAT`.
pub fn init_with_level(level: &str) {
    let format = LogSettings::from_env().format;
    let settings = LogSettings {
        format,
        ..LogSettings::resolve(None, Some(level), None)
    };
    install(settings);
}

fn install(settings: LogSettings) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(settings.directive())
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = settings.level,
                    format = ?settings.format,
                    "Strata logging initialized"
                );
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = settings;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_by_default() {
        let settings = LogSettings::resolve(None, None, None);
        assert!(!settings.enabled);
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_debug_flag() {
        for value in ["true", "1", "YES"] {
            let settings = LogSettings::resolve(Some(value), None, None);
            assert!(settings.enabled);
            assert_eq!(settings.level, "debug");
        }
        assert!(!LogSettings::resolve(Some("no"), None, None).enabled);
    }

    #[test]
    fn test_explicit_level_wins() {
        let settings = LogSettings::resolve(Some("true"), Some("ERROR"), Some("compact"));
        assert_eq!(settings.level, "error");
        assert_eq!(settings.format, LogFormat::Compact);

        let unknown = LogSettings::resolve(None, Some("loud"), None);
        assert!(unknown.enabled);
        assert_eq!(unknown.level, "warn");
    }

    #[test]
    fn test_directive() {
        let settings = LogSettings::resolve(None, Some("info"), None);
        assert_eq!(
            settings.directive(),
            "strata=info,strata_core=info,strata_mysql=info"
        );
    }
}
