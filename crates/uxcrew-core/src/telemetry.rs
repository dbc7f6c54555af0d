//! Log output for the `uxcrew` CLI and the `uxcrewd` daemon.
//!
//! Both binaries print results or serve HTTP on stdout/sockets, so log lines
//! always go to stderr. `RUST_LOG` wins when set; otherwise the workspace
//! crates log at the chosen level and the HTTP stack is held at `warn`.

use std::env;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::ConfigError;

/// Dependencies that are noisy at `info` and below.
const QUIET_TARGETS: [&str; 5] = ["hyper", "hyper_util", "h2", "reqwest", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub json: bool,
    pub level: Level,
}

impl LogSettings {
    pub fn new(json: bool, level: Level) -> Self {
        Self { json, level }
    }

    /// Start from the binary's flags and let `UXCREW_LOG_FORMAT`
    /// (`text` | `json`) and `UXCREW_LOG_LEVEL` override them.
    pub fn from_env(json: bool, level: Level) -> Result<Self, ConfigError> {
        Self::from_lookup(json, level, &|key: &str| env::var(key).ok())
    }

    pub fn from_lookup<F>(json: bool, level: Level, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::new(json, level);

        if let Some(raw) = get("UXCREW_LOG_FORMAT") {
            settings.json = match raw.to_ascii_lowercase().as_str() {
                "json" => true,
                "text" => false,
                _ => return Err(invalid("UXCREW_LOG_FORMAT", &raw)),
            };
        }
        if let Some(raw) = get("UXCREW_LOG_LEVEL") {
            settings.level = Level::from_str(&raw).map_err(|_| invalid("UXCREW_LOG_LEVEL", &raw))?;
        }
        Ok(settings)
    }

    /// Filter directives used when `RUST_LOG` is unset.
    pub fn directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        std::iter::once(level)
            .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Install the global subscriber. Only the first call in a process takes
/// effect.
pub fn init_tracing(settings: LogSettings) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.directives()));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if settings.json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn flags_apply_without_overrides() {
        let settings = LogSettings::from_lookup(true, Level::DEBUG, &lookup(&[])).unwrap();
        assert_eq!(settings, LogSettings::new(true, Level::DEBUG));
    }

    #[test]
    fn environment_overrides_flags() {
        let vars = lookup(&[("UXCREW_LOG_FORMAT", "Text"), ("UXCREW_LOG_LEVEL", "warn")]);
        let settings = LogSettings::from_lookup(true, Level::INFO, &vars).unwrap();
        assert_eq!(settings, LogSettings::new(false, Level::WARN));
    }

    #[test]
    fn bad_values_are_rejected() {
        let format = LogSettings::from_lookup(false, Level::INFO, &lookup(&[("UXCREW_LOG_FORMAT", "xml")]));
        assert!(matches!(format, Err(ConfigError::Invalid { key, .. }) if key == "UXCREW_LOG_FORMAT"));
        let level = LogSettings::from_lookup(false, Level::INFO, &lookup(&[("UXCREW_LOG_LEVEL", "loud")]));
        assert!(matches!(level, Err(ConfigError::Invalid { key, .. }) if key == "UXCREW_LOG_LEVEL"));
    }

    #[test]
    fn directives_quiet_the_http_stack() {
        assert_eq!(
            LogSettings::new(false, Level::DEBUG).directives(),
            "debug,hyper=warn,hyper_util=warn,h2=warn,reqwest=warn,rustls=warn"
        );
    }

    #[test]
    fn second_init_is_ignored() {
        init_tracing(LogSettings::new(false, Level::WARN));
        init_tracing(LogSettings::new(true, Level::DEBUG));
    }
}
