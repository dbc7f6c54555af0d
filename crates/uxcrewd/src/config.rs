//! Daemon settings read from `UXCREWD_*` variables.

use std::net::SocketAddr;

use uxcrew_core::ConfigError;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub bind: SocketAddr,
    /// Upper bound on a multipart request body.
    pub max_upload_bytes: usize,
    /// Origins allowed by CORS. `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Emit JSON log lines.
    pub log_json: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: vec!["*".to_string()],
            log_json: false,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("UXCREWD_BIND") {
            config.bind = raw.parse().map_err(|_| invalid("UXCREWD_BIND", &raw))?;
        }
        if let Some(raw) = get("UXCREWD_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid("UXCREWD_MAX_UPLOAD_BYTES", &raw)),
            };
        }
        if let Some(raw) = get("UXCREWD_CORS_ORIGINS") {
            config.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = get("UXCREWD_LOG_JSON") {
            config.log_json = match raw.as_str() {
                "1" | "true" | "TRUE" | "yes" | "YES" => true,
                "0" | "false" | "FALSE" | "no" | "NO" => false,
                _ => return Err(invalid("UXCREWD_LOG_JSON", &raw)),
            };
        }
        Ok(config)
    }

    /// Value for `access-control-allow-origin`, if `origin` may call us.
    pub fn allowed_origin<'a>(&'a self, origin: &'a str) -> Option<&'a str> {
        if self.cors_origins.iter().any(|o| o == "*") {
            Some("*")
        } else if self.cors_origins.iter().any(|o| o == origin) {
            Some(origin)
        } else {
            None
        }
    }
}
