//! Server configuration read from `GOMPET_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_LOCALES: &[&str] = &["pl", "en"];
pub const DEFAULT_LOCALE: &str = "pl";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_USERS_FILE: &str = "users.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_port: u16,
    pub locales: Vec<String>,
    pub default_locale: String,
    pub session_ttl: Duration,
    pub users_file: PathBuf,
    /// Adds `Secure` to the session cookie.
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            locales: DEFAULT_LOCALES.iter().map(|s| s.to_string()).collect(),
            default_locale: DEFAULT_LOCALE.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            users_file: PathBuf::from(DEFAULT_USERS_FILE),
            cookie_secure: false,
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::config("invalid_bool".to_string(), format!("{key}: expected a boolean, got '{other}'"))),
    }
}

fn parse_locales(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_ascii_lowercase()).filter(|s| !s.is_empty()).collect()
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> AppResult<Self> {
        let mut cfg = AppConfig::default();
        if let Some(v) = lookup("GOMPET_HTTP_PORT") {
            cfg.http_port = v.trim().parse().map_err(|_| {
                AppError::config("invalid_port".to_string(), format!("GOMPET_HTTP_PORT: '{v}' is not a port"))
            })?;
        }
        if let Some(v) = lookup("GOMPET_LOCALES") {
            cfg.locales = parse_locales(&v);
        }
        if let Some(v) = lookup("GOMPET_DEFAULT_LOCALE") {
            cfg.default_locale = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = lookup("GOMPET_SESSION_TTL_SECS") {
            let secs: u64 = v.trim().parse().map_err(|_| {
                AppError::config("invalid_ttl".to_string(), format!("GOMPET_SESSION_TTL_SECS: '{v}' is not a number"))
            })?;
            cfg.session_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("GOMPET_USERS_FILE") {
            cfg.users_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("GOMPET_COOKIE_SECURE") {
            cfg.cookie_secure = parse_bool("GOMPET_COOKIE_SECURE", &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.locales.is_empty() {
            return Err(AppError::config("no_locales", "at least one locale must be configured"));
        }
        if !self.locales.iter().any(|l| l == &self.default_locale) {
            return Err(AppError::config(
                "unknown_default_locale".to_string(),
                format!("default locale '{}' is not among {:?}", self.default_locale, self.locales),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(AppError::config("invalid_ttl", "session TTL must be positive"));
        }
        Ok(())
    }
}
