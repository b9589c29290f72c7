use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PostboardConfig {
    pub api_port: u16,
    pub paths: PostboardPaths,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
}

impl PostboardConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("POSTBOARD_HOME") {
            Ok(raw) if !raw.trim().is_empty() => PostboardPaths::from_base_dir(raw.trim())?,
            _ => PostboardPaths::discover()?,
        };
        let api_port = env_parse("POSTBOARD_API_PORT").unwrap_or(5000);
        Ok(Self {
            api_port,
            paths,
            auth: AuthConfig::from_env()?,
            mail: MailConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
        })
    }

    pub fn new(api_port: u16, paths: PostboardPaths, auth: AuthConfig) -> Self {
        Self {
            api_port,
            paths,
            auth,
            mail: MailConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    pub reset_url_base: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("POSTBOARD_JWT_SECRET")
            .map_err(|_| anyhow!("POSTBOARD_JWT_SECRET must be set"))?;
        if jwt_secret.len() < 32 {
            bail!("POSTBOARD_JWT_SECRET must be at least 32 bytes");
        }
        let reset_url_base = env::var("POSTBOARD_RESET_URL_BASE")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| "http://localhost:3000/reset-password".to_string());
        Ok(Self {
            jwt_secret,
            token_ttl_secs: env_parse("POSTBOARD_TOKEN_TTL_SECS").unwrap_or(3600),
            reset_token_ttl_secs: env_parse("POSTBOARD_RESET_TOKEN_TTL_SECS").unwrap_or(3600),
            reset_url_base,
        })
    }

    /// Defaults around an explicit secret; used by tests and embedders.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: 3600,
            reset_token_ttl_secs: 3600,
            reset_url_base: "http://localhost:3000/reset-password".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "no-reply@postboard.local".to_string(),
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        match env::var("POSTBOARD_MAIL_FROM") {
            Ok(from) if !from.trim().is_empty() => Self { from },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    /// Requests per window for register and password-reset routes.
    pub max_requests: u32,
    /// Stricter budget for login attempts.
    pub login_max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_requests: 10,
            login_max_requests: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window_secs: env_parse("POSTBOARD_RATE_LIMIT_WINDOW_SECS")
                .unwrap_or(defaults.window_secs),
            max_requests: env_parse("POSTBOARD_RATE_LIMIT_MAX").unwrap_or(defaults.max_requests),
            login_max_requests: env_parse("POSTBOARD_LOGIN_RATE_LIMIT_MAX")
                .unwrap_or(defaults.login_max_requests),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PostboardPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl PostboardPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("postboard.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_base_dir() {
        let paths = PostboardPaths::from_base_dir("/srv/postboard").unwrap();
        assert_eq!(paths.db_path, PathBuf::from("/srv/postboard/data/postboard.db"));
        assert_eq!(paths.logs_dir, PathBuf::from("/srv/postboard/logs"));
    }

    #[test]
    fn rate_limit_defaults_match_fifteen_minute_window() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.window_secs, 900);
        assert!(limits.login_max_requests < limits.max_requests);
    }
}
