// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and handed to
//! the components that need it as an explicit [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `DATA_DIR` | Directory holding the redb database | `./data` |
//! | `JWT_ACCESS_SECRET` | HMAC secret for access tokens | Required |
//! | `JWT_REFRESH_SECRET` | HMAC secret for refresh tokens | Required |
//! | `ACCESS_TOKEN_EXPIRES_IN` | Access token lifetime (`30s`, `15m`, `1h`, `7d`) | `15m` |
//! | `REFRESH_TOKEN_EXPIRES_IN` | Refresh token lifetime | `7d` |
//! | `NODE_ENV` | `production` turns on secure cookies by default | unset |
//! | `COOKIE_SECURE` | Force the `Secure` cookie attribute (`true`/`false`) | see `NODE_ENV` |
//! | `CORS_ALLOWED_ORIGINS` | Comma separated list of allowed origins | empty (permissive) |
//! | `ADMIN_EMAILS` | Comma separated emails registered with the admin role | empty |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::auth::normalize_email;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Directory for the embedded database file.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_ACCESS_SECRET_ENV: &str = "JWT_ACCESS_SECRET";
pub const JWT_REFRESH_SECRET_ENV: &str = "JWT_REFRESH_SECRET";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_EXPIRES_IN";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_EXPIRES_IN";
pub const NODE_ENV_ENV: &str = "NODE_ENV";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const ADMIN_EMAILS_ENV: &str = "ADMIN_EMAILS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATA_DIR: &str = "./data";

/// Access tokens live for 15 minutes unless configured otherwise.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
/// Refresh tokens (and the refresh cookie) live for 7 days.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "sincut.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Secrets and lifetimes for the token issuer.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Build a token configuration with the default lifetimes.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }
}

// Secrets never reach the logs.
impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// PEM certificate chain and private key for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub tokens: TokenConfig,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
    pub admin_emails: Vec<String>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Configuration with defaults for everything but the token secrets.
    pub fn new(data_dir: impl Into<PathBuf>, tokens: TokenConfig) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: data_dir.into(),
            tokens,
            cookie_secure: false,
            cors_origins: Vec::new(),
            admin_emails: Vec::new(),
            tls: None,
            log_format: LogFormat::default(),
        }
    }

    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let access_secret = var(JWT_ACCESS_SECRET_ENV).ok_or(ConfigError::Missing(JWT_ACCESS_SECRET_ENV))?;
        let refresh_secret =
            var(JWT_REFRESH_SECRET_ENV).ok_or(ConfigError::Missing(JWT_REFRESH_SECRET_ENV))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::Invalid {
                name: JWT_REFRESH_SECRET_ENV,
                reason: "must differ from JWT_ACCESS_SECRET".to_string(),
            });
        }

        let mut tokens = TokenConfig::new(access_secret, refresh_secret);
        if let Some(raw) = var(ACCESS_TOKEN_TTL_ENV) {
            tokens.access_ttl = parse_duration(&raw).map_err(|reason| ConfigError::Invalid {
                name: ACCESS_TOKEN_TTL_ENV,
                reason,
            })?;
        }
        if let Some(raw) = var(REFRESH_TOKEN_TTL_ENV) {
            tokens.refresh_ttl = parse_duration(&raw).map_err(|reason| ConfigError::Invalid {
                name: REFRESH_TOKEN_TTL_ENV,
                reason,
            })?;
        }

        let port = match var(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let production = var(NODE_ENV_ENV).is_some_and(|v| v == "production");
        let cookie_secure = match var(COOKIE_SECURE_ENV) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                name: COOKIE_SECURE_ENV,
                reason: format!("expected true/false, got {raw:?}"),
            })?,
            None => production,
        };

        let cors_origins = split_list(var(CORS_ALLOWED_ORIGINS_ENV))
            .into_iter()
            .map(|origin| validate_origin(&origin))
            .collect::<Result<Vec<_>, _>>()?;

        let admin_emails = split_list(var(ADMIN_EMAILS_ENV))
            .iter()
            .map(|email| normalize_email(email))
            .collect();

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                })
            }
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected json or pretty, got {other:?}"),
                })
            }
        };

        Ok(Self {
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: var(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            tokens,
            cookie_secure,
            cors_origins,
            admin_emails,
            tls,
            log_format,
        })
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: HOST_ENV,
                reason: format!("{e}"),
            })
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Whether an (already normalised) email is configured as an admin.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|admin| admin == email)
    }
}

/// Parse a lifetime such as `30s`, `15m`, `12h`, `7d` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("expected a number followed by s/m/h/d, got {raw:?}"))?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => return Err(format!("unknown duration unit {other:?}")),
    };

    if value == 0 {
        return Err("duration must be positive".to_string());
    }

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration {raw:?} is too large"))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Origins are compared verbatim by browsers, so keep only `scheme://host[:port]`.
fn validate_origin(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name: CORS_ALLOWED_ORIGINS_ENV,
        reason: format!("{raw:?}: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            name: CORS_ALLOWED_ORIGINS_ENV,
            reason: format!("{raw:?} is not an http(s) origin"),
        });
    }
    Ok(url.origin().ascii_serialization())
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
        move |name| map.get(name).cloned()
    }

    fn base_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            (JWT_ACCESS_SECRET_ENV, "access-secret"),
            (JWT_REFRESH_SECRET_ENV, "refresh-secret"),
        ]
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = AppConfig::from_lookup(lookup(&base_vars())).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.tokens.access_ttl, DEFAULT_ACCESS_TTL);
        assert_eq!(config.tokens.refresh_ttl, DEFAULT_REFRESH_TTL);
        assert!(!config.cookie_secure);
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.database_path(), PathBuf::from("./data").join(DATABASE_FILE));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[(JWT_ACCESS_SECRET_ENV, "only-one")]));
        assert!(matches!(result, Err(ConfigError::Missing(JWT_REFRESH_SECRET_ENV))));
    }

    #[test]
    fn identical_secrets_are_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            (JWT_ACCESS_SECRET_ENV, "same"),
            (JWT_REFRESH_SECRET_ENV, "same"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn production_enables_secure_cookies() {
        let mut vars = base_vars();
        vars.push((NODE_ENV_ENV, "production"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert!(config.cookie_secure);

        vars.push((COOKIE_SECURE_ENV, "false"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert!(!config.cookie_secure);
    }

    #[test]
    fn lists_are_split_and_normalised() {
        let mut vars = base_vars();
        vars.push((CORS_ALLOWED_ORIGINS_ENV, "https://sincut.vercel.app, http://localhost:3000/"));
        vars.push((ADMIN_EMAILS_ENV, " Root@Example.com ,ops@example.com"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(
            config.cors_origins,
            vec!["https://sincut.vercel.app", "http://localhost:3000"]
        );
        assert!(config.is_admin_email("root@example.com"));
        assert!(config.is_admin_email("ops@example.com"));
        assert!(!config.is_admin_email("user@example.com"));
    }

    #[test]
    fn invalid_origin_is_rejected() {
        let mut vars = base_vars();
        vars.push((CORS_ALLOWED_ORIGINS_ENV, "not a url"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let mut vars = base_vars();
        vars.push((TLS_CERT_PATH_ENV, "/etc/cert.pem"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn parse_duration_accepts_units() {
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(604_800));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("10w").is_err());
        assert!(parse_duration("m").is_err());
    }
}
