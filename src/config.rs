/*
 * Responsibility
 * - 環境変数の読み込み (PORT, CORS 許可, Identity Platform の API key / project id など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use url::Url;

pub const DEFAULT_SECURETOKEN_BASE_URL: &str = "https://securetoken.googleapis.com";
pub const DEFAULT_IDENTITYTOOLKIT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("APP_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Identity Platform settings shared by the verifier, the refresher and sign-in.
///
/// The API key is not printable via Debug.
#[derive(Clone)]
pub struct IdentityConfig {
    pub api_key: String,
    pub project_id: String,
    pub check_revoked: bool,
    pub leeway_seconds: u64,
    pub securetoken_base_url: Url,
    pub identitytoolkit_base_url: Url,
    pub jwks_url: Url,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("project_id", &self.project_id)
            .field("check_revoked", &self.check_revoked)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("securetoken_base_url", &self.securetoken_base_url.as_str())
            .field(
                "identitytoolkit_base_url",
                &self.identitytoolkit_base_url.as_str(),
            )
            .field("jwks_url", &self.jwks_url.as_str())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub identity: IdentityConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let api_key = lookup("IDENTITY_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("IDENTITY_API_KEY"))?;

        let project_id = lookup("FIREBASE_PROJECT_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("FIREBASE_PROJECT_ID"))?;

        let check_revoked = match lookup("IDENTITY_CHECK_REVOKED") {
            None => true,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("IDENTITY_CHECK_REVOKED"))?,
        };

        let leeway_seconds = match lookup("ID_TOKEN_LEEWAY_SECONDS") {
            None => 0,
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("ID_TOKEN_LEEWAY_SECONDS"))?,
        };

        let securetoken_base_url = parse_url(
            lookup("SECURETOKEN_BASE_URL").as_deref(),
            DEFAULT_SECURETOKEN_BASE_URL,
            "SECURETOKEN_BASE_URL",
        )?;
        let identitytoolkit_base_url = parse_url(
            lookup("IDENTITYTOOLKIT_BASE_URL").as_deref(),
            DEFAULT_IDENTITYTOOLKIT_BASE_URL,
            "IDENTITYTOOLKIT_BASE_URL",
        )?;
        let jwks_url = parse_url(
            lookup("IDENTITY_JWKS_URL").as_deref(),
            DEFAULT_JWKS_URL,
            "IDENTITY_JWKS_URL",
        )?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            identity: IdentityConfig {
                api_key,
                project_id,
                check_revoked,
                leeway_seconds,
                securetoken_base_url,
                identitytoolkit_base_url,
                jwks_url,
            },
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_url(value: Option<&str>, default: &str, key: &'static str) -> Result<Url, ConfigError> {
    Url::parse(value.unwrap_or(default)).map_err(|_| ConfigError::Invalid(key))
}
