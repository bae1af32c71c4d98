//! Runtime configuration loaded via OrthoConfig.
//!
//! Each section reads its own environment prefix (`AUTH_`, `PAGINATION_`,
//! `HASHING_`, `DATABASE_`) and matching config-file keys. Command-line flags belong to the
//! clap front end, so sections are loaded with the program name only.

use std::ffi::OsString;
use std::fmt::{self, Display};
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use pagination::PaginationLimits;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use tracing::warn;
use zeroize::Zeroizing;

use crate::outbound::credentials::Argon2Cost;
use crate::outbound::persistence::PoolConfig;
use crate::outbound::tokens::TokenLifetimes;

const DEFAULT_ISSUER: &str = "research-backend";
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const EPHEMERAL_SECRET_LENGTH: usize = 48;

/// Failures while loading or interpreting settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A section could not be read.
    #[error("failed to load {section} settings: {message}")]
    Load {
        /// Section name.
        section: &'static str,
        /// Loader diagnostic.
        message: String,
    },
    /// A value was present but unusable.
    #[error("invalid {key}: {message}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why it was rejected.
        message: String,
    },
    /// A required value was absent.
    #[error("{key} must be set")]
    Missing {
        /// Missing key.
        key: &'static str,
    },
}

impl SettingsError {
    fn load(section: &'static str, error: impl Display) -> Self {
        Self::Load {
            section,
            message: error.to_string(),
        }
    }

    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

fn program_only() -> [OsString; 1] {
    [OsString::from(env!("CARGO_PKG_NAME"))]
}

fn seconds(key: &'static str, value: Option<i64>, default: TimeDelta) -> Result<TimeDelta, SettingsError> {
    match value {
        None => Ok(default),
        Some(secs) if secs > 0 => TimeDelta::try_seconds(secs)
            .ok_or_else(|| SettingsError::invalid(key, "duration out of range")),
        Some(_) => Err(SettingsError::invalid(key, "must be a positive number of seconds")),
    }
}

/// Token signing and link settings.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AUTH")]
pub struct AuthSettings {
    /// HMAC secret used to sign every token.
    pub secret: Option<String>,
    /// Generate a throwaway secret when none is configured.
    #[ortho_config(default = false)]
    pub allow_ephemeral_secret: bool,
    /// `iss` claim of issued tokens.
    pub issuer: Option<String>,
    /// Base URL of the front end; links are built beneath it.
    pub app_url: Option<String>,
    /// Session token lifetime in seconds.
    pub session_ttl_secs: Option<i64>,
    /// Password-reset link lifetime in seconds.
    pub reset_ttl_secs: Option<i64>,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("allow_ephemeral_secret", &self.allow_ephemeral_secret)
            .field("issuer", &self.issuer)
            .field("app_url", &self.app_url)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("reset_ttl_secs", &self.reset_ttl_secs)
            .finish()
    }
}

impl AuthSettings {
    /// Move the signing secret out of the settings.
    ///
    /// Without a configured secret a random one is generated when ephemeral
    /// secrets are allowed or in debug builds; tokens signed with it do not
    /// survive a restart.
    pub fn take_secret(&mut self) -> Result<Zeroizing<String>, SettingsError> {
        if let Some(secret) = self.secret.take().filter(|value| !value.trim().is_empty()) {
            return Ok(Zeroizing::new(secret));
        }
        if self.allow_ephemeral_secret || cfg!(debug_assertions) {
            warn!("using temporary token secret (dev only)");
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(EPHEMERAL_SECRET_LENGTH)
                .map(char::from)
                .collect();
            return Ok(Zeroizing::new(secret));
        }
        Err(SettingsError::Missing { key: "AUTH_SECRET" })
    }

    /// Configured issuer or the package name.
    pub fn issuer(&self) -> &str {
        self.issuer.as_deref().unwrap_or(DEFAULT_ISSUER)
    }

    /// Configured front-end URL or the local development server.
    pub fn app_url(&self) -> &str {
        self.app_url.as_deref().unwrap_or(DEFAULT_APP_URL)
    }

    /// Token lifetimes with configured overrides applied.
    pub fn token_lifetimes(&self) -> Result<TokenLifetimes, SettingsError> {
        let defaults = TokenLifetimes::default();
        Ok(TokenLifetimes {
            password: self.password_reset_ttl()?,
            session: seconds("AUTH_SESSION_TTL_SECS", self.session_ttl_secs, defaults.session)?,
        })
    }

    /// Lifetime of password-reset links.
    pub fn password_reset_ttl(&self) -> Result<TimeDelta, SettingsError> {
        seconds(
            "AUTH_RESET_TTL_SECS",
            self.reset_ttl_secs,
            TokenLifetimes::default().password,
        )
    }
}

/// Page size bounds.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PAGINATION")]
pub struct PaginationSettings {
    /// Smallest and default page size.
    pub min_items: Option<u32>,
    /// Largest page size.
    pub max_items: Option<u32>,
}

impl PaginationSettings {
    /// Validated limits; absent values keep the defaults.
    pub fn limits(&self) -> Result<PaginationLimits, SettingsError> {
        let defaults = PaginationLimits::default();
        PaginationLimits::new(
            self.min_items.unwrap_or(defaults.min_items_per_page()),
            self.max_items.unwrap_or(defaults.max_items_per_page()),
        )
        .map_err(|err| SettingsError::invalid("PAGINATION_MIN_ITEMS", err.to_string()))
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "HASHING")]
pub struct HashingSettings {
    /// Memory cost in KiB.
    pub memory_kib: Option<u32>,
    /// Number of passes.
    pub iterations: Option<u32>,
    /// Degree of parallelism.
    pub parallelism: Option<u32>,
}

impl HashingSettings {
    /// Cost with configured overrides applied.
    pub fn cost(&self) -> Argon2Cost {
        let defaults = Argon2Cost::default();
        Argon2Cost {
            memory_kib: self.memory_kib.unwrap_or(defaults.memory_kib),
            iterations: self.iterations.unwrap_or(defaults.iterations),
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DATABASE")]
pub struct DatabaseSettings {
    /// Connection URL (`DATABASE_URL`). Without one, storage is process-local.
    pub url: Option<String>,
    /// Upper bound on pooled connections.
    pub pool_max_size: Option<u32>,
    /// Seconds a connection checkout may wait.
    pub pool_timeout_secs: Option<u64>,
}

impl DatabaseSettings {
    /// Pool configuration for `url_override` or the configured URL, if any.
    pub fn pool_config(&self, url_override: Option<String>) -> Option<PoolConfig> {
        let url = url_override
            .or_else(|| self.url.clone())
            .filter(|value| !value.trim().is_empty())?;
        let mut config = PoolConfig::new(url);
        if let Some(max_size) = self.pool_max_size {
            config = config.with_max_size(max_size);
        }
        if let Some(secs) = self.pool_timeout_secs {
            config = config.with_connection_timeout(Duration::from_secs(secs));
        }
        Some(config)
    }
}

/// Every settings section.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Token and link settings.
    pub auth: AuthSettings,
    /// Page size bounds.
    pub pagination: PaginationSettings,
    /// Hashing cost.
    pub hashing: HashingSettings,
    /// Database connection.
    pub database: DatabaseSettings,
}

impl Settings {
    /// Load every section from the environment and config files.
    pub fn load() -> Result<Self, SettingsError> {
        Ok(Self {
            auth: AuthSettings::load_from_iter(program_only())
                .map_err(|err| SettingsError::load("auth", err))?,
            pagination: PaginationSettings::load_from_iter(program_only())
                .map_err(|err| SettingsError::load("pagination", err))?,
            hashing: HashingSettings::load_from_iter(program_only())
                .map_err(|err| SettingsError::load("hashing", err))?,
            database: DatabaseSettings::load_from_iter(program_only())
                .map_err(|err| SettingsError::load("database", err))?,
        })
    }
}
