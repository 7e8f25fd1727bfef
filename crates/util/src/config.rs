use std::{env, fmt, net::SocketAddr, path::PathBuf, time::Duration};

use super::{env_or, server_bind_address};

pub const DEFAULT_DOMAINS_CSV_PATH: &str = "public/ri.csv";
pub const DEFAULT_LOGIN_USERNAME: &str = "demo";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;

// SHA-256 of "demo"; only used outside production.
const DEV_PASSWORD_SHA256: &str = "2a97516c354b68848cdbd8f54a226a0a55b21ed138e207ad6c5cbb9c00aa5aea";
const DEV_SESSION_SECRET: &str = "domdash-development-session-secret";

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// The single account accepted by the login form.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password_sha256: [u8; 32],
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password_sha256", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub domains_csv_path: PathBuf,
    pub credentials: LoginCredentials,
    pub session_secret: Vec<u8>,
    pub session_ttl: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("environment", &self.environment)
            .field("domains_csv_path", &self.domains_csv_path)
            .field("credentials", &self.credentials)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    ///
    /// Outside production the login password and session secret fall back to
    /// development values; in production both must be provided.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_str(&env_or("APP_ENV", "development"))?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let domains_csv_path = PathBuf::from(env_or("DOMAINS_CSV_PATH", DEFAULT_DOMAINS_CSV_PATH));

        let username = env_or("LOGIN_USERNAME", DEFAULT_LOGIN_USERNAME);
        if username.trim().is_empty() {
            return Err(ConfigError::EmptyValue("LOGIN_USERNAME"));
        }

        let password_hex =
            secret_var("LOGIN_PASSWORD_SHA256", environment, DEV_PASSWORD_SHA256)?;
        let password_sha256 = decode_digest("LOGIN_PASSWORD_SHA256", &password_hex)?;

        let session_secret =
            secret_var("SESSION_SECRET", environment, DEV_SESSION_SECRET)?.into_bytes();

        let session_ttl = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidNumber {
                    var: "SESSION_TTL_SECS",
                    value: raw,
                })?,
            Err(_) => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        Ok(Self {
            bind_addr,
            environment,
            domains_csv_path,
            credentials: LoginCredentials {
                username,
                password_sha256,
            },
            session_secret,
            session_ttl,
        })
    }
}

fn secret_var(
    name: &'static str,
    environment: Environment,
    development_default: &str,
) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ if environment.is_production() => Err(ConfigError::MissingVar(name)),
        _ => Ok(development_default.to_string()),
    }
}

fn decode_digest(name: &'static str, value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(value.trim()).map_err(|err| ConfigError::InvalidHex {
        var: name,
        reason: err.to_string(),
    })?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ConfigError::InvalidDigestLength { var: name, len })
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingVar(&'static str),
    EmptyValue(&'static str),
    InvalidHex { var: &'static str, reason: String },
    InvalidDigestLength { var: &'static str, len: usize },
    InvalidNumber { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingVar(name) => write!(f, "{name} must be set in production"),
            Self::EmptyValue(name) => write!(f, "{name} must not be empty"),
            Self::InvalidHex { var, reason } => write!(f, "{var} is not valid hex: {reason}"),
            Self::InvalidDigestLength { var, len } => {
                write!(f, "{var} must be a 32-byte SHA-256 digest (got {len} bytes)")
            }
            Self::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive integer (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
