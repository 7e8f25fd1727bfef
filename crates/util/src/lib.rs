//! Process environment helpers and the runtime configuration.

pub mod config;

use std::{env, net::SocketAddr};

pub use config::{AppConfig, ConfigError, Environment, LoginCredentials};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Merges `.env` into the process environment; a missing file is not an error.
pub fn load_env_file() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("ignoring unreadable .env file: {err}");
        }
    }
}

/// Reads `name`, falling back to `default` when unset or not valid unicode.
pub fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Resolves `APP_BIND_ADDR`, defaulting to [`DEFAULT_BIND_ADDR`].
pub fn server_bind_address() -> Result<SocketAddr, std::net::AddrParseError> {
    env_or("APP_BIND_ADDR", DEFAULT_BIND_ADDR).trim().parse()
}
