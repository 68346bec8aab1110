//! Configuration management for services

use crate::error::{CoreError, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Read an environment variable, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, falling back to `default` when unset.
///
/// A value that is present but does not parse is a configuration error rather
/// than a silent fallback.
pub fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub host: String,
    pub http_port: u16,
}

impl ServiceConfig {
    pub fn from_env(default_name: &str, default_port: u16) -> Result<Self> {
        Ok(Self {
            service_name: env_or("SERVICE_NAME", default_name),
            host: env_or("HOST", "0.0.0.0"),
            http_port: env_parse("HTTP_PORT", default_port)?,
        })
    }

    /// Socket address the HTTP listener binds to
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|e| CoreError::Config(format!("Invalid bind address: {}", e)))
    }
}
