//! Sentinela Core - Shared service infrastructure
//!
//! This crate provides:
//! - Service configuration loaded from the environment
//! - Error handling utilities
//! - Health payloads and graceful shutdown for HTTP services

pub mod config;
pub mod error;
pub mod service;

pub use config::{env_or, env_parse, ServiceConfig};
pub use error::{CoreError, Result};
pub use service::{shutdown_signal, HealthStatus};
