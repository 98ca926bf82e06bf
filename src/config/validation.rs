//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every problem is
//! reported, not just the first.

use std::net::IpAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host `{0}` is not an IP address")]
    InvalidHost(String),

    #[error("listener.host `{0}` is not a loopback address")]
    NotLoopback(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.listener.host.parse::<IpAddr>() {
        Ok(ip) if !ip.is_loopback() => {
            errors.push(ValidationError::NotLoopback(config.listener.host.clone()))
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidHost(config.listener.host.clone())),
    }

    if config.listener.backlog == 0 {
        errors.push(ValidationError::Zero("listener.backlog"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.shutdown.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("shutdown.poll_interval_ms"));
    }
    if config.session.buffer_size == 0 {
        errors.push(ValidationError::Zero("session.buffer_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
