//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check mount prefixes and names before any application is built
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::HostConfig;
use crate::routing::{MountError, PathPrefix};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mount `{name}`: {source}")]
    Mount {
        name: String,
        #[source]
        source: MountError,
    },

    #[error("mount name `{0}` is used more than once")]
    DuplicateMountName(String),

    #[error("mount name must not be empty")]
    EmptyMountName,

    #[error("{field} is not a valid socket address: `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut names = HashSet::new();
    for mount in &config.mounts {
        if mount.name.is_empty() {
            errors.push(ValidationError::EmptyMountName);
        } else if !names.insert(mount.name.as_str()) {
            errors.push(ValidationError::DuplicateMountName(mount.name.clone()));
        }

        if let Err(source) = PathPrefix::parse(&mount.path_prefix) {
            errors.push(ValidationError::Mount {
                name: mount.name.clone(),
                source,
            });
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.shutdown_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.shutdown_secs"));
    }
    if config.bridge.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("bridge.max_body_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
