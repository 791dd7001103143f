//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Check that the arena can hold at least one datagram, chunk overhead included
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::DaemonConfig;
use crate::memory::Arena;

/// Largest UDP payload the listener can receive.
pub const MAX_UDP_PAYLOAD: usize = 65_535;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("worker.max_datagram_size {0} must be between 1 and 65535")]
    DatagramSize(usize),

    #[error("worker.arena_limit_bytes {limit} cannot hold a {datagram}-byte datagram")]
    ArenaTooSmall { limit: usize, datagram: usize },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let datagram = config.worker.max_datagram_size;
    if datagram == 0 || datagram > MAX_UDP_PAYLOAD {
        errors.push(ValidationError::DatagramSize(datagram));
    } else if !Arena::can_hold(config.worker.arena_limit_bytes, datagram) {
        errors.push(ValidationError::ArenaTooSmall {
            limit: config.worker.arena_limit_bytes,
            datagram,
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&DaemonConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = DaemonConfig::default();
        config.listener.bind_address = "localhost".to_string();
        config.worker.max_datagram_size = 0;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("localhost".to_string()),
                ValidationError::DatagramSize(0),
                ValidationError::MetricsAddress("nowhere".to_string()),
            ]
        );
    }

    #[test]
    fn arena_must_fit_a_datagram() {
        let mut config = DaemonConfig::default();
        config.worker.arena_limit_bytes = 1024;
        config.worker.max_datagram_size = 4096;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ArenaTooSmall {
                limit: 1024,
                datagram: 4096
            }]
        );
    }

    #[test]
    fn arena_limit_equal_to_datagram_is_too_small() {
        let mut config = DaemonConfig::default();
        config.worker.arena_limit_bytes = MAX_UDP_PAYLOAD;
        config.worker.max_datagram_size = MAX_UDP_PAYLOAD;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ArenaTooSmall {
                limit: MAX_UDP_PAYLOAD,
                datagram: MAX_UDP_PAYLOAD
            }]
        );

        config.worker.arena_limit_bytes = 2 * MAX_UDP_PAYLOAD;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_ignored_when_disabled() {
        let mut config = DaemonConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
