//! Configuration validation utilities

use std::time::Duration;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid network address: {0}")]
    InvalidAddress(String),

    #[error("Invalid size limit: {0}")]
    InvalidSize(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration validation trait
pub trait Validator {
    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant describing the first setting
    /// that is out of range.
    fn validate(&self) -> ConfigResult<()>;
}

/// Common configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate timeout duration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` if the duration is zero or
    /// exceeds 1 hour.
    pub fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot be zero"
            )));
        }

        if timeout.as_secs() > 3600 {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot exceed 1 hour"
            )));
        }

        Ok(())
    }

    /// Validate a byte-count limit
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSize` if the size is zero or exceeds 1GB.
    pub fn validate_size(size: usize, name: &str) -> ConfigResult<()> {
        if size == 0 {
            return Err(ConfigurationError::InvalidSize(format!(
                "{name} cannot be zero"
            )));
        }

        if size > 1024 * 1024 * 1024 {
            return Err(ConfigurationError::InvalidSize(format!(
                "{name} cannot exceed 1GB"
            )));
        }

        Ok(())
    }

    /// Validate a dial target host
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidAddress` for empty hosts and hosts
    /// containing characters that cannot appear in a URL authority.
    pub fn validate_host(host: &str) -> ConfigResult<()> {
        if host.is_empty() {
            return Err(ConfigurationError::InvalidAddress(
                "host cannot be empty".to_string(),
            ));
        }

        if host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@'))
        {
            return Err(ConfigurationError::InvalidAddress(format!(
                "host {host:?} contains invalid characters"
            )));
        }

        Ok(())
    }

    /// Validate a port number
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidAddress` for port 0.
    pub fn validate_port(port: u16, name: &str) -> ConfigResult<()> {
        if port == 0 {
            return Err(ConfigurationError::InvalidAddress(format!(
                "{name} cannot be 0"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_huge_timeouts() {
        assert!(ConfigValidator::validate_timeout(Duration::ZERO, "connect_timeout").is_err());
        assert!(
            ConfigValidator::validate_timeout(Duration::from_secs(7200), "connect_timeout")
                .is_err()
        );
        assert!(ConfigValidator::validate_timeout(Duration::from_secs(30), "connect_timeout").is_ok());
    }

    #[test]
    fn rejects_malformed_hosts() {
        assert!(ConfigValidator::validate_host("").is_err());
        assert!(ConfigValidator::validate_host("evil.com/path").is_err());
        assert!(ConfigValidator::validate_host("user@host").is_err());
        assert!(ConfigValidator::validate_host("control.example.com").is_ok());
        assert!(ConfigValidator::validate_host("::1").is_ok());
    }

    #[test]
    fn rejects_zero_sizes_and_ports() {
        assert!(ConfigValidator::validate_size(0, "max_init_size").is_err());
        assert!(ConfigValidator::validate_size(4096, "max_init_size").is_ok());
        assert!(ConfigValidator::validate_port(0, "http_port").is_err());
        assert!(ConfigValidator::validate_port(80, "http_port").is_ok());
    }
}
