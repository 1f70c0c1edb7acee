//! Dial and accept configuration
//!
//! Timeouts and limits for the client attempts and for the server endpoint.
//! Everything here is plain data passed explicitly; nothing is global.

use std::time::Duration;

pub mod validation;

pub use validation::{ConfigResult, ConfigValidator, ConfigurationError, Validator};

/// TCP connection configuration
#[derive(Debug, Clone)]
pub struct TcpConfig {
    pub nodelay: bool,
    pub keepalive: Option<Duration>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: Some(Duration::from_secs(60)),
        }
    }
}

/// Client-side settings shared by the cleartext and TLS attempts.
#[derive(Debug, Clone)]
pub struct DialConfig {
    /// Upper bound on establishing one TCP connection, DNS included.
    pub connect_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    /// How long to wait for the upgrade response once the request is sent.
    /// `None` waits as long as the connection stays open.
    pub upgrade_timeout: Option<Duration>,
    pub tcp: TcpConfig,
    /// Trust the platform's certificate store in addition to the bundled roots.
    pub use_native_certs: bool,
    /// How much of a non-101 response body is kept for diagnostics.
    pub max_error_body: usize,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tls_handshake_timeout: Duration::from_secs(10),
            upgrade_timeout: None,
            tcp: TcpConfig::default(),
            use_native_certs: false,
            max_error_body: 4096,
        }
    }
}

impl Validator for DialConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_timeout(self.connect_timeout, "connect_timeout")?;
        ConfigValidator::validate_timeout(self.tls_handshake_timeout, "tls_handshake_timeout")?;
        if let Some(timeout) = self.upgrade_timeout {
            ConfigValidator::validate_timeout(timeout, "upgrade_timeout")?;
        }
        if let Some(keepalive) = self.tcp.keepalive {
            ConfigValidator::validate_timeout(keepalive, "tcp.keepalive")?;
        }
        ConfigValidator::validate_size(self.max_error_body, "max_error_body")
    }
}

/// Server-side settings for the switch endpoint.
#[derive(Debug, Clone)]
pub struct AcceptConfig {
    /// Request path served by the hosting server.
    pub path: String,
    /// Largest initiation payload accepted in the request body.
    pub max_init_size: usize,
}

impl Default for AcceptConfig {
    fn default() -> Self {
        Self {
            path: crate::upgrade::SWITCH_PATH.to_string(),
            max_init_size: 64 * 1024,
        }
    }
}

impl Validator for AcceptConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.path.starts_with('/') {
            return Err(ConfigurationError::InvalidParameter(format!(
                "path {:?} must start with '/'",
                self.path
            )));
        }
        ConfigValidator::validate_size(self.max_init_size, "max_init_size")
    }
}
