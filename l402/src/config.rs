//! Node credentials and payment limits.
//!
//! Everything needed to pay from a funded node is collected into an explicit
//! [`NodeConfig`] and validated at construction, so a missing credential is
//! reported at startup instead of on the first 402.
//!
//! # Environment Variables
//!
//! [`NodeConfig::from_env`] reads:
//!
//! - `LIGHTSPARK_API_TOKEN_CLIENT_ID`
//! - `LIGHTSPARK_API_TOKEN_CLIENT_SECRET`
//! - `LIGHTSPARK_NODE_ID`
//! - `LIGHTSPARK_NODE_PASSWORD`

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::amount::MilliSatoshis;
use crate::error::ConfigError;

/// Environment variable holding the API client id.
pub const ENV_CLIENT_ID: &str = "LIGHTSPARK_API_TOKEN_CLIENT_ID";
/// Environment variable holding the API client secret.
pub const ENV_CLIENT_SECRET: &str = "LIGHTSPARK_API_TOKEN_CLIENT_SECRET";
/// Environment variable holding the paying node's id.
pub const ENV_NODE_ID: &str = "LIGHTSPARK_NODE_ID";
/// Environment variable holding the paying node's password.
pub const ENV_NODE_PASSWORD: &str = "LIGHTSPARK_NODE_PASSWORD";

/// Default time the executor may spend on one payment.
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default routing-fee ceiling.
pub const DEFAULT_MAXIMUM_FEE: MilliSatoshis = MilliSatoshis(1000);

/// Credentials of the node that pays for metered requests.
///
/// Secrets are redacted from the [`Debug`] output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// API token client id.
    pub api_client_id: String,
    /// API token client secret.
    pub api_client_secret: String,
    /// Id of the funded node.
    pub node_id: String,
    /// Password that unlocks the node's signing key.
    pub node_password: String,
}

impl NodeConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if any value is empty or whitespace.
    pub fn new(
        api_client_id: impl Into<String>,
        api_client_secret: impl Into<String>,
        node_id: impl Into<String>,
        node_password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            api_client_id: api_client_id.into(),
            api_client_secret: api_client_secret.into(),
            node_id: node_id.into(),
            node_password: node_password.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first variable that is
    /// unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        Self::new(
            get(ENV_CLIENT_ID)?,
            get(ENV_CLIENT_SECRET)?,
            get(ENV_NODE_ID)?,
            get(ENV_NODE_PASSWORD)?,
        )
    }

    /// Checks that every value is present.
    ///
    /// Useful after deserializing, where construction checks were bypassed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first blank value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            (ENV_CLIENT_ID, &self.api_client_id),
            (ENV_CLIENT_SECRET, &self.api_client_secret),
            (ENV_NODE_ID, &self.node_id),
            (ENV_NODE_PASSWORD, &self.node_password),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("api_client_id", &self.api_client_id)
            .field("api_client_secret", &"<redacted>")
            .field("node_id", &self.node_id)
            .field("node_password", &"<redacted>")
            .finish()
    }
}

/// Bounds applied to every payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentLimits {
    /// Time the executor may spend on one payment.
    pub timeout: Duration,
    /// Routing-fee ceiling.
    pub maximum_fee: MilliSatoshis,
}

impl Default for PaymentLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PAYMENT_TIMEOUT,
            maximum_fee: DEFAULT_MAXIMUM_FEE,
        }
    }
}

impl PaymentLimits {
    /// Builds limits, rejecting a zero timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `timeout` is zero.
    pub fn new(timeout: Duration, maximum_fee: MilliSatoshis) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "timeout",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(Self {
            timeout,
            maximum_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_from_lookup_complete() {
        let vars = env(&[
            (ENV_CLIENT_ID, "client"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_NODE_ID, "node-1"),
            (ENV_NODE_PASSWORD, "hunter2"),
        ]);
        let config = NodeConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.node_id, "node-1");
    }

    #[test]
    fn test_from_lookup_reports_missing_variable() {
        let vars = env(&[
            (ENV_CLIENT_ID, "client"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_NODE_PASSWORD, "hunter2"),
        ]);
        let err = NodeConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_NODE_ID));
    }

    #[test]
    fn test_blank_value_is_missing() {
        let err = NodeConfig::new("client", "   ", "node", "pw").unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_CLIENT_SECRET));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = NodeConfig::new("client", "s3cr3t", "node", "hunter2").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("node"));
    }

    #[test]
    fn test_payment_limits() {
        let limits = PaymentLimits::default();
        assert_eq!(limits.timeout, Duration::from_secs(60));
        assert_eq!(limits.maximum_fee, MilliSatoshis(1000));
        assert!(PaymentLimits::new(Duration::ZERO, MilliSatoshis(1)).is_err());
    }
}
