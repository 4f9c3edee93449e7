//! Agent configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! base_url = "https://stock.l402.org"
//! executor_url = "http://127.0.0.1:9735"
//! timeout_secs = 60
//! max_fee_msats = 1000
//!
//! [node]
//! api_client_id = "$LIGHTSPARK_API_TOKEN_CLIENT_ID"
//! api_client_secret = "${LIGHTSPARK_API_TOKEN_CLIENT_SECRET}"
//! node_id = "$LIGHTSPARK_NODE_ID"
//! node_password = "$LIGHTSPARK_NODE_PASSWORD"
//! ```
//!
//! A missing file is not an error; every key has a default and the
//! `[node]` table falls back to the `LIGHTSPARK_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use l402::{ConfigError, MilliSatoshis, NodeConfig, PaymentLimits};
use l402_http::constants::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use url::Url;

/// Errors raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Resource server base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Payment service URL; without it the agent cannot pay.
    #[serde(default)]
    pub executor_url: Option<String>,

    /// Time the executor may spend on one payment, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Routing-fee ceiling per payment, in millisatoshis.
    #[serde(default = "default_max_fee_msats")]
    pub max_fee_msats: u64,

    /// Node credentials; read from the environment when absent.
    #[serde(default)]
    pub node: Option<NodeConfig>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    l402::config::DEFAULT_PAYMENT_TIMEOUT.as_secs()
}

fn default_max_fee_msats() -> u64 {
    l402::config::DEFAULT_MAXIMUM_FEE.as_u64()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            executor_url: None,
            timeout_secs: default_timeout_secs(),
            max_fee_msats: default_max_fee_msats(),
            node: None,
        }
    }
}

impl AgentConfig {
    /// Loads configuration from `path`, expanding `$VAR` references from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, LoadError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| LoadError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml(&content, |name| std::env::var(name).ok())
    }

    /// Parses configuration text, expanding `$VAR` references through
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] for invalid TOML.
    pub fn from_toml<F>(content: &str, lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, lookup);
        Ok(toml::from_str(&expanded)?)
    }

    /// Applies command-line and environment overrides.
    #[must_use]
    pub fn with_overrides(mut self, base_url: Option<Url>, executor_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.into();
        }
        if executor_url.is_some() {
            self.executor_url = executor_url;
        }
        self
    }

    /// Parses the resource server base URL.
    ///
    /// # Errors
    ///
    /// Returns a parse error if `base_url` is not an absolute URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// Returns the payment limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `timeout_secs` is zero.
    pub fn payment_limits(&self) -> Result<PaymentLimits, ConfigError> {
        PaymentLimits::new(
            Duration::from_secs(self.timeout_secs),
            MilliSatoshis(self.max_fee_msats),
        )
    }

    /// Returns the node credentials from the `[node]` table, or from the
    /// environment if the table is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for a blank value and
    /// [`ConfigError::Invalid`] for a `$VAR` reference that did not resolve.
    pub fn node_config(&self) -> Result<NodeConfig, ConfigError> {
        let Some(node) = &self.node else {
            return NodeConfig::from_env();
        };
        node.validate()?;
        let fields = [
            ("node.api_client_id", &node.api_client_id),
            ("node.api_client_secret", &node.api_client_secret),
            ("node.node_id", &node.node_id),
            ("node.node_password", &node.node_password),
        ];
        for (name, value) in fields {
            if value.starts_with('$') {
                return Err(ConfigError::Invalid {
                    name,
                    reason: "environment variable reference did not resolve".to_owned(),
                });
            }
        }
        Ok(node.clone())
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string through `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name).filter(|_| !name.is_empty()) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_expand_env_vars() {
        let env = lookup(&[("A", "alpha"), ("B_2", "beta")]);
        assert_eq!(expand_env_vars("x=$A, y=${B_2}!", &env), "x=alpha, y=beta!");
        assert_eq!(expand_env_vars("$MISSING ${ALSO}", &env), "$MISSING ${ALSO}");
        assert_eq!(expand_env_vars("cost: 5$", &env), "cost: 5$");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AgentConfig::from_toml("", lookup(&[])).unwrap();
        assert_eq!(config.base_url().unwrap().as_str(), "https://stock.l402.org/");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_fee_msats, 1000);
        assert!(config.executor_url.is_none());
        assert!(config.node.is_none());
    }

    #[test]
    fn test_node_table_expansion() {
        let toml = r#"
            executor_url = "http://127.0.0.1:9735"
            timeout_secs = 10

            [node]
            api_client_id = "$CLIENT"
            api_client_secret = "${SECRET}"
            node_id = "LightsparkNodeWithOSKLND:0191"
            node_password = "$PASSWORD"
        "#;
        let config = AgentConfig::from_toml(
            toml,
            lookup(&[("CLIENT", "id"), ("SECRET", "s3cr3t"), ("PASSWORD", "pw")]),
        )
        .unwrap();
        let node = config.node_config().unwrap();
        assert_eq!(node.api_client_secret, "s3cr3t");
        assert_eq!(
            config.payment_limits().unwrap().timeout,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_unresolved_node_reference() {
        let toml = r#"
            [node]
            api_client_id = "id"
            api_client_secret = "secret"
            node_id = "node"
            node_password = "$NOPE"
        "#;
        let config = AgentConfig::from_toml(toml, lookup(&[])).unwrap();
        assert!(matches!(
            config.node_config(),
            Err(ConfigError::Invalid { name: "node.node_password", .. })
        ));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(AgentConfig::from_toml("base_ur = \"x\"", lookup(&[])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AgentConfig::default().with_overrides(
            Some("http://localhost:8080".parse().unwrap()),
            Some("http://pay".into()),
        );
        assert_eq!(config.base_url, "http://localhost:8080/");
        assert_eq!(config.executor_url.as_deref(), Some("http://pay"));
    }
}
