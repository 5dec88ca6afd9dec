//! Service configuration
//!
//! One YAML document with the listen address, log filter, input profile,
//! article master data and the response-field policies in force at startup.
//!
//! ```yaml
//! listen_addr: "127.0.0.1:8787"
//! log_filter: "infeed=debug,info"
//! profile:
//!   enforce_batch_number: true
//! articles:
//!   "4006381333931": { id: "PZN-01", name: "Aspirin" }
//! policies:
//!   Pack:
//!     batch_number: { mode: Custom, value: "LOT-1" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use infeed_core::{InfeedError, Result};
use infeed_decision::{ArticleCatalog, InputArticle, InputProfile};
use infeed_fields::PolicyMode;

/// Env var naming the config file
pub const CONFIG_ENV: &str = "INFEED_CONFIG";
/// Env var overriding the listen address
pub const ADDR_ENV: &str = "INFEED_ADDR";

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen_addr: String,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    pub profile: InputProfile,
    /// Article master data keyed by scan code
    pub articles: BTreeMap<String, InputArticle>,
    /// type name → field name → mode
    pub policies: BTreeMap<String, BTreeMap<String, PolicyMode>>,
    pub decision_log_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            log_filter: "info".to_string(),
            profile: InputProfile::default(),
            articles: BTreeMap::new(),
            policies: BTreeMap::new(),
            decision_log_capacity: infeed_decision::audit::DEFAULT_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| InfeedError::Config(format!("invalid service config: {}", e)))
    }

    /// Load from `INFEED_CONFIG` (defaults when unset) and apply `INFEED_ADDR`
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).ok();
        let addr = std::env::var(ADDR_ENV).ok();
        Self::load_from(path.as_deref(), addr)
    }

    pub fn load_from(path: Option<&str>, addr_override: Option<String>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|e| {
                    InfeedError::Config(format!("cannot read config file '{}': {}", path, e))
                })?;
                Self::from_yaml(&yaml)?
            }
            None => Self::default(),
        };
        Ok(config.with_addr_override(addr_override))
    }

    pub fn with_addr_override(mut self, addr: Option<String>) -> Self {
        if let Some(addr) = addr.filter(|a| !a.is_empty()) {
            self.listen_addr = addr;
        }
        self
    }

    pub fn article_catalog(&self) -> ArticleCatalog {
        self.articles
            .iter()
            .map(|(scan_code, article)| (scan_code.clone(), article.clone()))
            .collect()
    }
}
