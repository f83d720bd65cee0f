//! Server Configuration
//!
//! Read from the environment after `.env` has been loaded.

use std::path::PathBuf;

use risk_advisor::{RiskEngine, RuleBook};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,

    /// Optional JSON rule book overriding the default thresholds
    pub rules_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            rules_path: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let rules_path = lookup("RISK_RULES_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            bind_addr,
            rules_path,
        }
    }

    /// Build the engine, loading the rule book file when one is configured
    pub fn build_engine(&self) -> risk_advisor::Result<(RiskEngine, String)> {
        match &self.rules_path {
            Some(path) => {
                let rules = RuleBook::from_file(path)?;
                Ok((RiskEngine::new(rules)?, path.display().to_string()))
            }
            None => Ok((RiskEngine::default(), "defaults".into())),
        }
    }
}
