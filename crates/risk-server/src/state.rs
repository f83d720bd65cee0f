//! Application State

use std::sync::Arc;

use risk_advisor::RiskEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Risk engine; its fact store is locked per evaluation
    pub engine: Arc<RiskEngine>,

    /// Where the rule book came from ("defaults" or a file path)
    pub rules_source: Arc<str>,
}

impl AppState {
    pub fn new(engine: RiskEngine, rules_source: impl Into<Arc<str>>) -> Self {
        Self {
            engine: Arc::new(engine),
            rules_source: rules_source.into(),
        }
    }
}
