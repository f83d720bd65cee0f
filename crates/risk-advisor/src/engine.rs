//! Risk Engine
//!
//! Wires fact extraction, metrics, scoring and recommendations together.
//!
//! ```text
//! snapshot ──► facts ──► FactStore ──► metrics ──► factors ──► score
//!                                         │
//!                                         └──────► recommendations
//! ```
//!
//! The rule book is immutable once built and can be shared freely. The fact
//! store is the only mutable state: every evaluation holds its lock across
//! assert → evaluate → retract, so facts from two addresses are never summed
//! together.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::facts::{extract_facts, Fact};
use crate::metrics::PortfolioMetrics;
use crate::model::{PortfolioSnapshot, RiskAssessment, RiskLevel};
use crate::recommend::{split_recommendations, Recommendation, RecommendationTable};
use crate::scoring::{RiskFactors, RiskRules};

/// Compiled rules: scoring bands plus the recommendation table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    pub risk: RiskRules,
    pub recommendations: RecommendationTable,
}

impl RuleBook {
    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;
        self.recommendations.validate()
    }

    /// Parse and validate a JSON rule book; missing sections keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Self = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RiskError::Config(format!("cannot read rules file {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

// ============================================================================
// Fact store
// ============================================================================

/// In-process fact base, keyed by owner address
#[derive(Debug, Default)]
pub struct FactStore {
    facts: Vec<Fact>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert_all(&mut self, facts: impl IntoIterator<Item = Fact>) {
        self.facts.extend(facts);
    }

    pub fn facts_for<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a Fact> + Clone {
        self.facts.iter().filter(move |f| f.address == address)
    }

    /// Remove every fact for `address`, returning how many were dropped
    pub fn retract(&mut self, address: &str) -> usize {
        let before = self.facts.len();
        self.facts.retain(|f| f.address != address);
        before - self.facts.len()
    }

    pub fn clear(&mut self) {
        self.facts.clear();
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Facts asserted for one request; retracted on drop, including on error paths
struct StoreSession<'a> {
    store: &'a mut FactStore,
    address: String,
}

impl<'a> StoreSession<'a> {
    fn open(store: &'a mut FactStore, address: &str, facts: Vec<Fact>) -> Self {
        store.assert_all(facts);
        Self {
            store,
            address: address.to_string(),
        }
    }

    fn facts(&self) -> impl Iterator<Item = &Fact> + Clone {
        self.store.facts_for(&self.address)
    }
}

impl Drop for StoreSession<'_> {
    fn drop(&mut self) {
        self.store.retract(&self.address);
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Everything derived for one snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub address: String,
    pub fact_count: usize,
    pub metrics: PortfolioMetrics,
    pub factors: RiskFactors,
    pub recommendations: Vec<Recommendation>,
}

impl Evaluation {
    pub fn risk_score(&self) -> Decimal {
        self.factors.score()
    }

    pub fn assessment(&self) -> RiskAssessment {
        let (recommended_tokens, reasoning) = split_recommendations(&self.recommendations);
        RiskAssessment {
            recommended_tokens,
            risk_score: self.risk_score(),
            reasoning,
        }
    }
}

/// Detailed report: the assessment plus the numbers behind it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskReport {
    pub address: String,
    pub assessment: RiskAssessment,
    pub risk_level: RiskLevel,
    pub metrics: PortfolioMetrics,
    pub factors: RiskFactors,
    pub fact_count: usize,
    pub evaluated_at: DateTime<Utc>,
}

impl From<Evaluation> for RiskReport {
    fn from(evaluation: Evaluation) -> Self {
        let assessment = evaluation.assessment();
        Self {
            risk_level: assessment.risk_level(),
            address: evaluation.address,
            assessment,
            metrics: evaluation.metrics,
            factors: evaluation.factors,
            fact_count: evaluation.fact_count,
            evaluated_at: Utc::now(),
        }
    }
}

fn evaluate_facts<'a, I>(
    rules: &RuleBook,
    address: &str,
    facts: I,
    total_assets_hint: Decimal,
) -> Result<Evaluation>
where
    I: Iterator<Item = &'a Fact> + Clone,
{
    let fact_count = facts.clone().count();
    let metrics = PortfolioMetrics::from_facts(facts)?;

    if metrics.total_assets != total_assets_hint {
        return Err(RiskError::evaluation(format!(
            "asset total {} disagrees with extracted total {}",
            metrics.total_assets, total_assets_hint
        )));
    }

    tracing::debug!(
        address,
        total_assets = %metrics.total_assets,
        total_liabilities = %metrics.total_liabilities,
        total_locked = %metrics.total_locked,
        hhi = %metrics.hhi,
        "derived portfolio metrics"
    );

    let factors = rules.risk.factors(&metrics);
    let recommendations = rules.recommendations.select(&metrics);

    Ok(Evaluation {
        address: address.to_string(),
        fact_count,
        metrics,
        factors,
        recommendations,
    })
}

// ============================================================================
// Engine
// ============================================================================

/// Reusable risk engine, safe to share across threads
#[derive(Debug)]
pub struct RiskEngine {
    rules: RuleBook,
    store: Mutex<FactStore>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self {
            rules: RuleBook::default(),
            store: Mutex::new(FactStore::new()),
        }
    }
}

impl RiskEngine {
    /// Build an engine from a validated rule book
    pub fn new(rules: RuleBook) -> Result<Self> {
        rules.validate()?;
        Ok(Self {
            rules,
            store: Mutex::new(FactStore::new()),
        })
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Facts currently held; zero between evaluations
    pub fn pending_facts(&self) -> usize {
        self.lock_store().len()
    }

    fn lock_store(&self) -> MutexGuard<'_, FactStore> {
        self.store.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("fact store lock was poisoned, clearing stale facts");
            let mut store = poisoned.into_inner();
            store.clear();
            store
        })
    }

    /// Run one full evaluation
    pub fn evaluate(&self, snapshot: &PortfolioSnapshot) -> Result<Evaluation> {
        let (facts, total_assets_hint) = extract_facts(snapshot)?;
        let address = snapshot.address()?;

        let mut store = self.lock_store();
        let session = StoreSession::open(&mut store, address, facts);
        evaluate_facts(&self.rules, address, session.facts(), total_assets_hint)
    }

    pub fn try_assess(&self, snapshot: &PortfolioSnapshot) -> Result<RiskAssessment> {
        let evaluation = self.evaluate(snapshot)?;
        let assessment = evaluation.assessment();

        tracing::info!(
            address = %evaluation.address,
            risk_score = %assessment.risk_score,
            recommendations = assessment.recommended_tokens.len(),
            "portfolio assessed"
        );

        Ok(assessment)
    }

    /// Assess a snapshot; any failure becomes a degraded assessment
    pub fn assess(&self, snapshot: &PortfolioSnapshot) -> RiskAssessment {
        self.try_assess(snapshot).unwrap_or_else(|e| {
            tracing::error!(error = %e, "risk analysis failed");
            RiskAssessment::degraded(&e)
        })
    }

    pub fn report(&self, snapshot: &PortfolioSnapshot) -> Result<RiskReport> {
        self.evaluate(snapshot).map(RiskReport::from)
    }
}

/// Assess with default rules and a private, per-call fact store
pub fn assess_snapshot(snapshot: &PortfolioSnapshot) -> RiskAssessment {
    RiskEngine::default().assess(snapshot)
}
