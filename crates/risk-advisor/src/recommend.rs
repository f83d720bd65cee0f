//! Recommendation Selection
//!
//! An ordered guard table. Every row is checked against the same metrics, so
//! several rows can fire in one pass; the fallback row only fires when none
//! of them do.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::metrics::{Metric, PortfolioMetrics};
use crate::model::NO_TOKEN;

/// One guarded row: when `metric > above`, recommend `token` for `reason`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub metric: Metric,
    pub above: Decimal,
    pub token: String,
    pub reason: String,
}

impl RecommendationRule {
    pub fn new(
        metric: Metric,
        above: Decimal,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            metric,
            above,
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn matches(&self, metrics: &PortfolioMetrics) -> bool {
        metrics.value(self.metric) > self.above
    }
}

/// A fired row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub token: String,
    pub reason: String,
}

impl Recommendation {
    /// The fallback carries no actionable token
    pub fn is_actionable(&self) -> bool {
        self.token != NO_TOKEN
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationTable {
    /// Rows in priority order
    pub rules: Vec<RecommendationRule>,

    /// Reason emitted when no row fires
    pub fallback_reason: String,
}

impl Default for RecommendationTable {
    fn default() -> Self {
        Self {
            rules: vec![
                RecommendationRule::new(
                    Metric::Hhi,
                    dec!(2500),
                    "USDC",
                    "High concentration risk - consider diversifying into stablecoins",
                ),
                RecommendationRule::new(
                    Metric::LeverageRatio,
                    dec!(0.2),
                    "BTC",
                    "High leverage detected - consider hedging with volatile assets like BTC",
                ),
                RecommendationRule::new(
                    Metric::LeverageRatio,
                    dec!(0.2),
                    "ETH",
                    "High leverage detected - consider hedging with volatile assets like ETH",
                ),
                RecommendationRule::new(
                    Metric::IlliquidityRatio,
                    dec!(0.3),
                    "USDC",
                    "High illiquidity from locked positions - add more liquid assets",
                ),
            ],
            fallback_reason: "No specific recommendations - portfolio is balanced".into(),
        }
    }
}

impl RecommendationTable {
    pub fn validate(&self) -> Result<()> {
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.token.trim().is_empty() || r.reason.trim().is_empty())
        {
            return Err(RiskError::Config(format!(
                "recommendation on {:?} needs a token and a reason",
                rule.metric
            )));
        }
        if self.fallback_reason.trim().is_empty() {
            return Err(RiskError::Config("fallback reason must not be empty".into()));
        }
        Ok(())
    }

    /// Evaluate every row against the metrics, in table order
    pub fn select(&self, metrics: &PortfolioMetrics) -> Vec<Recommendation> {
        let fired: Vec<Recommendation> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(metrics))
            .map(|rule| Recommendation {
                token: rule.token.clone(),
                reason: rule.reason.clone(),
            })
            .collect();

        if fired.is_empty() {
            vec![Recommendation {
                token: NO_TOKEN.into(),
                reason: self.fallback_reason.clone(),
            }]
        } else {
            fired
        }
    }
}

/// Split fired rows into the token list (sentinel removed) and the reasons
pub fn split_recommendations(recommendations: &[Recommendation]) -> (Vec<String>, Vec<String>) {
    let tokens = recommendations
        .iter()
        .filter(|r| r.is_actionable())
        .map(|r| r.token.clone())
        .collect();
    let reasons = recommendations.iter().map(|r| r.reason.clone()).collect();
    (tokens, reasons)
}
