//! Portfolio Metrics
//!
//! Pure functions deriving aggregate metrics from a fact set. Nothing here
//! keeps state between calls.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::facts::{Fact, FactCategory};

/// HHI scale: a single-asset portfolio scores 10,000
pub const HHI_SCALE: Decimal = dec!(10000);

/// Metric a rule can be guarded on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Hhi,
    LeverageRatio,
    IlliquidityRatio,
}

/// Aggregate metrics for one address
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_assets: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub total_liabilities: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub total_locked: Decimal,

    /// Assets minus liabilities (may be negative)
    #[serde(with = "rust_decimal::serde::float")]
    pub net_worth: Decimal,

    /// Herfindahl-Hirschman concentration index, 0 to 10,000
    #[serde(with = "rust_decimal::serde::float")]
    pub hhi: Decimal,

    /// Liabilities / assets
    #[serde(with = "rust_decimal::serde::float")]
    pub leverage_ratio: Decimal,

    /// Locked value / assets
    #[serde(with = "rust_decimal::serde::float")]
    pub illiquidity_ratio: Decimal,
}

impl PortfolioMetrics {
    /// Derive every metric from a fact set.
    ///
    /// Fails with an evaluation error on a negative value or on arithmetic
    /// overflow; both mean a fact was malformed upstream.
    pub fn from_facts<'a, I>(facts: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Fact>,
        I::IntoIter: Clone,
    {
        let facts = facts.into_iter();

        if let Some(bad) = facts.clone().find(|f| f.value_usd < Decimal::ZERO) {
            return Err(RiskError::evaluation(format!(
                "fact {} has negative value {}",
                bad.instrument_id, bad.value_usd
            )));
        }

        let total_assets = total_assets(facts.clone())?;
        let total_liabilities = total_liabilities(facts.clone())?;
        let total_locked = total_locked(facts.clone())?;

        Ok(Self {
            total_assets,
            total_liabilities,
            total_locked,
            net_worth: total_assets - total_liabilities,
            hhi: hhi(facts, total_assets)?,
            leverage_ratio: ratio(total_liabilities, total_assets)?,
            illiquidity_ratio: ratio(total_locked, total_assets)?,
        })
    }

    pub const fn value(&self, metric: Metric) -> Decimal {
        match metric {
            Metric::Hhi => self.hhi,
            Metric::LeverageRatio => self.leverage_ratio,
            Metric::IlliquidityRatio => self.illiquidity_ratio,
        }
    }
}

fn checked_sum<'a>(
    facts: impl Iterator<Item = &'a Fact>,
    include: impl Fn(FactCategory) -> bool,
) -> Result<Decimal> {
    facts
        .filter(|f| include(f.category))
        .try_fold(Decimal::ZERO, |acc, f| {
            acc.checked_add(f.value_usd)
                .ok_or_else(|| RiskError::evaluation("portfolio total overflowed"))
        })
}

/// Sum of every non-debt fact
pub fn total_assets<'a>(facts: impl Iterator<Item = &'a Fact>) -> Result<Decimal> {
    checked_sum(facts, FactCategory::is_asset)
}

/// Sum of borrowed facts
pub fn total_liabilities<'a>(facts: impl Iterator<Item = &'a Fact>) -> Result<Decimal> {
    checked_sum(facts, FactCategory::is_liability)
}

/// Sum of locked facts
pub fn total_locked<'a>(facts: impl Iterator<Item = &'a Fact>) -> Result<Decimal> {
    checked_sum(facts, FactCategory::is_locked)
}

/// `10000 × Σ (value_i / total)²` over asset facts, 0 for an empty portfolio
pub fn hhi<'a>(facts: impl Iterator<Item = &'a Fact>, total_assets: Decimal) -> Result<Decimal> {
    if total_assets.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let sum_of_squares = facts
        .filter(|f| f.category.is_asset())
        .try_fold(Decimal::ZERO, |acc, f| {
            let share = f.value_usd / total_assets;
            acc.checked_add(share * share)
                .ok_or_else(|| RiskError::evaluation("concentration index overflowed"))
        })?;

    Ok(sum_of_squares * HHI_SCALE)
}

/// `numerator / denominator`, 0 when the denominator is 0
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Result<Decimal> {
    if denominator.is_zero() {
        return Ok(Decimal::ZERO);
    }
    numerator.checked_div(denominator).ok_or_else(|| {
        RiskError::evaluation(format!("ratio {numerator} / {denominator} overflowed"))
    })
}
