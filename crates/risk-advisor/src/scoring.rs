//! Risk Scoring
//!
//! Each metric maps to a bounded risk factor through threshold bands. The
//! overall score is the sum of the factors, capped at 1.0.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::metrics::PortfolioMetrics;

/// Contribute `contribution` when a metric is strictly above `above`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub above: Decimal,
    pub contribution: Decimal,
}

impl ThresholdBand {
    pub const fn new(above: Decimal, contribution: Decimal) -> Self {
        Self {
            above,
            contribution,
        }
    }
}

/// Threshold bands for the three risk factors.
///
/// Bands are listed from the highest threshold down; the first band whose
/// threshold the metric exceeds wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    /// Bands over the HHI (2500 moderately, 5000 highly concentrated)
    pub concentration: Vec<ThresholdBand>,

    /// Bands over liabilities / assets
    pub leverage: Vec<ThresholdBand>,

    /// Bands over locked / assets
    pub illiquidity: Vec<ThresholdBand>,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            concentration: vec![
                ThresholdBand::new(dec!(5000), dec!(0.4)),
                ThresholdBand::new(dec!(2500), dec!(0.2)),
            ],
            leverage: vec![
                ThresholdBand::new(dec!(0.5), dec!(0.3)),
                ThresholdBand::new(dec!(0.2), dec!(0.15)),
            ],
            illiquidity: vec![
                ThresholdBand::new(dec!(0.5), dec!(0.25)),
                ThresholdBand::new(dec!(0.3), dec!(0.10)),
            ],
        }
    }
}

impl RiskRules {
    /// Reject bands that are out of order or contribute outside [0, 1]
    pub fn validate(&self) -> Result<()> {
        for (name, bands) in [
            ("concentration", &self.concentration),
            ("leverage", &self.leverage),
            ("illiquidity", &self.illiquidity),
        ] {
            if bands.windows(2).any(|w| w[0].above <= w[1].above) {
                return Err(RiskError::Config(format!(
                    "{name} bands must be listed by strictly descending threshold"
                )));
            }
            if let Some(band) = bands
                .iter()
                .find(|b| b.contribution < Decimal::ZERO || b.contribution > Decimal::ONE)
            {
                return Err(RiskError::Config(format!(
                    "{name} band above {} contributes {}, expected 0..=1",
                    band.above, band.contribution
                )));
            }
        }
        Ok(())
    }

    /// Compute the three factors for a metric set
    pub fn factors(&self, metrics: &PortfolioMetrics) -> RiskFactors {
        RiskFactors {
            concentration: band_contribution(&self.concentration, metrics.hhi),
            leverage: band_contribution(&self.leverage, metrics.leverage_ratio),
            illiquidity: band_contribution(&self.illiquidity, metrics.illiquidity_ratio),
        }
    }
}

fn band_contribution(bands: &[ThresholdBand], value: Decimal) -> Decimal {
    bands
        .iter()
        .find(|band| value > band.above)
        .map_or(Decimal::ZERO, |band| band.contribution)
}

/// Per-metric risk contributions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    #[serde(with = "rust_decimal::serde::float")]
    pub concentration: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub leverage: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub illiquidity: Decimal,
}

impl RiskFactors {
    /// Sum of the factors, clamped to 1.0
    pub fn score(&self) -> Decimal {
        (self.concentration + self.leverage + self.illiquidity).min(Decimal::ONE)
    }
}
