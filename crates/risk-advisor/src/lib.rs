//! # risk-advisor
//!
//! Rule-based risk scoring for crypto portfolios: spot holdings, DEX liquidity,
//! futures, lending/borrowing and locked or claimable balances.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │   Snapshot   │──►│    Facts    │──►│     Metrics      │──►│ Risk score  │
//! │ (flat / app) │   │ (7 kinds)   │   │ assets, HHI,     │   │   [0, 1]    │
//! └──────────────┘   └─────────────┘   │ leverage, locked │   └─────────────┘
//!                                      └────────┬─────────┘
//!                                               └──────────►  Recommendations
//! ```
//!
//! ## Scoring
//!
//! | Metric            | Medium band      | High band        |
//! |-------------------|------------------|------------------|
//! | HHI               | > 2500 → 0.20    | > 5000 → 0.40    |
//! | Leverage ratio    | > 0.2  → 0.15    | > 0.5  → 0.30    |
//! | Illiquidity ratio | > 0.3  → 0.10    | > 0.5  → 0.25    |
//!
//! The score is the sum of the three factors, capped at 1.0.
//!
//! ## Example
//!
//! ```
//! use risk_advisor::{PortfolioSnapshot, RiskEngine, TokenHolding};
//! use rust_decimal_macros::dec;
//!
//! let snapshot = PortfolioSnapshot::flat(
//!     "0x1234",
//!     vec![
//!         TokenHolding::new("ETH", dec!(1.2), dec!(3000)),
//!         TokenHolding::new("USDC", dec!(1000), dec!(1000)),
//!     ],
//! );
//!
//! let assessment = RiskEngine::default().assess(&snapshot);
//! assert_eq!(assessment.risk_score, dec!(0.4));
//! assert_eq!(assessment.recommended_tokens, vec!["USDC"]);
//! ```

pub mod engine;
pub mod error;
pub mod facts;
pub mod metrics;
pub mod model;
pub mod recommend;
pub mod scoring;

pub use engine::{assess_snapshot, Evaluation, FactStore, RiskEngine, RiskReport, RuleBook};
pub use error::{Result, RiskError};
pub use facts::{extract_facts, Fact, FactCategory};
pub use metrics::{Metric, PortfolioMetrics};
pub use model::{
    AppBalance, AppBalances, ContractPosition, DexPosition, FuturesPosition, MetaType,
    PortfolioSnapshot, RiskAssessment, RiskLevel, SnapshotShape, TokenBalance, TokenBalances,
    TokenHolding, TokenPosition,
};
pub use recommend::{Recommendation, RecommendationRule, RecommendationTable};
pub use scoring::{RiskFactors, RiskRules, ThresholdBand};
