//! Fact Extraction
//!
//! Normalizes either snapshot shape into one flat list of typed facts. The
//! evaluator only ever reasons over facts, which is what lets both shapes
//! share the same rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::metrics;
use crate::model::{
    AppBalance, DexPosition, FuturesPosition, MetaType, PortfolioSnapshot, SnapshotShape,
    TokenBalances, TokenHolding,
};

/// Kind of position a fact describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Holding,
    Dex,
    Futures,
    Supplied,
    Borrowed,
    Locked,
    Claimable,
}

impl FactCategory {
    /// Counts toward total assets (everything except debt)
    pub const fn is_asset(self) -> bool {
        !matches!(self, Self::Borrowed)
    }

    pub const fn is_liability(self) -> bool {
        matches!(self, Self::Borrowed)
    }

    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Category for an app-position token, if the risk model tracks it
    pub fn from_meta_type(meta: &MetaType) -> Option<Self> {
        match meta {
            MetaType::Supplied => Some(Self::Supplied),
            MetaType::Borrowed => Some(Self::Borrowed),
            MetaType::Locked => Some(Self::Locked),
            MetaType::Claimable => Some(Self::Claimable),
            MetaType::Vesting | MetaType::Nft | MetaType::Wallet | MetaType::Other(_) => None,
        }
    }
}

/// One normalized portfolio position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub category: FactCategory,

    /// Owner address
    pub address: String,

    /// Token address, position id or symbol identifying the instrument
    pub instrument_id: String,

    /// Human-readable label (symbol, pool or market)
    pub label: String,

    pub value_usd: Decimal,
}

impl Fact {
    pub fn new(
        category: FactCategory,
        address: impl Into<String>,
        instrument_id: impl Into<String>,
        label: impl Into<String>,
        value_usd: Decimal,
    ) -> Self {
        Self {
            category,
            address: address.into(),
            instrument_id: instrument_id.into(),
            label: label.into(),
            value_usd,
        }
    }
}

/// Extract facts and the asset total from a snapshot.
///
/// The snapshot is only borrowed. Empty position lists produce no facts and a
/// zero total.
pub fn extract_facts(snapshot: &PortfolioSnapshot) -> Result<(Vec<Fact>, Decimal)> {
    let address = snapshot.address()?;

    let facts = match snapshot.shape()? {
        SnapshotShape::Flat {
            holdings,
            dex,
            futures,
        } => extract_flat(address, holdings, dex, futures),
        SnapshotShape::AppBalances { tokens, apps } => extract_app_balances(address, tokens, apps),
    };

    if let Some(bad) = facts.iter().find(|f| f.value_usd < Decimal::ZERO) {
        return Err(RiskError::validation(format!(
            "negative usd value {} for {}",
            bad.value_usd, bad.label
        )));
    }

    let total_assets = metrics::total_assets(facts.iter())?;

    tracing::debug!(
        address,
        facts = facts.len(),
        %total_assets,
        "extracted portfolio facts"
    );

    Ok((facts, total_assets))
}

fn extract_flat(
    address: &str,
    holdings: &[TokenHolding],
    dex: &[DexPosition],
    futures: &[FuturesPosition],
) -> Vec<Fact> {
    let holdings = holdings.iter().map(|h| {
        Fact::new(FactCategory::Holding, address, &h.symbol, &h.symbol, h.usd_value)
    });
    let dex = dex
        .iter()
        .map(|d| Fact::new(FactCategory::Dex, address, &d.id, &d.pool, d.usd_value));
    let futures = futures.iter().map(|f| {
        Fact::new(FactCategory::Futures, address, &f.id, &f.market, f.usd_value)
    });

    holdings.chain(dex).chain(futures).collect()
}

fn extract_app_balances(address: &str, tokens: &TokenBalances, apps: &[AppBalance]) -> Vec<Fact> {
    let mut facts: Vec<Fact> = tokens
        .by_token
        .iter()
        .map(|t| {
            Fact::new(
                FactCategory::Holding,
                address,
                &t.token_address,
                &t.symbol,
                t.balance_usd,
            )
        })
        .collect();

    let positions = apps
        .iter()
        .flat_map(|app| &app.balances)
        .flat_map(|contract| &contract.tokens);

    for position in positions {
        // Vesting, NFT and wallet entries are not part of the risk model
        let Some(category) = FactCategory::from_meta_type(&position.meta_type) else {
            continue;
        };
        facts.push(Fact::new(
            category,
            address,
            &position.token.token_address,
            &position.token.symbol,
            position.token.balance_usd,
        ));
    }

    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AppBalance, ContractPosition, DexPosition, FuturesPosition, TokenBalance, TokenPosition,
    };
    use rust_decimal_macros::dec;

    fn position(meta: MetaType, address: &str, symbol: &str, usd: Decimal) -> TokenPosition {
        TokenPosition::new(meta, TokenBalance::new(address, symbol, usd))
    }

    fn lending_app() -> AppBalance {
        AppBalance::new(
            "aave-v3",
            vec![ContractPosition::new(
                "0xpool",
                vec![
                    position(MetaType::Supplied, "0xweth", "WETH", dec!(5000)),
                    position(MetaType::Borrowed, "0xusdc", "USDC", dec!(2000)),
                    position(MetaType::Locked, "0xcrv", "veCRV", dec!(1000)),
                    position(MetaType::Claimable, "0xaave", "AAVE", dec!(50)),
                    position(MetaType::Vesting, "0xv", "VEST", dec!(999)),
                    position(MetaType::Nft, "0xn", "NFT", dec!(999)),
                    position(MetaType::Wallet, "0xw", "W", dec!(999)),
                ],
            )],
        )
    }

    #[test]
    fn test_flat_extraction() {
        let snapshot = PortfolioSnapshot::flat(
            "0xabc",
            vec![
                TokenHolding::new("ETH", dec!(1.2), dec!(3000)),
                TokenHolding::new("USDC", dec!(1000), dec!(1000)),
            ],
        )
        .with_dex_position(DexPosition::new("1", "ETH-USDC", "ETH", "USDC", dec!(500)))
        .with_futures_position(FuturesPosition::new("1", "ETH-PERP", dec!(3), dec!(1200)));

        let (facts, total) = extract_facts(&snapshot).unwrap();

        assert_eq!(facts.len(), 4);
        assert_eq!(total, dec!(5700));
        assert_eq!(facts[2].category, FactCategory::Dex);
        assert_eq!(facts[2].label, "ETH-USDC");
        assert_eq!(facts[3].category, FactCategory::Futures);
        assert!(facts.iter().all(|f| f.address == "0xabc"));
    }

    #[test]
    fn test_app_balance_extraction_filters_meta_types() {
        let tokens = TokenBalances::new(vec![TokenBalance::new("0xeth", "ETH", dec!(3000))]);
        let snapshot = PortfolioSnapshot::app_balances("0xabc", tokens).with_app(lending_app());

        let (facts, total) = extract_facts(&snapshot).unwrap();

        let categories: Vec<_> = facts.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![
                FactCategory::Holding,
                FactCategory::Supplied,
                FactCategory::Borrowed,
                FactCategory::Locked,
                FactCategory::Claimable,
            ]
        );
        // borrowed 2000 and ignored meta types stay out of the total
        assert_eq!(total, dec!(9050));
    }

    #[test]
    fn test_empty_snapshot_yields_no_facts() {
        let snapshot = PortfolioSnapshot::app_balances("0xabc", TokenBalances::default());
        let (facts, total) = extract_facts(&snapshot).unwrap();
        assert!(facts.is_empty());
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_missing_address_rejected() {
        let mut snapshot = PortfolioSnapshot::flat("0xabc", Vec::new());
        snapshot.address = None;
        assert!(extract_facts(&snapshot).unwrap_err().is_validation());
    }

    #[test]
    fn test_negative_value_rejected() {
        let snapshot = PortfolioSnapshot::flat(
            "0xabc",
            vec![TokenHolding::new("ETH", dec!(1), dec!(-5))],
        );
        assert!(extract_facts(&snapshot).unwrap_err().is_validation());
    }

    #[test]
    fn test_total_overflow_is_evaluation_error() {
        let snapshot = PortfolioSnapshot::flat(
            "0xabc",
            vec![
                TokenHolding::new("A", dec!(1), Decimal::MAX),
                TokenHolding::new("B", dec!(1), Decimal::MAX),
            ],
        );
        let err = extract_facts(&snapshot).unwrap_err();
        assert!(matches!(err, RiskError::Evaluation(_)));
    }

    #[test]
    fn test_snapshot_not_mutated() {
        let snapshot = PortfolioSnapshot::flat(
            "0xabc",
            vec![TokenHolding::new("ETH", dec!(1), dec!(3000))],
        );
        let before = snapshot.clone();
        let _ = extract_facts(&snapshot).unwrap();
        assert_eq!(snapshot, before);
    }
}
