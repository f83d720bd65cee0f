//! Property tests for the risk engine

use proptest::prelude::*;
use risk_advisor::{
    AppBalance, ContractPosition, MetaType, PortfolioSnapshot, RiskEngine, TokenBalance,
    TokenBalances, TokenHolding, TokenPosition,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn usd() -> impl Strategy<Value = Decimal> {
    (0u64..5_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn meta_type() -> impl Strategy<Value = MetaType> {
    prop_oneof![
        Just(MetaType::Supplied),
        Just(MetaType::Borrowed),
        Just(MetaType::Locked),
        Just(MetaType::Claimable),
        Just(MetaType::Vesting),
        Just(MetaType::Nft),
        Just(MetaType::Wallet),
    ]
}

prop_compose! {
    fn app_snapshot()(
        wallet in prop::collection::vec(usd(), 0..6),
        positions in prop::collection::vec((meta_type(), usd()), 0..8),
    ) -> PortfolioSnapshot {
        let tokens = TokenBalances::new(
            wallet
                .into_iter()
                .enumerate()
                .map(|(i, v)| TokenBalance::new(format!("0x{i}"), format!("T{i}"), v))
                .collect(),
        );
        let contract = ContractPosition::new(
            "0xpool",
            positions
                .into_iter()
                .enumerate()
                .map(|(i, (meta, v))| {
                    let token = TokenBalance::new(format!("0xa{i}"), format!("A{i}"), v);
                    TokenPosition::new(meta, token)
                })
                .collect(),
        );
        PortfolioSnapshot::app_balances("0xprop", tokens)
            .with_app(AppBalance::new("lending", vec![contract]))
    }
}

fn flat(values: &[Decimal]) -> PortfolioSnapshot {
    PortfolioSnapshot::flat(
        "0xprop",
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TokenHolding::new(format!("T{i}"), Decimal::ONE, *v))
            .collect(),
    )
}

proptest! {
    #[test]
    fn risk_score_stays_in_unit_interval(snapshot in app_snapshot()) {
        let assessment = RiskEngine::default().assess(&snapshot);
        prop_assert!(assessment.risk_score >= Decimal::ZERO);
        prop_assert!(assessment.risk_score <= Decimal::ONE);
    }

    #[test]
    fn fallback_never_mixes_with_risk_rows(snapshot in app_snapshot()) {
        let assessment = RiskEngine::default().assess(&snapshot);
        let balanced = assessment.reasoning.iter().any(|r| r.contains("balanced"));
        if balanced {
            prop_assert_eq!(assessment.reasoning.len(), 1);
            prop_assert!(assessment.recommended_tokens.is_empty());
        } else {
            prop_assert_eq!(assessment.recommended_tokens.len(), assessment.reasoning.len());
        }
    }

    #[test]
    fn independent_engines_agree(snapshot in app_snapshot()) {
        let first = RiskEngine::default().assess(&snapshot);
        let second = RiskEngine::default().assess(&snapshot);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn growing_largest_holding_never_lowers_hhi(
        values in prop::collection::vec(1u64..1_000_000u64, 1..8),
        bump in 1u64..1_000_000u64,
    ) {
        let values: Vec<Decimal> = values.into_iter().map(Decimal::from).collect();
        let largest = values
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| **v)
            .map(|(i, _)| i)
            .unwrap();

        let mut bumped = values.clone();
        bumped[largest] += Decimal::from(bump);

        let engine = RiskEngine::default();
        let before = engine.evaluate(&flat(&values)).unwrap().metrics.hhi;
        let after = engine.evaluate(&flat(&bumped)).unwrap().metrics.hhi;
        prop_assert!(after >= before - dec!(0.000001), "hhi fell from {} to {}", before, after);
    }
}

#[test]
fn zero_assets_only_yield_fallback() {
    let engine = RiskEngine::default();
    let evaluation = engine.evaluate(&flat(&[Decimal::ZERO, Decimal::ZERO])).unwrap();

    assert_eq!(evaluation.metrics.total_assets, Decimal::ZERO);
    assert_eq!(evaluation.metrics.hhi, Decimal::ZERO);
    assert_eq!(evaluation.metrics.leverage_ratio, Decimal::ZERO);
    assert_eq!(evaluation.metrics.illiquidity_ratio, Decimal::ZERO);

    let assessment = evaluation.assessment();
    assert_eq!(assessment.risk_score, Decimal::ZERO);
    assert!(assessment.recommended_tokens.is_empty());
    assert_eq!(assessment.reasoning.len(), 1);
    assert!(assessment.reasoning[0].contains("balanced"));
}
