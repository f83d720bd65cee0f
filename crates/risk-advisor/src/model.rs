//! Domain Models
//!
//! Portfolio snapshot types accepted by the engine and the assessment it
//! returns. Two snapshot shapes are supported: the flat token/DEX/futures
//! lists and the app-balance structure produced by portfolio indexers.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Token sentinel used by the fallback recommendation row
pub const NO_TOKEN: &str = "NONE";

// ============================================================================
// Flat shape
// ============================================================================

/// A spot token held in the wallet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Ticker symbol, stored uppercase (e.g., "ETH", "USDC")
    #[serde(deserialize_with = "uppercase_symbol")]
    pub symbol: String,

    /// Quantity held
    #[serde(default)]
    pub amount: Decimal,

    /// Current value in USD
    pub usd_value: Decimal,
}

impl TokenHolding {
    pub fn new(symbol: impl Into<String>, amount: Decimal, usd_value: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            amount,
            usd_value,
        }
    }
}

fn uppercase_symbol<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|symbol| symbol.to_uppercase())
}

/// A DEX liquidity position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DexPosition {
    /// Position identifier (e.g., NFT id for concentrated liquidity)
    pub id: String,

    /// Pool name (e.g., "ETH-USDC")
    pub pool: String,

    pub token0: String,
    pub token1: String,

    /// Raw liquidity units
    #[serde(default)]
    pub liquidity: Decimal,

    /// Current value in USD
    pub usd_value: Decimal,
}

impl DexPosition {
    pub fn new(
        id: impl Into<String>,
        pool: impl Into<String>,
        token0: impl Into<String>,
        token1: impl Into<String>,
        usd_value: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            pool: pool.into(),
            token0: token0.into(),
            token1: token1.into(),
            liquidity: Decimal::ZERO,
            usd_value,
        }
    }
}

/// A perpetual or dated futures position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuturesPosition {
    pub id: String,

    /// Market name (e.g., "ETH-PERP")
    pub market: String,

    /// Contract quantity
    #[serde(default)]
    pub amount: Decimal,

    /// Leverage multiplier
    #[serde(default = "default_leverage")]
    pub leverage: Decimal,

    /// Position status (e.g., "open")
    #[serde(default)]
    pub status: String,

    /// Margin value in USD (absent in older clients, treated as zero)
    #[serde(default)]
    pub usd_value: Decimal,
}

const fn default_leverage() -> Decimal {
    Decimal::ONE
}

impl FuturesPosition {
    pub fn new(
        id: impl Into<String>,
        market: impl Into<String>,
        leverage: Decimal,
        usd_value: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            market: market.into(),
            amount: Decimal::ZERO,
            leverage,
            status: "open".into(),
            usd_value,
        }
    }
}

// ============================================================================
// App-balance shape
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A token balance as reported by a portfolio indexer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Contract address of the token
    #[serde(default)]
    pub token_address: String,

    pub symbol: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub decimals: Decimal,

    /// Unit price in USD
    #[serde(default)]
    pub price: Decimal,

    /// Token quantity
    #[serde(default)]
    pub balance: Decimal,

    /// Balance value in USD
    pub balance_usd: Decimal,

    #[serde(default)]
    pub network: Network,
}

impl TokenBalance {
    pub fn new(
        token_address: impl Into<String>,
        symbol: impl Into<String>,
        balance_usd: Decimal,
    ) -> Self {
        Self {
            token_address: token_address.into(),
            symbol: symbol.into(),
            name: String::new(),
            decimals: dec!(18),
            price: Decimal::ZERO,
            balance: Decimal::ZERO,
            balance_usd,
            network: Network::default(),
        }
    }
}

/// Wallet token balances
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenBalances {
    #[serde(default)]
    pub total_balance_usd: Decimal,

    #[serde(default)]
    pub by_token: Vec<TokenBalance>,
}

impl TokenBalances {
    /// Build from balances, summing the USD total
    pub fn new(by_token: Vec<TokenBalance>) -> Self {
        let total_balance_usd = by_token.iter().map(|t| t.balance_usd).sum();
        Self {
            total_balance_usd,
            by_token,
        }
    }
}

/// Role of a token inside an app position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetaType {
    Supplied,
    Borrowed,
    Claimable,
    Vesting,
    Locked,
    Nft,
    Wallet,
    /// Anything the indexer reports that the engine does not model
    Other(String),
}

impl MetaType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Supplied => "SUPPLIED",
            Self::Borrowed => "BORROWED",
            Self::Claimable => "CLAIMABLE",
            Self::Vesting => "VESTING",
            Self::Locked => "LOCKED",
            Self::Nft => "NFT",
            Self::Wallet => "WALLET",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for MetaType {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "SUPPLIED" => Self::Supplied,
            "BORROWED" => Self::Borrowed,
            "CLAIMABLE" => Self::Claimable,
            "VESTING" => Self::Vesting,
            "LOCKED" => Self::Locked,
            "NFT" => Self::Nft,
            "WALLET" => Self::Wallet,
            _ => Self::Other(raw),
        }
    }
}

impl From<MetaType> for String {
    fn from(meta: MetaType) -> Self {
        meta.as_str().to_string()
    }
}

/// A token inside a contract position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPosition {
    pub meta_type: MetaType,
    pub token: TokenBalance,
}

impl TokenPosition {
    pub const fn new(meta_type: MetaType, token: TokenBalance) -> Self {
        Self { meta_type, token }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProps {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A position held in one contract of an app (lending market, staking vault...)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractPosition {
    /// Contract address
    pub address: String,

    #[serde(default)]
    pub balance_usd: Decimal,

    #[serde(default)]
    pub tokens: Vec<TokenPosition>,

    #[serde(default)]
    pub display_props: DisplayProps,
}

impl ContractPosition {
    pub fn new(address: impl Into<String>, tokens: Vec<TokenPosition>) -> Self {
        let balance_usd = tokens.iter().map(|t| t.token.balance_usd).sum();
        Self {
            address: address.into(),
            balance_usd,
            tokens,
            display_props: DisplayProps::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub slug: String,
}

/// Positions held in one app on one network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppBalance {
    #[serde(default)]
    pub app: App,

    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub balances: Vec<ContractPosition>,
}

impl AppBalance {
    pub fn new(app: impl Into<String>, balances: Vec<ContractPosition>) -> Self {
        let slug = app.into();
        Self {
            app: App {
                display_name: slug.clone(),
                slug,
            },
            network: Network::default(),
            balances,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppBalances {
    #[serde(default)]
    pub by_app: Vec<AppBalance>,
}

// ============================================================================
// Snapshot
// ============================================================================

/// A normalized portfolio snapshot for one address.
///
/// Every container is optional on the wire so that a missing container can be
/// reported as a validation failure rather than a decoding error. Use
/// [`PortfolioSnapshot::shape`] to resolve which of the two shapes was sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_holdings: Option<Vec<TokenHolding>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex_positions: Option<Vec<DexPosition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub futures_positions: Option<Vec<FuturesPosition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_balances: Option<TokenBalances>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_balances: Option<AppBalances>,
}

/// Resolved view of a snapshot's positions
#[derive(Clone, Copy, Debug)]
pub enum SnapshotShape<'a> {
    Flat {
        holdings: &'a [TokenHolding],
        dex: &'a [DexPosition],
        futures: &'a [FuturesPosition],
    },
    AppBalances {
        tokens: &'a TokenBalances,
        apps: &'a [AppBalance],
    },
}

impl PortfolioSnapshot {
    /// Flat-shape snapshot with spot holdings
    pub fn flat(address: impl Into<String>, holdings: Vec<TokenHolding>) -> Self {
        Self {
            address: Some(address.into()),
            token_holdings: Some(holdings),
            ..Default::default()
        }
    }

    /// App-balance snapshot with wallet token balances
    pub fn app_balances(address: impl Into<String>, token_balances: TokenBalances) -> Self {
        Self {
            address: Some(address.into()),
            token_balances: Some(token_balances),
            app_balances: Some(AppBalances::default()),
            ..Default::default()
        }
    }

    pub fn with_dex_position(mut self, position: DexPosition) -> Self {
        self.dex_positions.get_or_insert_with(Vec::new).push(position);
        self
    }

    pub fn with_futures_position(mut self, position: FuturesPosition) -> Self {
        self.futures_positions.get_or_insert_with(Vec::new).push(position);
        self
    }

    pub fn with_app(mut self, app: AppBalance) -> Self {
        self.app_balances
            .get_or_insert_with(AppBalances::default)
            .by_app
            .push(app);
        self
    }

    /// Owner address, required and non-blank
    pub fn address(&self) -> Result<&str> {
        match self.address.as_deref().map(str::trim) {
            Some(addr) if !addr.is_empty() => Ok(addr),
            _ => Err(RiskError::validation("address is required")),
        }
    }

    /// Resolve which input shape this snapshot uses
    pub fn shape(&self) -> Result<SnapshotShape<'_>> {
        let has_app_shape = self.token_balances.is_some() || self.app_balances.is_some();
        let has_flat_shape = self.token_holdings.is_some()
            || self.dex_positions.is_some()
            || self.futures_positions.is_some();

        match (has_app_shape, has_flat_shape) {
            (true, true) => Err(RiskError::validation(
                "snapshot mixes flat positions with app balances",
            )),
            (true, false) => {
                let tokens = self
                    .token_balances
                    .as_ref()
                    .ok_or_else(|| RiskError::validation("token_balances is required"))?;
                let apps = self
                    .app_balances
                    .as_ref()
                    .map_or(&[][..], |a| a.by_app.as_slice());
                Ok(SnapshotShape::AppBalances { tokens, apps })
            }
            (false, true) => {
                let holdings = self
                    .token_holdings
                    .as_deref()
                    .ok_or_else(|| RiskError::validation("token_holdings is required"))?;
                Ok(SnapshotShape::Flat {
                    holdings,
                    dex: self.dex_positions.as_deref().unwrap_or_default(),
                    futures: self.futures_positions.as_deref().unwrap_or_default(),
                })
            }
            (false, false) => Err(RiskError::validation(
                "snapshot has no token balance container",
            )),
        }
    }
}

// ============================================================================
// Assessment
// ============================================================================

/// Risk assessment returned to the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Tokens to add, in rule order (duplicates preserved)
    pub recommended_tokens: Vec<String>,

    /// Overall risk in [0, 1]
    #[serde(with = "rust_decimal::serde::float")]
    pub risk_score: Decimal,

    /// One reason per fired recommendation rule
    pub reasoning: Vec<String>,
}

impl RiskAssessment {
    /// Assessment returned when evaluation fails for one request
    pub fn degraded(reason: impl std::fmt::Display) -> Self {
        Self {
            recommended_tokens: Vec::new(),
            risk_score: Decimal::ZERO,
            reasoning: vec![format!("Analysis failed: {reason}")],
        }
    }

    /// Recommended tokens with repeats collapsed, first occurrence wins
    pub fn distinct_tokens(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for token in &self.recommended_tokens {
            if !seen.contains(&token.as_str()) {
                seen.push(token.as_str());
            }
        }
        seen
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }
}

/// Coarse risk band for display
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: Decimal) -> Self {
        if score <= dec!(0.3) {
            Self::Low
        } else if score <= dec!(0.6) {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_shape_resolution() {
        let snapshot = PortfolioSnapshot::flat(
            "0xabc",
            vec![TokenHolding::new("eth", dec!(1), dec!(3000))],
        );

        match snapshot.shape().unwrap() {
            SnapshotShape::Flat { holdings, dex, futures } => {
                assert_eq!(holdings.len(), 1);
                assert_eq!(holdings[0].symbol, "ETH");
                assert!(dex.is_empty());
                assert!(futures.is_empty());
            }
            SnapshotShape::AppBalances { .. } => panic!("expected flat shape"),
        }
    }

    #[test]
    fn test_missing_containers_rejected() {
        let empty = PortfolioSnapshot {
            address: Some("0xabc".into()),
            ..Default::default()
        };
        assert!(empty.shape().unwrap_err().is_validation());

        let apps_only = PortfolioSnapshot {
            address: Some("0xabc".into()),
            app_balances: Some(AppBalances::default()),
            ..Default::default()
        };
        assert!(apps_only.shape().unwrap_err().is_validation());

        let dex_only = PortfolioSnapshot {
            address: Some("0xabc".into()),
            dex_positions: Some(Vec::new()),
            ..Default::default()
        };
        assert!(dex_only.shape().unwrap_err().is_validation());
    }

    #[test]
    fn test_mixed_shapes_rejected() {
        let mut snapshot = PortfolioSnapshot::flat("0xabc", Vec::new());
        snapshot.token_balances = Some(TokenBalances::default());
        assert!(snapshot.shape().unwrap_err().is_validation());
    }

    #[test]
    fn test_blank_address_rejected() {
        let snapshot = PortfolioSnapshot::flat("   ", Vec::new());
        assert!(snapshot.address().unwrap_err().is_validation());
    }

    #[test]
    fn test_meta_type_case_insensitive() {
        let meta: MetaType = serde_json::from_str("\"supplied\"").unwrap();
        assert_eq!(meta, MetaType::Supplied);

        let other: MetaType = serde_json::from_str("\"AIRDROP\"").unwrap();
        assert_eq!(other, MetaType::Other("AIRDROP".into()));
        assert_eq!(serde_json::to_string(&MetaType::Borrowed).unwrap(), "\"BORROWED\"");
    }

    #[test]
    fn test_app_balance_snapshot_from_json() {
        let json = r#"{
            "address": "0xabc",
            "token_balances": {
                "total_balance_usd": 1500.5,
                "by_token": [
                    {"token_address": "0x1", "symbol": "USDC", "balance_usd": 1500.5}
                ]
            },
            "app_balances": {
                "by_app": [{
                    "app": {"display_name": "Aave V3", "slug": "aave-v3"},
                    "network": {"name": "Ethereum", "slug": "ethereum"},
                    "balances": [{
                        "address": "0xpool",
                        "balance_usd": 200,
                        "tokens": [
                            {"meta_type": "SUPPLIED", "token": {"symbol": "WETH", "balance_usd": "200"}}
                        ]
                    }]
                }]
            }
        }"#;

        let snapshot: PortfolioSnapshot = serde_json::from_str(json).unwrap();
        match snapshot.shape().unwrap() {
            SnapshotShape::AppBalances { tokens, apps } => {
                assert_eq!(tokens.by_token[0].balance_usd, dec!(1500.5));
                assert_eq!(apps[0].balances[0].tokens[0].meta_type, MetaType::Supplied);
            }
            SnapshotShape::Flat { .. } => panic!("expected app-balance shape"),
        }
    }

    #[test]
    fn test_holding_symbol_uppercased_on_decode() {
        let json = r#"{"symbol": "usdc", "amount": 10, "usd_value": 10}"#;
        let decoded: TokenHolding = serde_json::from_str(json).unwrap();
        assert_eq!(decoded, TokenHolding::new("usdc", dec!(10), dec!(10)));
        assert_eq!(decoded.symbol, "USDC");
    }

    #[test]
    fn test_legacy_futures_without_usd_value() {
        let json = r#"{"id": "1", "market": "ETH-PERP", "amount": 2, "leverage": 3, "status": "open"}"#;
        let position: FuturesPosition = serde_json::from_str(json).unwrap();
        assert_eq!(position.usd_value, Decimal::ZERO);
        assert_eq!(position.leverage, dec!(3));
    }

    #[test]
    fn test_distinct_tokens() {
        let assessment = RiskAssessment {
            recommended_tokens: vec!["USDC".into(), "BTC".into(), "USDC".into()],
            risk_score: dec!(0.5),
            reasoning: Vec::new(),
        };
        assert_eq!(assessment.distinct_tokens(), vec!["USDC", "BTC"]);
        assert_eq!(assessment.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(dec!(0.3)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(dec!(0.45)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(dec!(0.95)), RiskLevel::High);
    }
}
