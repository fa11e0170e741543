use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};

/// Where live prices come from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Poll the external price source, falling back to the synthetic walk on failure.
    Live,
    /// Never touch the network; drive prices from the synthetic walk only.
    Synthetic,
}

/// What happens to stakes when a round closes exactly at its start price.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PushPolicy {
    /// Every bet in the round can claim back its own stake.
    Refund,
    /// Nobody can claim; stakes stay in the round.
    Forfeit,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetCategory {
    Major,
    Volatile,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetConfig {
    pub symbol: String,
    pub name: String,
    /// Identifier used by the CoinGecko `simple/price` endpoint.
    pub coingecko_id: String,
    pub category: AssetCategory,
}

impl AssetConfig {
    fn new(symbol: &str, name: &str, coingecko_id: &str, category: AssetCategory) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            coingecko_id: coingecko_id.to_string(),
            category,
        }
    }
}

/// Built-in asset catalog used when the config file lists none.
pub fn default_assets() -> Vec<AssetConfig> {
    use AssetCategory::{Major, Volatile};
    vec![
        AssetConfig::new("CELO", "Celo Native", "celo", Major),
        AssetConfig::new("BTC", "Bitcoin", "bitcoin", Major),
        AssetConfig::new("ETH", "Ethereum", "ethereum", Major),
        AssetConfig::new("SOL", "Solana", "solana", Volatile),
        AssetConfig::new("DOGE", "Dogecoin", "dogecoin", Volatile),
        AssetConfig::new("PEPE", "Pepe", "pepe", Volatile),
        AssetConfig::new("WIF", "dogwifhat", "dogwifhat", Volatile),
        AssetConfig::new("SHIB", "Shiba Inu", "shiba-inu", Volatile),
        AssetConfig::new("BONK", "Bonk", "bonk", Volatile),
        AssetConfig::new("FLOKI", "Floki", "floki", Volatile),
    ]
}

/// Round duration presets offered to players, in seconds.
pub const DURATION_PRESETS: [(&str, u64); 8] = [
    ("30s", 30),
    ("5m", 300),
    ("15m", 900),
    ("1h", 3_600),
    ("4h", 14_400),
    ("1d", 86_400),
    ("1w", 604_800),
    ("1y", 31_536_000),
];

/// Longest round a player may select.
pub const MAX_ROUND_DURATION_SECS: u64 = 31_536_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Identity of the local player driving the console.
    pub player: String,
    pub initial_balance: f64,
    pub initial_asset: String,
    /// Seed price for the first round and the startup history.
    pub initial_price: f64,
    pub round_duration_secs: u64,
    pub history_cap: usize,
    pub backfill_points: usize,
    pub backfill_spacing_secs: i64,
    /// Per-step bound of the startup history walk, as a fraction of price.
    pub startup_backfill_volatility: f64,
    /// Per-step bound of the walk generated after an asset switch.
    pub switch_backfill_volatility: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player: "0x12...8B4".to_string(),
            initial_balance: 1_000.0,
            initial_asset: "CELO".to_string(),
            initial_price: 0.65,
            round_duration_secs: 30,
            history_cap: 60,
            backfill_points: 40,
            backfill_spacing_secs: 2,
            startup_backfill_volatility: 0.002,
            switch_backfill_volatility: 0.003,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub push_policy: PushPolicy,
    /// Treasury fee deducted from winning payouts, in basis points.
    pub fee_bps: u32,
    /// Seconds before close during which stakes are refused.
    pub lock_window_secs: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            push_policy: PushPolicy::Refund,
            fee_bps: 0,
            lock_window_secs: 0,
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub mode: FeedMode,
    pub base_url: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout_ms: Duration,
    /// Poll cadence against the live source; kept slow for rate limits.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub live_interval_secs: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub synthetic_interval_secs: Duration,
    /// Per-step bound of the synthetic live walk, as a fraction of price.
    pub synthetic_volatility: f64,
    pub price_floor: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            mode: FeedMode::Live,
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_ms: Duration::from_millis(5_000),
            live_interval_secs: Duration::from_secs(10),
            synthetic_interval_secs: Duration::from_secs(1),
            synthetic_volatility: 0.0005,
            price_floor: 0.01,
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub base_url: String,
    pub model: String,
    /// Falls back to `GEMINI_API_KEY`; without a key analysis is simulated.
    pub api_key: Option<String>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout_ms: Duration,
    pub history_points: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            timeout_ms: Duration::from_millis(15_000),
            history_points: 15,
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub health_addr: Option<String>,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub dashboard_period_secs: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub max_staleness_secs: Duration,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            health_addr: None,
            dashboard_period_secs: Duration::from_secs(10),
            max_staleness_secs: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub settlement: SettlementConfig,
    pub feed: FeedConfig,
    pub sentiment: SentimentConfig,
    pub monitoring: MonitoringConfig,
    pub assets: Vec<AssetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            settlement: SettlementConfig::default(),
            feed: FeedConfig::default(),
            sentiment: SentimentConfig::default(),
            monitoring: MonitoringConfig::default(),
            assets: default_assets(),
        }
    }
}

impl AppConfig {
    /// Load the TOML file at `path` (optional) with `PULSE__SECTION__KEY`
    /// environment overrides layered on top.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(Path::new(path)).required(false))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read config at {path}"))?;

        let mut cfg: Self = settings
            .try_deserialize()
            .with_context(|| format!("failed to deserialize config at {path}"))?;

        if cfg.sentiment.api_key.is_none() {
            cfg.sentiment.api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if cfg.assets.is_empty() {
            cfg.assets = default_assets();
        }
        Ok(cfg)
    }

    pub fn asset(&self, symbol: &str) -> Option<&AssetConfig> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }
}
