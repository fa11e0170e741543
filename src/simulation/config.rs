use std::fs;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::market::Side;
use crate::types::{FeedConfig, GameConfig, SettlementConfig};

/// A stake placed by the replay once its round has been open `offset_secs`.
#[derive(Clone, Debug, Deserialize)]
pub struct ScriptedBet {
    pub user: String,
    pub round: u64,
    pub side: Side,
    pub amount: f64,
    #[serde(default)]
    pub offset_secs: u64,
}

fn default_seed() -> u64 {
    42
}

fn default_start() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn default_tick_secs() -> u64 {
    1
}

fn default_auto_claim() -> bool {
    true
}

/// Offline replay loaded from TOML.
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of rounds to settle before stopping.
    pub rounds: u64,
    #[serde(default = "default_start")]
    pub start: DateTime<Utc>,
    /// Virtual seconds between price samples.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Prices fed one per tick instead of the seeded walk; the last value
    /// repeats once the path runs out.
    #[serde(default)]
    pub price_path: Vec<f64>,
    /// Claim every settled round for every player as soon as it settles.
    #[serde(default = "default_auto_claim")]
    pub auto_claim: bool,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub bets: Vec<ScriptedBet>,
}

impl SimulationConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read simulation config file at {path}"))?;
        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to deserialize simulation TOML at {path}"))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PushPolicy;

    #[test]
    fn parse_simulation_config_toml() {
        let toml = r#"
            seed = 7
            rounds = 3
            start = "2024-01-01T00:00:00Z"
            price_path = [1.0, 1.1]

            [game]
            initial_price = 1.0
            round_duration_secs = 10

            [settlement]
            push_policy = "forfeit"
            fee_bps = 250

            [[bets]]
            user = "alice"
            round = 1
            side = "UP"
            amount = 80.0

            [[bets]]
            user = "bob"
            round = 1
            side = "DOWN"
            amount = 70.0
            offset_secs = 4
        "#;

        let cfg: SimulationConfig = toml::from_str(toml).expect("failed to parse simulation config");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.rounds, 3);
        assert_eq!(cfg.tick_secs, 1);
        assert!(cfg.auto_claim);
        assert_eq!(cfg.game.round_duration_secs, 10);
        assert_eq!(cfg.game.initial_asset, "CELO");
        assert_eq!(cfg.settlement.push_policy, PushPolicy::Forfeit);
        assert_eq!(cfg.bets.len(), 2);
        assert_eq!(cfg.bets[1].side, Side::Down);
        assert_eq!(cfg.bets[1].offset_secs, 4);
        assert_eq!(cfg.bets[0].offset_secs, 0);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: SimulationConfig = toml::from_str("rounds = 1").unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.start, DateTime::<Utc>::UNIX_EPOCH);
        assert!(cfg.bets.is_empty());
        assert!(cfg.price_path.is_empty());
    }
}
