use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use crate::market::{ClaimReceipt, GameController, GameError, GameResult, Round, RoundEvent, Side, UserId};
use crate::simulation::config::{ScriptedBet, SimulationConfig};
use crate::types::AppConfig;
use crate::utils::time::add_secs;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedBet {
    pub user: String,
    pub round: u64,
    pub side: Side,
    pub amount: f64,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulatedClaim {
    pub user: String,
    pub receipt: ClaimReceipt,
}

#[derive(Clone, Debug)]
pub struct SimulationResult {
    /// Settled rounds in settlement order.
    pub rounds: Vec<Round>,
    pub bets_placed: usize,
    pub rejected: Vec<RejectedBet>,
    pub claims: Vec<SimulatedClaim>,
    pub balances: BTreeMap<String, f64>,
    pub treasury: f64,
    pub final_price: f64,
    pub finished_at: DateTime<Utc>,
}

impl SimulationResult {
    pub fn total_claimed(&self) -> f64 {
        self.claims.iter().map(|c| c.receipt.amount).sum()
    }

    pub fn wins(&self, side: Side) -> usize {
        self.rounds.iter().filter(|r| r.winner == Some(side)).count()
    }

    pub fn pushes(&self) -> usize {
        self.rounds.iter().filter(|r| r.winner.is_none()).count()
    }
}

struct Script<'a> {
    bets: Vec<&'a ScriptedBet>,
    cursor: usize,
}

impl<'a> Script<'a> {
    fn new(bets: &'a [ScriptedBet]) -> Self {
        let mut bets: Vec<&ScriptedBet> = bets.iter().collect();
        bets.sort_by_key(|b| (b.round, b.offset_secs));
        Self { bets, cursor: 0 }
    }

    /// Next bet that is due at `now`, given the live round.
    fn next_due(&mut self, current: &Round, now: DateTime<Utc>) -> Option<&'a ScriptedBet> {
        let bet = *self.bets.get(self.cursor)?;
        if bet.round > current.id {
            return None;
        }
        if bet.round == current.id && now < add_secs(current.start_time, bet.offset_secs) {
            return None;
        }
        self.cursor += 1;
        Some(bet)
    }
}

/// Deterministically replay `cfg` on a virtual clock.
///
/// Given the same config the result is identical: all randomness flows from
/// `cfg.seed` and time only advances in `tick_secs` steps.
pub fn run_simulation(cfg: &SimulationConfig) -> GameResult<SimulationResult> {
    let app = AppConfig {
        game: cfg.game.clone(),
        settlement: cfg.settlement.clone(),
        feed: cfg.feed.clone(),
        ..AppConfig::default()
    };
    let mut game = GameController::new(&app, cfg.start, StdRng::seed_from_u64(cfg.seed))?;

    let users: BTreeSet<&str> = cfg.bets.iter().map(|b| b.user.as_str()).collect();
    for user in &users {
        game.open_account(&UserId::new(*user));
    }

    let step = Duration::seconds(cfg.tick_secs.max(1) as i64);
    let mut now = cfg.start;
    let mut tick = 0usize;
    let mut script = Script::new(&cfg.bets);
    let mut rounds = Vec::new();
    let mut bets_placed = 0usize;
    let mut rejected = Vec::new();
    let mut claims = Vec::new();

    let mut place_due = |game: &mut GameController, now: DateTime<Utc>| {
        while let Some(bet) = script.next_due(game.current_round(), now) {
            let user = UserId::new(bet.user.clone());
            let result = if bet.round < game.current_round().id {
                Err(GameError::RoundClosed(bet.round))
            } else {
                game.place_bet(&user, bet.side, bet.amount, now)
            };
            match result {
                Ok(_) => bets_placed += 1,
                Err(err) => rejected.push(RejectedBet {
                    user: bet.user.clone(),
                    round: bet.round,
                    side: bet.side,
                    amount: bet.amount,
                    reason: err.to_string(),
                }),
            }
        }
    };

    place_due(&mut game, now);
    while (rounds.len() as u64) < cfg.rounds {
        now += step;
        if cfg.price_path.is_empty() {
            game.simulate_price(now);
        } else {
            let idx = tick.min(cfg.price_path.len() - 1);
            game.observe_price(cfg.price_path[idx], now)?;
        }
        tick += 1;

        if let Some(RoundEvent::Settled { settled, .. }) = game.tick(now) {
            debug!(target: "simulation", round_id = settled.id, "round settled");
            if cfg.auto_claim {
                let bettors: BTreeSet<String> = game
                    .book()
                    .round_bets(settled.id)
                    .map(|(user, _)| user.as_str().to_string())
                    .collect();
                for user in bettors {
                    match game.claim(&UserId::new(user.clone()), settled.id) {
                        Ok(receipt) => claims.push(SimulatedClaim { user, receipt }),
                        Err(GameError::NothingToClaim(_)) => {}
                        Err(err) => return Err(err),
                    }
                }
            }
            rounds.push(settled);
        }

        place_due(&mut game, now);
    }

    let balances = users
        .iter()
        .map(|u| (u.to_string(), game.balance(&UserId::new(*u))))
        .collect();

    Ok(SimulationResult {
        rounds,
        bets_placed,
        rejected,
        claims,
        balances,
        treasury: game.treasury(),
        final_price: game.last_price(),
        finished_at: now,
    })
}
