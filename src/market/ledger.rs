//! Pool accounting and pari-mutuel settlement.
//!
//! Winners split the whole pool (both sides) in proportion to their stake in
//! the winning side. What a push pays and whether a treasury fee is taken are
//! decided by [`SettlementPolicy`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::market::book::UserBet;
use crate::market::error::{GameError, GameResult};
use crate::market::round::{Round, Side};
use crate::types::{PushPolicy, SettlementConfig};
use crate::utils::math::{fee_for, pari_mutuel_payout};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementPolicy {
    pub push: PushPolicy,
    pub fee_bps: u32,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            push: PushPolicy::Refund,
            fee_bps: 0,
        }
    }
}

impl From<&SettlementConfig> for SettlementPolicy {
    fn from(cfg: &SettlementConfig) -> Self {
        Self {
            push: cfg.push_policy,
            fee_bps: cfg.fee_bps,
        }
    }
}

/// How a finished bet turned out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetOutcome {
    Won,
    Lost,
    Push,
}

/// Amount owed for one bet. `net = gross - fee`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Payout {
    pub gross: f64,
    pub fee: f64,
    pub net: f64,
}

impl Payout {
    fn no_fee(amount: f64) -> Self {
        Self {
            gross: amount,
            fee: 0.0,
            net: amount,
        }
    }
}

/// Reject anything that is not a finite, strictly positive stake.
pub fn validate_amount(amount: f64) -> GameResult<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(GameError::InvalidAmount(amount))
    }
}

/// Add `amount` to `side` of `round`.
///
/// Balance checks belong to the caller; this only guards the amount and the
/// round's stake window.
pub fn stake(round: &mut Round, side: Side, amount: f64, now: DateTime<Utc>) -> GameResult<()> {
    validate_amount(amount)?;
    if !round.accepts_stakes(now) {
        return Err(GameError::RoundClosed(round.id));
    }
    round.add_to_pool(side, amount);
    Ok(())
}

/// Outcome of a stake on `side`, or `None` while the round is still open.
pub fn bet_outcome(round: &Round, side: Side) -> Option<BetOutcome> {
    if !round.is_ended() {
        return None;
    }
    Some(match round.winner {
        None => BetOutcome::Push,
        Some(w) if w == side => BetOutcome::Won,
        Some(_) => BetOutcome::Lost,
    })
}

/// Payout owed to `bet` under `policy`. Zero for open rounds and losing bets.
pub fn compute_payout(round: &Round, bet: &UserBet, policy: &SettlementPolicy) -> Payout {
    match bet_outcome(round, bet.side) {
        Some(BetOutcome::Won) => {
            let gross = pari_mutuel_payout(bet.amount, round.pool(bet.side), round.total_pool());
            let fee = fee_for(gross, policy.fee_bps);
            Payout {
                gross,
                fee,
                net: gross - fee,
            }
        }
        Some(BetOutcome::Push) => match policy.push {
            PushPolicy::Refund => Payout::no_fee(bet.amount),
            PushPolicy::Forfeit => Payout::default(),
        },
        Some(BetOutcome::Lost) | None => Payout::default(),
    }
}

/// Whether `bet` may be claimed right now.
pub fn is_claimable(round: &Round, bet: &UserBet, policy: &SettlementPolicy) -> bool {
    if bet.claimed || bet.round_id != round.id {
        return false;
    }
    match bet_outcome(round, bet.side) {
        Some(BetOutcome::Won) => true,
        Some(BetOutcome::Push) => policy.push == PushPolicy::Refund,
        Some(BetOutcome::Lost) | None => false,
    }
}
