use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::market::ledger::{bet_outcome, compute_payout, is_claimable, BetOutcome, SettlementPolicy};
use crate::market::round::{Round, Side};

/// Identity of a player. Opaque; the console uses a display address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserBet {
    pub id: Uuid,
    pub round_id: u64,
    pub side: Side,
    pub amount: f64,
    pub claimed: bool,
    pub placed_at: DateTime<Utc>,
}

/// A finished bet joined with its settled round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BetRecord {
    pub bet: UserBet,
    pub outcome: BetOutcome,
    pub close_price: Option<f64>,
    pub payout: f64,
    pub claimable: bool,
}

/// Leaderboard line for one player.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerStats {
    pub user: UserId,
    pub wins: usize,
    pub total_bets: usize,
    /// Rounded percentage of finished bets that won.
    pub win_rate: u32,
    /// Sum of `payout - stake` over finished bets.
    pub profit: f64,
    pub volume: f64,
}

/// Per-user record of stakes.
///
/// Holds at most one entry per `(user, round, side)`; repeated stakes on the
/// same side of a round accumulate into it.
#[derive(Debug, Default)]
pub struct PositionBook {
    bets: HashMap<UserId, Vec<UserBet>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted stake and return the resulting entry.
    pub fn record_bet(
        &mut self,
        user: &UserId,
        round_id: u64,
        side: Side,
        amount: f64,
        placed_at: DateTime<Utc>,
    ) -> UserBet {
        let entries = self.bets.entry(user.clone()).or_default();
        if let Some(existing) = entries
            .iter_mut()
            .find(|b| b.round_id == round_id && b.side == side)
        {
            existing.amount += amount;
            return existing.clone();
        }

        let bet = UserBet {
            id: Uuid::new_v4(),
            round_id,
            side,
            amount,
            claimed: false,
            placed_at,
        };
        entries.push(bet.clone());
        bet
    }

    /// Flip `claimed` on one entry. Returns false if it was already claimed
    /// or does not exist.
    pub fn mark_claimed(&mut self, user: &UserId, bet_id: Uuid) -> bool {
        let Some(bet) = self
            .bets
            .get_mut(user)
            .and_then(|entries| entries.iter_mut().find(|b| b.id == bet_id))
        else {
            return false;
        };
        if bet.claimed {
            return false;
        }
        bet.claimed = true;
        true
    }

    pub fn bets(&self, user: &UserId) -> &[UserBet] {
        self.bets.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bets_for_round<'a>(
        &'a self,
        user: &UserId,
        round_id: u64,
    ) -> impl Iterator<Item = &'a UserBet> + 'a {
        self.bets(user).iter().filter(move |b| b.round_id == round_id)
    }

    /// Every player's entries for one round.
    pub fn round_bets(&self, round_id: u64) -> impl Iterator<Item = (&UserId, &UserBet)> + '_ {
        self.bets.iter().flat_map(move |(user, entries)| {
            entries
                .iter()
                .filter(move |b| b.round_id == round_id)
                .map(move |b| (user, b))
        })
    }

    /// Finished bets for `user`, most recent round first.
    pub fn history<'a, I>(&self, user: &UserId, archive: I, policy: &SettlementPolicy) -> Vec<BetRecord>
    where
        I: IntoIterator<Item = &'a Round>,
    {
        let rounds: HashMap<u64, &Round> = archive.into_iter().map(|r| (r.id, r)).collect();
        let mut records: Vec<BetRecord> = self
            .bets(user)
            .iter()
            .filter_map(|bet| {
                let round = rounds.get(&bet.round_id)?;
                let outcome = bet_outcome(round, bet.side)?;
                Some(BetRecord {
                    bet: bet.clone(),
                    outcome,
                    close_price: round.close_price,
                    payout: compute_payout(round, bet, policy).net,
                    claimable: is_claimable(round, bet, policy),
                })
            })
            .collect();
        records.sort_by(|a, b| b.bet.round_id.cmp(&a.bet.round_id));
        records
    }

    /// Leaderboard stats for `user`, or `None` before any bet has finished.
    pub fn stats<'a, I>(&self, user: &UserId, archive: I, policy: &SettlementPolicy) -> Option<PlayerStats>
    where
        I: IntoIterator<Item = &'a Round>,
    {
        let finished = self.history(user, archive, policy);
        if finished.is_empty() {
            return None;
        }

        let wins = finished
            .iter()
            .filter(|r| r.outcome == BetOutcome::Won)
            .count();
        let volume: f64 = finished.iter().map(|r| r.bet.amount).sum();
        let profit: f64 = finished.iter().map(|r| r.payout - r.bet.amount).sum();
        let win_rate = ((wins as f64 / finished.len() as f64) * 100.0).round() as u32;

        Some(PlayerStats {
            user: user.clone(),
            wins,
            total_bets: finished.len(),
            win_rate,
            profit,
            volume,
        })
    }
}
