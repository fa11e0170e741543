use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::math::{implied_multiplier, pool_share_pct};
use crate::utils::time::add_secs;

/// Side of a round a player can stake on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Up,
    Down,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Up => "UP",
            Side::Down => "DOWN",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "higher" => Ok(Side::Up),
            "down" | "lower" => Ok(Side::Down),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundStatus {
    /// Accepting stakes.
    Live,
    /// Past `lock_time`, waiting for `close_time`; stakes refused.
    Locked,
    /// Settled and archived; immutable from here on.
    Ended,
}

/// Winning side for a round that opened at `start` and closed at `close`.
///
/// `None` is a push.
pub fn resolve_winner(start: f64, close: f64) -> Option<Side> {
    if close > start {
        Some(Side::Up)
    } else if close < start {
        Some(Side::Down)
    } else {
        None
    }
}

/// One timed betting cycle.
///
/// Pools are only reachable through [`crate::market::ledger::stake`], so the
/// total is always the sum of both sides.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Round {
    pub id: u64,
    pub start_time: DateTime<Utc>,
    pub lock_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub start_price: f64,
    pub close_price: Option<f64>,
    up_pool: f64,
    down_pool: f64,
    pub status: RoundStatus,
    pub winner: Option<Side>,
}

impl Round {
    /// Open a new live round. `lock_window_secs` is clamped so that
    /// `start_time <= lock_time <= close_time`.
    pub fn open(
        id: u64,
        start_time: DateTime<Utc>,
        start_price: f64,
        duration_secs: u64,
        lock_window_secs: u64,
    ) -> Self {
        let close_time = add_secs(start_time, duration_secs);
        let lock_time = add_secs(start_time, duration_secs.saturating_sub(lock_window_secs));
        Self {
            id,
            start_time,
            lock_time,
            close_time,
            start_price,
            close_price: None,
            up_pool: 0.0,
            down_pool: 0.0,
            status: RoundStatus::Live,
            winner: None,
        }
    }

    pub fn up_pool(&self) -> f64 {
        self.up_pool
    }

    pub fn down_pool(&self) -> f64 {
        self.down_pool
    }

    pub fn pool(&self, side: Side) -> f64 {
        match side {
            Side::Up => self.up_pool,
            Side::Down => self.down_pool,
        }
    }

    pub fn total_pool(&self) -> f64 {
        self.up_pool + self.down_pool
    }

    pub fn is_ended(&self) -> bool {
        self.status == RoundStatus::Ended
    }

    /// True while stakes are accepted at `now`.
    pub fn accepts_stakes(&self, now: DateTime<Utc>) -> bool {
        self.status == RoundStatus::Live && now < self.lock_time
    }

    pub(crate) fn add_to_pool(&mut self, side: Side, amount: f64) {
        match side {
            Side::Up => self.up_pool += amount,
            Side::Down => self.down_pool += amount,
        }
    }

    pub(crate) fn lock(&mut self) {
        if self.status == RoundStatus::Live {
            self.status = RoundStatus::Locked;
        }
    }

    pub(crate) fn settle(&mut self, close_price: f64) {
        self.close_price = Some(close_price);
        self.winner = resolve_winner(self.start_price, close_price);
        self.status = RoundStatus::Ended;
    }
}

/// Read-only projection of a round handed to renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundView {
    pub id: u64,
    pub status: RoundStatus,
    pub start_time: DateTime<Utc>,
    pub lock_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub start_price: f64,
    pub close_price: Option<f64>,
    pub up_pool: f64,
    pub down_pool: f64,
    pub total_pool: f64,
    pub up_pct: f64,
    pub down_pct: f64,
    pub up_multiplier: f64,
    pub down_multiplier: f64,
    pub winner: Option<Side>,
}

impl From<&Round> for RoundView {
    fn from(r: &Round) -> Self {
        let total = r.total_pool();
        Self {
            id: r.id,
            status: r.status,
            start_time: r.start_time,
            lock_time: r.lock_time,
            close_time: r.close_time,
            start_price: r.start_price,
            close_price: r.close_price,
            up_pool: r.up_pool,
            down_pool: r.down_pool,
            total_pool: total,
            up_pct: pool_share_pct(r.up_pool, total),
            down_pct: pool_share_pct(r.down_pool, total),
            up_multiplier: implied_multiplier(r.up_pool, total),
            down_multiplier: implied_multiplier(r.down_pool, total),
            winner: r.winner,
        }
    }
}
