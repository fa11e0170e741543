use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::market::round::{Round, RoundStatus, Side};

/// State change produced by [`RoundEngine::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum RoundEvent {
    /// The live round passed its lock time and stopped taking stakes.
    Locked { round_id: u64 },
    /// The round closed; `settled` is the archived copy, `next_id` its successor.
    Settled { settled: Round, next_id: u64 },
}

/// Owns the current round and the archive of settled rounds.
#[derive(Debug)]
pub struct RoundEngine {
    current: Round,
    archive: VecDeque<Round>,
    lock_window_secs: u64,
}

impl RoundEngine {
    /// Start with round 1 opened at `now`.
    pub fn new(now: DateTime<Utc>, start_price: f64, duration_secs: u64, lock_window_secs: u64) -> Self {
        Self {
            current: Round::open(1, now, start_price, duration_secs, lock_window_secs),
            archive: VecDeque::new(),
            lock_window_secs,
        }
    }

    pub fn current(&self) -> &Round {
        &self.current
    }

    pub(crate) fn current_mut(&mut self) -> &mut Round {
        &mut self.current
    }

    /// Settled rounds, most recent first.
    pub fn archive(&self) -> &VecDeque<Round> {
        &self.archive
    }

    pub fn archived(&self, round_id: u64) -> Option<&Round> {
        self.archive.iter().find(|r| r.id == round_id)
    }

    /// Advance the lifecycle to `now`.
    ///
    /// `last_price` settles the round once `close_time` is reached; the
    /// successor opens at the same price with `next_duration_secs`. Calling
    /// this again before the successor's close time is a no-op.
    pub fn tick(&mut self, now: DateTime<Utc>, last_price: f64, next_duration_secs: u64) -> Option<RoundEvent> {
        if self.current.is_ended() {
            return None;
        }

        if now >= self.current.close_time {
            return Some(self.settle(now, last_price, next_duration_secs));
        }

        if now >= self.current.lock_time && self.current.status == RoundStatus::Live {
            self.current.lock();
            debug!(target: "game", round_id = self.current.id, "round locked");
            return Some(RoundEvent::Locked {
                round_id: self.current.id,
            });
        }

        None
    }

    fn settle(&mut self, now: DateTime<Utc>, close_price: f64, next_duration_secs: u64) -> RoundEvent {
        let next = Round::open(
            self.current.id + 1,
            now,
            close_price,
            next_duration_secs,
            self.lock_window_secs,
        );
        let mut settled = std::mem::replace(&mut self.current, next);
        settled.settle(close_price);

        info!(
            target: "game",
            round_id = settled.id,
            start_price = settled.start_price,
            close_price,
            winner = settled.winner.map(Side::as_str).unwrap_or("NONE"),
            up_pool = settled.up_pool(),
            down_pool = settled.down_pool(),
            total_pool = settled.total_pool(),
            next_round_id = self.current.id,
            "round settled"
        );

        self.archive.push_front(settled.clone());
        RoundEvent::Settled {
            settled,
            next_id: self.current.id,
        }
    }
}
