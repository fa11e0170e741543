use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::feed::synthetic::backfill_walk;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Shape of the walk generated when the buffer is empty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backfill {
    pub points: usize,
    pub spacing_secs: i64,
    pub volatility: f64,
}

/// Bounded, chronological price samples; oldest evicted past `cap`.
#[derive(Clone, Debug)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    cap: usize,
}

impl PriceHistory {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            points: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn append(&mut self, point: PricePoint) {
        self.points.push_back(point);
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
    }

    /// Fill with a synthetic walk ending at `seed` observed at `now`.
    pub fn backfill_synthetic<R: Rng + ?Sized>(
        &mut self,
        seed: f64,
        now: DateTime<Utc>,
        shape: Backfill,
        rng: &mut R,
    ) {
        for point in backfill_walk(seed, now, shape.points, shape.spacing_secs, shape.volatility, rng) {
            self.append(point);
        }
    }

    /// Record an observed price. An empty buffer is backfilled so that the
    /// walk ends at the observation instead of holding a lone sample.
    pub fn observe<R: Rng + ?Sized>(
        &mut self,
        value: f64,
        now: DateTime<Utc>,
        shape: Backfill,
        rng: &mut R,
    ) {
        if self.points.is_empty() {
            self.backfill_synthetic(value, now, shape, rng);
        } else {
            self.append(PricePoint { time: now, value });
        }
    }

    pub fn to_vec(&self) -> Vec<PricePoint> {
        self.points.iter().copied().collect()
    }
}
