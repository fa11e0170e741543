//! Synthetic price generators used when no live quote is available.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::market::history::PricePoint;

/// Uniform delta bounded by `volatility * value` on either side.
fn bounded_delta<R: Rng + ?Sized>(value: f64, volatility: f64, rng: &mut R) -> f64 {
    let bound = (value * volatility).abs();
    if bound == 0.0 || !bound.is_finite() {
        return 0.0;
    }
    rng.random_range(-bound..=bound)
}

/// Retroactive walk of `count` points ending at `seed` at time `end`, spaced
/// `spacing_secs` apart, oldest first.
///
/// Walking backwards, each step subtracts the drawn delta from the running
/// value, so the newest point is exactly `seed`.
pub fn backfill_walk<R: Rng + ?Sized>(
    seed: f64,
    end: DateTime<Utc>,
    count: usize,
    spacing_secs: i64,
    volatility: f64,
    rng: &mut R,
) -> Vec<PricePoint> {
    let mut points = Vec::with_capacity(count);
    let mut value = seed;
    for i in 0..count {
        let offset = Duration::seconds(spacing_secs.saturating_mul(i as i64));
        points.push(PricePoint {
            time: end - offset,
            value,
        });
        value -= bounded_delta(value, volatility, rng);
    }
    points.reverse();
    points
}

/// One step of the live fallback walk, never below `floor`.
pub fn next_price<R: Rng + ?Sized>(current: f64, volatility: f64, floor: f64, rng: &mut R) -> f64 {
    (current + bounded_delta(current, volatility, rng)).max(floor)
}
