use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::info;

use crate::utils::time::now_unix_secs;

/// Process-wide counters for the game runtime.
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::default);

#[derive(Default)]
struct MetricsInner {
    price_samples: AtomicU64,
    feed_failures: AtomicU64,
    bets_placed: AtomicU64,
    bets_rejected: AtomicU64,
    rounds_settled: AtomicU64,
    claims_paid: AtomicU64,
    last_event_ts: AtomicU64,
}

/// Lightweight metrics handle backed by atomics so it can be cloned cheaply.
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl Metrics {
    fn touch(&self) {
        self.inner
            .last_event_ts
            .store(now_unix_secs(), Ordering::Relaxed);
    }

    pub fn record_price(&self, asset: &str, simulated: bool) {
        self.inner.price_samples.fetch_add(1, Ordering::Relaxed);
        self.touch();
        tracing::debug!(target: "metrics", event = "price_sample", asset, simulated);
    }

    pub fn record_feed_failure(&self, asset: &str, reason: &str) {
        self.inner.feed_failures.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "feed_failure",
            asset,
            reason,
            total_failures = self.inner.feed_failures.load(Ordering::Relaxed),
            "feed failure"
        );
    }

    pub fn record_bet_placed(&self, round_id: u64, side: &str, amount: f64) {
        self.inner.bets_placed.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "bet_placed",
            round_id,
            side,
            amount,
            total_bets = self.inner.bets_placed.load(Ordering::Relaxed),
            "bet placed"
        );
    }

    pub fn record_bet_rejected(&self, reason: &str) {
        self.inner.bets_rejected.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "bet_rejected",
            reason,
            total_rejected = self.inner.bets_rejected.load(Ordering::Relaxed),
            "bet rejected"
        );
    }

    pub fn record_round_settled(&self, round_id: u64, total_pool: f64) {
        self.inner.rounds_settled.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "round_settled",
            round_id,
            total_pool,
            total_rounds = self.inner.rounds_settled.load(Ordering::Relaxed),
            "round settled"
        );
    }

    pub fn record_claim(&self, round_id: u64, amount: f64) {
        self.inner.claims_paid.fetch_add(1, Ordering::Relaxed);
        self.touch();

        info!(
            target: "metrics",
            event = "claim_paid",
            round_id,
            amount,
            total_claims = self.inner.claims_paid.load(Ordering::Relaxed),
            "claim paid"
        );
    }

    pub fn heartbeat(&self) {
        self.touch();
    }

    pub fn is_healthy(&self, max_staleness: Duration) -> bool {
        let last = self.inner.last_event_ts.load(Ordering::Relaxed);
        if last == 0 {
            // Nothing recorded yet; the runtime is still starting.
            return true;
        }
        now_unix_secs().saturating_sub(last) <= max_staleness.as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            price_samples: load(&self.inner.price_samples),
            feed_failures: load(&self.inner.feed_failures),
            bets_placed: load(&self.inner.bets_placed),
            bets_rejected: load(&self.inner.bets_rejected),
            rounds_settled: load(&self.inner.rounds_settled),
            claims_paid: load(&self.inner.claims_paid),
            last_event_ts: load(&self.inner.last_event_ts),
        }
    }
}

/// Serializable view of current metrics used by dashboards and health checks.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub price_samples: u64,
    pub feed_failures: u64,
    pub bets_placed: u64,
    pub bets_rejected: u64,
    pub rounds_settled: u64,
    pub claims_paid: u64,
    pub last_event_ts: u64,
}

pub fn log_metrics_snapshot(snapshot: &MetricsSnapshot) {
    info!(
        target: "metrics",
        event = "metrics_snapshot",
        price_samples = snapshot.price_samples,
        feed_failures = snapshot.feed_failures,
        bets_placed = snapshot.bets_placed,
        bets_rejected = snapshot.bets_rejected,
        rounds_settled = snapshot.rounds_settled,
        claims_paid = snapshot.claims_paid,
        last_event_ts = snapshot.last_event_ts,
        "metrics snapshot"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::default();
        assert!(metrics.is_healthy(Duration::from_secs(1)));

        metrics.record_bet_placed(1, "UP", 10.0);
        metrics.record_bet_placed(1, "DOWN", 5.0);
        metrics.record_bet_rejected("round closed");
        metrics.record_round_settled(1, 15.0);

        let snap = metrics.snapshot();
        assert_eq!(snap.bets_placed, 2);
        assert_eq!(snap.bets_rejected, 1);
        assert_eq!(snap.rounds_settled, 1);
        assert_eq!(snap.claims_paid, 0);
        assert!(snap.last_event_ts > 0);
        assert!(metrics.is_healthy(Duration::from_secs(30)));
    }
}
