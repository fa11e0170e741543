//! Price acquisition: live source polling with a sticky synthetic fallback.

pub mod synthetic;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::{ClientError, ClientResult};
use crate::monitoring::metrics::METRICS;
use crate::types::{AssetConfig, FeedConfig, FeedMode};

/// Anything that can quote the latest price of an asset.
pub trait PriceSource: Send + Sync + 'static {
    fn latest_price(&self, asset: &AssetConfig) -> impl Future<Output = ClientResult<f64>> + Send;
}

/// Result of one fetch, tagged with the epoch it was issued under.
#[derive(Debug)]
pub struct FetchOutcome {
    pub epoch: u64,
    pub asset: String,
    pub result: ClientResult<f64>,
}

/// What the runtime should do with a fetch outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedUpdate {
    /// A live quote for the selected asset.
    Price(f64),
    /// The source failed; from now on this asset is driven synthetically.
    FellBack,
    /// Issued before the latest asset switch; dropped.
    Stale,
}

/// Fetch bookkeeping for the selected asset.
///
/// At most one fetch is in flight. Switching assets aborts it and bumps the
/// epoch so a result that still arrives is recognised as stale.
pub struct PriceFeed<S> {
    source: Arc<S>,
    cfg: FeedConfig,
    simulated: bool,
    epoch: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl<S: PriceSource> PriceFeed<S> {
    pub fn new(source: Arc<S>, cfg: FeedConfig) -> Self {
        let simulated = cfg.mode == FeedMode::Synthetic;
        Self {
            source,
            cfg,
            simulated,
            epoch: 0,
            in_flight: None,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True from spawn until the outcome is accepted, even if the task has
    /// already finished and its outcome is still queued.
    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Delay until the next sample.
    pub fn poll_interval(&self) -> Duration {
        if self.simulated {
            self.cfg.synthetic_interval_secs
        } else {
            self.cfg.live_interval_secs
        }
    }

    /// Query the source for `asset` on a background task; the outcome is
    /// delivered on `tx`.
    pub fn spawn_fetch(&mut self, asset: &AssetConfig, tx: mpsc::Sender<FetchOutcome>) {
        if self.in_flight() {
            return;
        }
        let source = Arc::clone(&self.source);
        let asset = asset.clone();
        let epoch = self.epoch;
        let timeout = self.cfg.timeout_ms;

        debug!(target: "feed", asset = %asset.symbol, epoch, "fetching live price");
        self.in_flight = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, source.latest_price(&asset)).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(timeout)),
            };
            let outcome = FetchOutcome {
                epoch,
                asset: asset.symbol,
                result,
            };
            // The receiver is gone only when the runtime is shutting down.
            let _ = tx.send(outcome).await;
        }));
    }

    /// Forget the previous asset: abort its fetch and reset the fallback.
    pub fn switch_asset(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.epoch += 1;
        self.simulated = self.cfg.mode == FeedMode::Synthetic;
    }

    pub fn accept(&mut self, outcome: FetchOutcome) -> FeedUpdate {
        if outcome.epoch != self.epoch {
            debug!(target: "feed", asset = %outcome.asset, epoch = outcome.epoch, "dropping stale price");
            return FeedUpdate::Stale;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(price) if price.is_finite() && price > 0.0 => FeedUpdate::Price(price),
            Ok(price) => self.fall_back(&outcome.asset, &ClientError::Malformed(format!("bad quote {price}"))),
            Err(err) => self.fall_back(&outcome.asset, &err),
        }
    }

    fn fall_back(&mut self, asset: &str, err: &ClientError) -> FeedUpdate {
        METRICS.record_feed_failure(asset, &err.to_string());
        warn!(
            target: "feed",
            asset,
            error = %err,
            "live price unavailable, switching to synthetic walk"
        );
        self.simulated = true;
        FeedUpdate::FellBack
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
