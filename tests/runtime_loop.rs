use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pulse_rounds::client::{ClientError, ClientResult};
use pulse_rounds::feed::PriceSource;
use pulse_rounds::market::{GameError, RoundStatus, Side};
use pulse_rounds::runtime::spawn_game;
use pulse_rounds::types::{AppConfig, AssetConfig, FeedMode};

/// Quotes a fixed price per asset symbol and counts calls.
struct StubSource {
    calls: AtomicUsize,
}

impl StubSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

impl PriceSource for StubSource {
    async fn latest_price(&self, asset: &AssetConfig) -> ClientResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match asset.symbol.as_str() {
            "CELO" => Ok(0.70),
            "BTC" => Ok(64_000.0),
            other => Err(ClientError::PriceUnavailable(other.to_string())),
        }
    }
}

fn live_cfg() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.feed.mode = FeedMode::Live;
    cfg.sentiment.api_key = None;
    cfg
}

#[tokio::test(start_paused = true)]
async fn round_settles_on_live_price_and_pays_out() {
    let source = StubSource::new();
    let (handle, task) = spawn_game(live_cfg(), Arc::clone(&source)).unwrap();

    let bet = handle.place_bet(Side::Up, 50.0).await.unwrap();
    assert_eq!(bet.round_id, 1);
    assert!((handle.snapshot().balance - 950.0).abs() < 1e-9);
    assert_eq!(
        handle.claim(1).await,
        Err(GameError::RoundNotSettled(1))
    );

    tokio::time::sleep(Duration::from_secs(31)).await;

    let snap = handle.snapshot();
    assert_eq!(snap.current_round.id, 2);
    assert_eq!(snap.past_rounds[0].id, 1);
    assert_eq!(snap.past_rounds[0].status, RoundStatus::Ended);
    assert_eq!(snap.past_rounds[0].close_price, Some(0.70));
    assert!(!snap.simulated_feed);
    assert!(source.calls.load(Ordering::SeqCst) >= 3);

    let receipt = handle.claim(1).await.unwrap();
    assert!((receipt.amount - 50.0).abs() < 1e-9);
    assert_eq!(handle.claim(1).await, Err(GameError::NothingToClaim(1)));
    assert!((handle.snapshot().balance - 1_000.0).abs() < 1e-9);

    drop(handle);
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn asset_switch_refetches_and_backfills() {
    let (handle, task) = spawn_game(live_cfg(), StubSource::new()).unwrap();

    let asset = handle.select_asset("btc").await.unwrap();
    assert_eq!(asset.symbol, "BTC");
    assert_eq!(
        handle.select_asset("XRP").await,
        Err(GameError::UnknownAsset("XRP".to_string()))
    );

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let snap = handle.snapshot();
    assert_eq!(snap.asset.symbol, "BTC");
    assert_eq!(snap.current_price, 64_000.0);
    assert_eq!(snap.prices.len(), 40);
    assert_eq!(snap.prices.last().map(|p| p.value), Some(64_000.0));
    assert_eq!(snap.current_round.id, 1);

    drop(handle);
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_source_falls_back_until_switch() {
    let (handle, task) = spawn_game(live_cfg(), StubSource::new()).unwrap();

    handle.select_asset("DOGE").await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    let snap = handle.snapshot();
    assert!(snap.simulated_feed);
    assert!(!snap.prices.is_empty());
    assert!(snap.current_price >= 0.01);

    handle.select_asset("CELO").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let snap = handle.snapshot();
    assert!(!snap.simulated_feed);
    assert_eq!(snap.current_price, 0.70);

    drop(handle);
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn duration_applies_from_next_round() {
    let (handle, task) = spawn_game(live_cfg(), StubSource::new()).unwrap();

    handle.select_duration(60).await.unwrap();
    assert_eq!(
        handle.select_duration(0).await,
        Err(GameError::InvalidDuration(0))
    );
    let first = handle.snapshot().current_round;
    assert_eq!((first.close_time - first.start_time).num_seconds(), 30);

    tokio::time::sleep(Duration::from_secs(31)).await;
    let second = handle.snapshot().current_round;
    assert_eq!(second.id, 2);
    assert_eq!((second.close_time - second.start_time).num_seconds(), 60);

    drop(handle);
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn analysis_without_key_is_simulated() {
    let (handle, task) = spawn_game(live_cfg(), StubSource::new()).unwrap();
    let analysis = handle.analyze().await;
    assert!((60..90).contains(&analysis.confidence));

    drop(handle);
    task.await.unwrap().unwrap();
}
