use serde::Serialize;
use tracing::info;

use crate::types::{AppConfig, FeedMode, PushPolicy};

#[derive(Serialize)]
struct StartupLog<'a> {
    event: &'a str,
    feed_mode: &'a str,
    asset: &'a str,
    round_duration_secs: u64,
    push_policy: &'a str,
    fee_bps: u32,
    lock_window_secs: u64,
    sentiment_simulated: bool,
    assets: Vec<&'a str>,
}

pub fn log_startup(cfg: &AppConfig) {
    let feed_mode = match cfg.feed.mode {
        FeedMode::Live => "live",
        FeedMode::Synthetic => "synthetic",
    };
    let push_policy = match cfg.settlement.push_policy {
        PushPolicy::Refund => "refund",
        PushPolicy::Forfeit => "forfeit",
    };
    let payload = StartupLog {
        event: "startup",
        feed_mode,
        asset: &cfg.game.initial_asset,
        round_duration_secs: cfg.game.round_duration_secs,
        push_policy,
        fee_bps: cfg.settlement.fee_bps,
        lock_window_secs: cfg.settlement.lock_window_secs,
        sentiment_simulated: cfg.sentiment.api_key.is_none(),
        assets: cfg.assets.iter().map(|a| a.symbol.as_str()).collect(),
    };
    info!(target: "game", startup = serde_json::to_string(&payload).unwrap_or_default().as_str());
}
