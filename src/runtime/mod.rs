//! Live game runtime: one task owns the [`GameController`] and multiplexes
//! the round ticker, price polling and player commands.

pub mod console;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::client::sentiment::{MarketAnalysis, SentimentClient};
use crate::feed::{FeedUpdate, PriceFeed, PriceSource};
use crate::market::{
    ClaimReceipt, GameController, GameError, GameResult, GameSnapshot, RoundEvent, Side, UserBet, UserId,
};
use crate::monitoring::metrics::METRICS;
use crate::types::{AppConfig, AssetConfig};
use crate::utils::time::ROUND_TICK;

type Reply<T> = oneshot::Sender<GameResult<T>>;

/// Requests served by the runtime task.
#[derive(Debug)]
pub enum Command {
    PlaceBet {
        user: UserId,
        side: Side,
        amount: f64,
        reply: Reply<UserBet>,
    },
    Claim {
        user: UserId,
        round_id: u64,
        reply: Reply<ClaimReceipt>,
    },
    SelectAsset {
        symbol: String,
        reply: Reply<AssetConfig>,
    },
    SelectDuration {
        secs: u64,
        reply: Reply<()>,
    },
}

/// Wall-clock time that advances with the tokio clock.
#[derive(Clone, Copy, Debug)]
struct RuntimeClock {
    origin_utc: DateTime<Utc>,
    origin: Instant,
}

impl RuntimeClock {
    fn start() -> Self {
        Self {
            origin_utc: Utc::now(),
            origin: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_utc + elapsed
    }
}

/// Cloneable front door to a running game. Dropping every handle stops the
/// runtime.
#[derive(Clone)]
pub struct GameHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<GameSnapshot>,
    sentiment: Arc<SentimentClient>,
    user: UserId,
}

impl GameHandle {
    pub fn user(&self) -> &UserId {
        &self.user
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> GameResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| GameError::Shutdown)?;
        rx.await.unwrap_or(Err(GameError::Shutdown))
    }

    pub async fn place_bet(&self, side: Side, amount: f64) -> GameResult<UserBet> {
        let user = self.user.clone();
        self.request(|reply| Command::PlaceBet {
            user,
            side,
            amount,
            reply,
        })
        .await
    }

    pub async fn claim(&self, round_id: u64) -> GameResult<ClaimReceipt> {
        let user = self.user.clone();
        self.request(|reply| Command::Claim { user, round_id, reply })
            .await
    }

    pub async fn select_asset(&self, symbol: &str) -> GameResult<AssetConfig> {
        let symbol = symbol.to_string();
        self.request(|reply| Command::SelectAsset { symbol, reply })
            .await
    }

    pub async fn select_duration(&self, secs: u64) -> GameResult<()> {
        self.request(|reply| Command::SelectDuration { secs, reply })
            .await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> GameSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<GameSnapshot> {
        self.state.clone()
    }

    /// Advisory read on the selected asset from its recent prices.
    pub async fn analyze(&self) -> MarketAnalysis {
        let (symbol, prices) = {
            let snapshot = self.state.borrow();
            let prices: Vec<f64> = snapshot.prices.iter().map(|p| p.value).collect();
            (snapshot.asset.symbol.clone(), prices)
        };
        self.sentiment.analyze(&symbol, &prices).await
    }
}

/// Build the game from `cfg` and run it on a background task.
pub fn spawn_game<S: PriceSource>(
    cfg: AppConfig,
    source: Arc<S>,
) -> anyhow::Result<(GameHandle, JoinHandle<anyhow::Result<()>>)> {
    let clock = RuntimeClock::start();
    let game = GameController::new(&cfg, clock.now(), StdRng::from_os_rng())?;
    let sentiment = Arc::new(SentimentClient::new(&cfg.sentiment)?);
    let feed = PriceFeed::new(source, cfg.feed.clone());
    let user = UserId::new(cfg.game.player.clone());

    let initial = game.snapshot(&user, clock.now(), feed.is_simulated());
    let (state_tx, state_rx) = watch::channel(initial);
    let (command_tx, command_rx) = mpsc::channel(64);

    let handle = GameHandle {
        commands: command_tx,
        state: state_rx,
        sentiment,
        user: user.clone(),
    };
    let task = tokio::spawn(run_game(game, feed, clock, user, command_rx, state_tx));
    Ok((handle, task))
}

/// Apply one command; returns true when the selected asset changed.
fn handle_command(game: &mut GameController, now: DateTime<Utc>, command: Command) -> bool {
    match command {
        Command::PlaceBet {
            user,
            side,
            amount,
            reply,
        } => {
            let result = game.place_bet(&user, side, amount, now);
            match &result {
                Ok(bet) => METRICS.record_bet_placed(bet.round_id, side.as_str(), amount),
                Err(err) => METRICS.record_bet_rejected(&err.to_string()),
            }
            let _ = reply.send(result);
            false
        }
        Command::Claim { user, round_id, reply } => {
            let result = game.claim(&user, round_id);
            if let Ok(receipt) = &result {
                METRICS.record_claim(round_id, receipt.amount);
            }
            let _ = reply.send(result);
            false
        }
        Command::SelectAsset { symbol, reply } => {
            let result = game.select_asset(&symbol);
            let switched = result.is_ok();
            let _ = reply.send(result);
            switched
        }
        Command::SelectDuration { secs, reply } => {
            let _ = reply.send(game.select_duration(secs));
            false
        }
    }
}

async fn run_game<S: PriceSource>(
    mut game: GameController,
    mut feed: PriceFeed<S>,
    clock: RuntimeClock,
    user: UserId,
    mut commands: mpsc::Receiver<Command>,
    state: watch::Sender<GameSnapshot>,
) -> anyhow::Result<()> {
    let (fetch_tx, mut fetch_rx) = mpsc::channel(4);
    let mut round_ticker = interval(ROUND_TICK);
    round_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut next_poll = Instant::now();

    info!(
        target: "game",
        user = %user,
        asset = %game.selected_asset().symbol,
        round_id = game.current_round().id,
        "game runtime started"
    );

    loop {
        select! {
            _ = round_ticker.tick() => {
                if let Some(RoundEvent::Settled { settled, .. }) = game.tick(clock.now()) {
                    METRICS.record_round_settled(settled.id, settled.total_pool());
                }
            }
            _ = sleep_until(next_poll), if !feed.in_flight() => {
                if feed.is_simulated() {
                    game.simulate_price(clock.now());
                    METRICS.record_price(&game.selected_asset().symbol, true);
                } else {
                    feed.spawn_fetch(game.selected_asset(), fetch_tx.clone());
                }
                next_poll = Instant::now() + feed.poll_interval();
            }
            Some(outcome) = fetch_rx.recv() => {
                match feed.accept(outcome) {
                    FeedUpdate::Price(price) => match game.observe_price(price, clock.now()) {
                        Ok(()) => METRICS.record_price(&game.selected_asset().symbol, false),
                        Err(err) => warn!(target: "feed", error = %err, "ignoring price sample"),
                    },
                    FeedUpdate::FellBack => {
                        game.simulate_price(clock.now());
                        METRICS.record_price(&game.selected_asset().symbol, true);
                        next_poll = Instant::now() + feed.poll_interval();
                    }
                    FeedUpdate::Stale => {}
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                if handle_command(&mut game, clock.now(), command) {
                    feed.switch_asset();
                    next_poll = Instant::now();
                }
            }
        }

        METRICS.heartbeat();
        state.send_replace(game.snapshot(&user, clock.now(), feed.is_simulated()));
    }

    feed.shutdown();
    info!(
        target: "game",
        round_id = game.current_round().id,
        balance = game.balance(&user),
        "game runtime stopped"
    );
    Ok(())
}
