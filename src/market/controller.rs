use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::feed::synthetic::next_price;
use crate::market::accounts::Accounts;
use crate::market::book::{BetRecord, PlayerStats, PositionBook, UserBet, UserId};
use crate::market::engine::{RoundEngine, RoundEvent};
use crate::market::error::{GameError, GameResult};
use crate::market::history::{Backfill, PricePoint, PriceHistory};
use crate::market::ledger::{self, compute_payout, is_claimable, SettlementPolicy};
use crate::market::round::{Round, RoundView, Side};
use crate::types::{AppConfig, AssetConfig, MAX_ROUND_DURATION_SECS};
use crate::utils::math::MAX_FEE_BPS;
use crate::utils::time::{format_countdown, seconds_remaining};

/// Result of a successful claim.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimReceipt {
    pub round_id: u64,
    pub bets_claimed: usize,
    /// Credited to the player's balance.
    pub amount: f64,
    /// Sent to the treasury.
    pub fee: f64,
}

/// Immutable view of everything a renderer needs.
#[derive(Clone, Debug, Serialize)]
pub struct GameSnapshot {
    pub taken_at: DateTime<Utc>,
    pub user: UserId,
    pub asset: AssetConfig,
    pub duration_secs: u64,
    pub current_price: f64,
    pub simulated_feed: bool,
    pub seconds_remaining: i64,
    pub countdown: String,
    pub current_round: RoundView,
    pub past_rounds: Vec<RoundView>,
    pub balance: f64,
    pub treasury: f64,
    pub bets: Vec<UserBet>,
    pub finished_bets: Vec<BetRecord>,
    pub stats: Option<PlayerStats>,
    pub prices: Vec<PricePoint>,
}

/// Single owner of rounds, pools, positions, balances and price history.
///
/// Every mutation goes through `&mut self`, so callers serialize access by
/// owning the controller from one task.
pub struct GameController {
    engine: RoundEngine,
    book: PositionBook,
    accounts: Accounts,
    history: PriceHistory,
    assets: Vec<AssetConfig>,
    selected_asset: AssetConfig,
    selected_duration_secs: u64,
    last_price: f64,
    policy: SettlementPolicy,
    initial_balance: f64,
    switch_backfill: Backfill,
    synthetic_volatility: f64,
    price_floor: f64,
    rng: StdRng,
}

fn validate_duration(secs: u64) -> GameResult<u64> {
    if secs == 0 || secs > MAX_ROUND_DURATION_SECS {
        return Err(GameError::InvalidDuration(secs));
    }
    Ok(secs)
}

fn validate_price(price: f64) -> GameResult<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(GameError::InvalidPrice(price))
    }
}

fn validate_settings(cfg: &AppConfig) -> GameResult<()> {
    if cfg.settlement.fee_bps > MAX_FEE_BPS {
        return Err(GameError::InvalidConfig(format!(
            "settlement.fee_bps must be at most {MAX_FEE_BPS}, got {}",
            cfg.settlement.fee_bps
        )));
    }
    let balance = cfg.game.initial_balance;
    if !balance.is_finite() || balance < 0.0 {
        return Err(GameError::InvalidConfig(format!(
            "game.initial_balance must be a non-negative number, got {balance}"
        )));
    }
    if cfg.game.backfill_spacing_secs <= 0 {
        return Err(GameError::InvalidConfig(format!(
            "game.backfill_spacing_secs must be positive, got {}",
            cfg.game.backfill_spacing_secs
        )));
    }
    Ok(())
}

impl GameController {
    /// Build a fresh game at `now`: round 1 opens at the configured initial
    /// price, the history is seeded with a synthetic walk ending there, and
    /// the configured player gets the starting balance.
    pub fn new(cfg: &AppConfig, now: DateTime<Utc>, mut rng: StdRng) -> GameResult<Self> {
        let selected_asset = cfg
            .asset(&cfg.game.initial_asset)
            .cloned()
            .ok_or_else(|| GameError::UnknownAsset(cfg.game.initial_asset.clone()))?;
        let initial_price = validate_price(cfg.game.initial_price)?;
        let duration = validate_duration(cfg.game.round_duration_secs)?;
        validate_settings(cfg)?;

        let mut history = PriceHistory::new(cfg.game.history_cap);
        history.backfill_synthetic(
            initial_price,
            now,
            Backfill {
                points: cfg.game.backfill_points,
                spacing_secs: cfg.game.backfill_spacing_secs,
                volatility: cfg.game.startup_backfill_volatility,
            },
            &mut rng,
        );

        let mut accounts = Accounts::new();
        accounts.open(&UserId::new(cfg.game.player.clone()), cfg.game.initial_balance);

        Ok(Self {
            engine: RoundEngine::new(now, initial_price, duration, cfg.settlement.lock_window_secs),
            book: PositionBook::new(),
            accounts,
            history,
            assets: cfg.assets.clone(),
            selected_asset,
            selected_duration_secs: duration,
            last_price: initial_price,
            policy: SettlementPolicy::from(&cfg.settlement),
            initial_balance: cfg.game.initial_balance,
            switch_backfill: Backfill {
                points: cfg.game.backfill_points,
                spacing_secs: cfg.game.backfill_spacing_secs,
                volatility: cfg.game.switch_backfill_volatility,
            },
            synthetic_volatility: cfg.feed.synthetic_volatility,
            price_floor: cfg.feed.price_floor,
            rng,
        })
    }

    /// Open `user` with the configured starting balance.
    pub fn open_account(&mut self, user: &UserId) {
        self.accounts.open(user, self.initial_balance);
    }

    /// Stake `amount` on `side` of the live round.
    ///
    /// Either the balance debit, the pool increment and the book entry all
    /// happen, or none of them do.
    pub fn place_bet(&mut self, user: &UserId, side: Side, amount: f64, now: DateTime<Utc>) -> GameResult<UserBet> {
        ledger::validate_amount(amount)?;
        let round_id = self.engine.current().id;
        if !self.engine.current().accepts_stakes(now) {
            return Err(GameError::RoundClosed(round_id));
        }
        self.accounts.ensure_funds(user, amount)?;

        // Both checks above make the remaining steps infallible.
        ledger::stake(self.engine.current_mut(), side, amount, now)?;
        self.accounts.debit(user, amount)?;
        let bet = self.book.record_bet(user, round_id, side, amount, now);

        info!(
            target: "ledger",
            user = %user,
            round_id,
            side = side.as_str(),
            amount,
            up_pool = self.engine.current().up_pool(),
            down_pool = self.engine.current().down_pool(),
            "bet placed"
        );
        Ok(bet)
    }

    /// Pay out every claimable bet `user` holds on a settled round.
    pub fn claim(&mut self, user: &UserId, round_id: u64) -> GameResult<ClaimReceipt> {
        if round_id == self.engine.current().id {
            return Err(GameError::RoundNotSettled(round_id));
        }
        let round = self
            .engine
            .archived(round_id)
            .ok_or(GameError::UnknownRound(round_id))?;

        let owed: Vec<_> = self
            .book
            .bets_for_round(user, round_id)
            .filter(|bet| is_claimable(round, bet, &self.policy))
            .map(|bet| (bet.id, compute_payout(round, bet, &self.policy)))
            .collect();
        if owed.is_empty() {
            return Err(GameError::NothingToClaim(round_id));
        }

        let mut receipt = ClaimReceipt {
            round_id,
            bets_claimed: 0,
            amount: 0.0,
            fee: 0.0,
        };
        for (bet_id, payout) in owed {
            if !self.book.mark_claimed(user, bet_id) {
                continue;
            }
            self.accounts.credit(user, payout.net);
            self.accounts.collect_fee(payout.fee);
            receipt.bets_claimed += 1;
            receipt.amount += payout.net;
            receipt.fee += payout.fee;
        }

        info!(
            target: "ledger",
            user = %user,
            round_id,
            bets = receipt.bets_claimed,
            amount = receipt.amount,
            fee = receipt.fee,
            "reward claimed"
        );
        Ok(receipt)
    }

    /// Switch the tracked asset. History is cleared; the next observed price
    /// backfills it. The live round keeps running.
    pub fn select_asset(&mut self, symbol: &str) -> GameResult<AssetConfig> {
        let asset = self
            .assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| GameError::UnknownAsset(symbol.to_string()))?;

        self.history.clear();
        self.selected_asset = asset.clone();
        info!(target: "game", asset = %asset.symbol, "asset selected");
        Ok(asset)
    }

    /// Duration for rounds created from now on; the live round is unaffected.
    pub fn select_duration(&mut self, secs: u64) -> GameResult<()> {
        self.selected_duration_secs = validate_duration(secs)?;
        info!(target: "game", duration_secs = secs, "round duration selected");
        Ok(())
    }

    /// Record a price observed at `now` for the selected asset.
    pub fn observe_price(&mut self, price: f64, now: DateTime<Utc>) -> GameResult<()> {
        let price = validate_price(price)?;
        self.history.observe(price, now, self.switch_backfill, &mut self.rng);
        self.last_price = price;
        debug!(target: "feed", asset = %self.selected_asset.symbol, price, "price observed");
        Ok(())
    }

    /// Advance the last price one step along the synthetic walk.
    pub fn simulate_price(&mut self, now: DateTime<Utc>) -> f64 {
        let next = next_price(self.last_price, self.synthetic_volatility, self.price_floor, &mut self.rng);
        self.history.observe(next, now, self.switch_backfill, &mut self.rng);
        self.last_price = next;
        next
    }

    /// Expiry check; settles against the last observed price.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<RoundEvent> {
        self.engine.tick(now, self.last_price, self.selected_duration_secs)
    }

    pub fn current_round(&self) -> &Round {
        self.engine.current()
    }

    pub fn past_rounds(&self) -> impl Iterator<Item = &Round> {
        self.engine.archive().iter()
    }

    pub fn archived_round(&self, round_id: u64) -> Option<&Round> {
        self.engine.archived(round_id)
    }

    pub fn balance(&self, user: &UserId) -> f64 {
        self.accounts.balance(user)
    }

    pub fn treasury(&self) -> f64 {
        self.accounts.treasury()
    }

    pub fn bets(&self, user: &UserId) -> &[UserBet] {
        self.book.bets(user)
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    pub fn selected_asset(&self) -> &AssetConfig {
        &self.selected_asset
    }

    pub fn selected_duration_secs(&self) -> u64 {
        self.selected_duration_secs
    }

    pub fn stats(&self, user: &UserId) -> Option<PlayerStats> {
        self.book.stats(user, self.engine.archive(), &self.policy)
    }

    /// `simulated_feed` reports whether prices currently come from the
    /// synthetic walk; only the feed owner knows that.
    pub fn snapshot(&self, user: &UserId, now: DateTime<Utc>, simulated_feed: bool) -> GameSnapshot {
        let current = self.engine.current();
        let remaining = seconds_remaining(current.close_time, now);
        GameSnapshot {
            taken_at: now,
            user: user.clone(),
            asset: self.selected_asset.clone(),
            duration_secs: self.selected_duration_secs,
            current_price: self.last_price,
            simulated_feed,
            seconds_remaining: remaining,
            countdown: format_countdown(remaining),
            current_round: RoundView::from(current),
            past_rounds: self.engine.archive().iter().map(RoundView::from).collect(),
            balance: self.accounts.balance(user),
            treasury: self.accounts.treasury(),
            bets: self.book.bets(user).to_vec(),
            finished_bets: self.book.history(user, self.engine.archive(), &self.policy),
            stats: self.stats(user),
            prices: self.history.to_vec(),
        }
    }
}
