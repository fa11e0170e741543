//! Round lifecycle, pari-mutuel ledger and the controller that owns them.

pub mod accounts;
pub mod book;
pub mod controller;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod round;

pub use book::{BetRecord, PlayerStats, UserBet, UserId};
pub use controller::{ClaimReceipt, GameController, GameSnapshot};
pub use engine::RoundEvent;
pub use error::{GameError, GameResult};
pub use history::PricePoint;
pub use ledger::{BetOutcome, Payout, SettlementPolicy};
pub use round::{Round, RoundStatus, RoundView, Side};
