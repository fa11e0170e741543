use thiserror::Error;

/// Rejections raised by the game controller. State is untouched whenever one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("stake amount must be a finite positive number, got {0}")]
    InvalidAmount(f64),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("round {0} is not accepting stakes")]
    RoundClosed(u64),

    #[error("round {0} not found")]
    UnknownRound(u64),

    #[error("round {0} has not been settled yet")]
    RoundNotSettled(u64),

    #[error("nothing to claim for round {0}")]
    NothingToClaim(u64),

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("invalid round duration: {0}s")]
    InvalidDuration(u64),

    #[error("invalid price sample: {0}")]
    InvalidPrice(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("game runtime is not running")]
    Shutdown,
}

pub type GameResult<T> = Result<T, GameError>;
