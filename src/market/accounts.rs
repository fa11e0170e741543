use std::collections::HashMap;

use crate::market::book::UserId;
use crate::market::error::{GameError, GameResult};

/// Play-money balances per player, plus the treasury that collects fees.
#[derive(Debug, Default)]
pub struct Accounts {
    balances: HashMap<UserId, f64>,
    treasury: f64,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `user` with `balance`; an existing account is left as is.
    pub fn open(&mut self, user: &UserId, balance: f64) {
        self.balances.entry(user.clone()).or_insert(balance);
    }

    pub fn balance(&self, user: &UserId) -> f64 {
        self.balances.get(user).copied().unwrap_or(0.0)
    }

    pub fn treasury(&self) -> f64 {
        self.treasury
    }

    pub fn ensure_funds(&self, user: &UserId, amount: f64) -> GameResult<()> {
        let available = self.balance(user);
        if available < amount {
            return Err(GameError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    pub fn debit(&mut self, user: &UserId, amount: f64) -> GameResult<()> {
        self.ensure_funds(user, amount)?;
        if let Some(balance) = self.balances.get_mut(user) {
            *balance -= amount;
        }
        Ok(())
    }

    pub fn credit(&mut self, user: &UserId, amount: f64) {
        *self.balances.entry(user.clone()).or_insert(0.0) += amount;
    }

    pub fn collect_fee(&mut self, fee: f64) {
        self.treasury += fee;
    }
}
