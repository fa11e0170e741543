/// Basis points in 100%.
pub const BPS_DENOMINATOR: f64 = 10_000.0;

/// Largest fee that still leaves a non-negative net payout.
pub const MAX_FEE_BPS: u32 = 10_000;

/// Pari-mutuel share of `total_pool` owed to a stake of `amount` in a side
/// holding `winner_pool`.
///
/// An empty winning pool is treated as 1 so a corrupted round can never
/// divide by zero.
pub fn pari_mutuel_payout(amount: f64, winner_pool: f64, total_pool: f64) -> f64 {
    let safe_pool = if winner_pool == 0.0 { 1.0 } else { winner_pool };
    total_pool * (amount / safe_pool)
}

/// Fee owed on `gross` at `fee_bps`.
pub fn fee_for(gross: f64, fee_bps: u32) -> f64 {
    gross * f64::from(fee_bps) / BPS_DENOMINATOR
}

/// Displayed payout multiplier for one side of an open round.
///
/// 2.0 when nothing has been staked yet.
pub fn implied_multiplier(side_pool: f64, total_pool: f64) -> f64 {
    if total_pool == 0.0 {
        return 2.0;
    }
    let safe_pool = if side_pool == 0.0 { 1.0 } else { side_pool };
    total_pool / safe_pool
}

/// Share of the total pool held by one side, in percent; 50 when empty.
pub fn pool_share_pct(side_pool: f64, total_pool: f64) -> f64 {
    if total_pool == 0.0 {
        50.0
    } else {
        side_pool / total_pool * 100.0
    }
}
