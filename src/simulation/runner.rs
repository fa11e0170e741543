use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::market::Side;
use crate::simulation::config::SimulationConfig;
use crate::simulation::core::{run_simulation, SimulationResult};

/// Replay `cfg` and log a one-line JSON summary.
pub fn run_simulation_report(cfg: &SimulationConfig) -> anyhow::Result<SimulationResult> {
    info!(
        target: "simulation",
        seed = cfg.seed,
        rounds = cfg.rounds,
        scripted_bets = cfg.bets.len(),
        "simulation starting"
    );
    let result = run_simulation(cfg)?;

    for bet in &result.rejected {
        info!(
            target: "simulation",
            user = %bet.user,
            round = bet.round,
            side = bet.side.as_str(),
            reason = %bet.reason,
            "scripted bet rejected"
        );
    }
    log_summary(cfg, &result);
    Ok(result)
}

#[derive(Serialize)]
struct SimulationSummary<'a> {
    event: &'a str,
    seed: u64,
    started_at: String,
    finished_at: String,
    rounds: usize,
    up_wins: usize,
    down_wins: usize,
    pushes: usize,
    bets_placed: usize,
    bets_rejected: usize,
    claims: usize,
    total_claimed: f64,
    treasury: f64,
    final_price: f64,
    balances: &'a BTreeMap<String, f64>,
}

fn log_summary(cfg: &SimulationConfig, result: &SimulationResult) {
    let summary = SimulationSummary {
        event: "simulation_summary",
        seed: cfg.seed,
        started_at: cfg.start.to_rfc3339(),
        finished_at: result.finished_at.to_rfc3339(),
        rounds: result.rounds.len(),
        up_wins: result.wins(Side::Up),
        down_wins: result.wins(Side::Down),
        pushes: result.pushes(),
        bets_placed: result.bets_placed,
        bets_rejected: result.rejected.len(),
        claims: result.claims.len(),
        total_claimed: result.total_claimed(),
        treasury: result.treasury,
        final_price: result.final_price,
        balances: &result.balances,
    };

    let payload = serde_json::to_string(&summary)
        .unwrap_or_else(|_| "{\"event\":\"simulation_summary_error\"}".to_string());
    info!(target: "simulation", "{payload}");
}
