use pulse_rounds::market::Side;
use pulse_rounds::simulation::{run_simulation, SimulationConfig};

fn cfg(extra: &str) -> SimulationConfig {
    let head = r#"
        seed = 9
        start = "2024-01-01T00:00:00Z"
    "#;
    let game = r#"
        [game]
        initial_price = 1.0
        round_duration_secs = 10
    "#;
    toml::from_str(&format!("{head}\n{extra}\n{game}")).expect("simulation config should parse")
}

#[test]
fn scripted_prices_decide_winners() {
    let cfg = cfg(
        r#"
        rounds = 3
        # round 1 closes at tick 10, round 2 at tick 20, round 3 at tick 30
        price_path = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.2,
                      1.2, 1.2, 1.2, 1.2, 1.2, 1.2, 1.2, 1.2, 1.2, 1.1,
                      1.1]

        [[bets]]
        user = "alice"
        round = 1
        side = "UP"
        amount = 80.0

        [[bets]]
        user = "bob"
        round = 1
        side = "DOWN"
        amount = 70.0

        [[bets]]
        user = "alice"
        round = 2
        side = "UP"
        amount = 30.0

        [[bets]]
        user = "alice"
        round = 2
        side = "UP"
        amount = 20.0
        offset_secs = 3

        [[bets]]
        user = "bob"
        round = 2
        side = "DOWN"
        amount = 50.0
        "#,
    );

    let result = run_simulation(&cfg).unwrap();
    let winners: Vec<Option<Side>> = result.rounds.iter().map(|r| r.winner).collect();
    assert_eq!(winners, vec![Some(Side::Up), Some(Side::Down), None]);
    assert_eq!(result.bets_placed, 5);
    assert!(result.rejected.is_empty());

    // alice: -80 +150 -50 ; bob: -70 -50 +100
    assert!((result.balances["alice"] - 1_020.0).abs() < 1e-9);
    assert!((result.balances["bob"] - 980.0).abs() < 1e-9);
    assert!((result.total_claimed() - 250.0).abs() < 1e-9);
    assert_eq!(result.final_price, 1.1);
}

#[test]
fn fee_accrues_to_treasury() {
    let mut cfg = cfg(
        r#"
        rounds = 1
        price_path = [1.5]

        [[bets]]
        user = "alice"
        round = 1
        side = "UP"
        amount = 100.0
        "#,
    );
    cfg.settlement.fee_bps = 200;

    let result = run_simulation(&cfg).unwrap();
    assert!((result.treasury - 2.0).abs() < 1e-9);
    assert!((result.balances["alice"] - 998.0).abs() < 1e-9);
}

#[test]
fn manual_claim_mode_leaves_rewards_unclaimed() {
    let mut cfg = cfg(
        r#"
        rounds = 1
        price_path = [0.5]

        [[bets]]
        user = "bob"
        round = 1
        side = "DOWN"
        amount = 10.0
        "#,
    );
    cfg.auto_claim = false;

    let result = run_simulation(&cfg).unwrap();
    assert!(result.claims.is_empty());
    assert!((result.balances["bob"] - 990.0).abs() < 1e-9);
}

#[test]
fn seeded_walk_is_reproducible() {
    let cfg = cfg("rounds = 10");
    let a = run_simulation(&cfg).unwrap();
    let b = run_simulation(&cfg).unwrap();
    assert_eq!(a.rounds, b.rounds);
    assert_eq!(a.final_price, b.final_price);

    let mut other = cfg.clone();
    other.seed = 10;
    assert_ne!(run_simulation(&other).unwrap().final_price, a.final_price);
}

#[test]
fn invalid_scripted_price_is_an_error() {
    let cfg = cfg(
        r#"
        rounds = 1
        price_path = [1.0, -3.0]
        "#,
    );
    assert!(run_simulation(&cfg).is_err());
}
