use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use pulse_rounds::market::{BetOutcome, GameController, GameError, RoundStatus, Side, UserId};
use pulse_rounds::types::{AppConfig, PushPolicy};

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn start() -> DateTime<Utc> {
    ts("2024-01-01T12:00:00Z")
}

fn game_with(cfg: &AppConfig, users: &[&UserId]) -> GameController {
    let mut game = GameController::new(cfg, start(), StdRng::seed_from_u64(3)).unwrap();
    for user in users {
        game.open_account(user);
    }
    game
}

fn close_round_at(game: &mut GameController, price: f64) {
    let close = game.current_round().close_time;
    game.observe_price(price, close - Duration::seconds(1)).unwrap();
    assert!(game.tick(close).is_some());
}

#[test]
fn winner_takes_the_whole_pool() {
    let cfg = AppConfig::default();
    let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));
    let mut game = game_with(&cfg, &[&alice, &bob]);

    game.place_bet(&alice, Side::Up, 80.0, start() + Duration::seconds(2)).unwrap();
    game.place_bet(&bob, Side::Down, 70.0, start() + Duration::seconds(4)).unwrap();
    assert!((game.current_round().total_pool() - 150.0).abs() < 1e-9);

    close_round_at(&mut game, 0.70);
    let settled = game.archived_round(1).unwrap();
    assert_eq!(settled.winner, Some(Side::Up));
    assert_eq!(settled.status, RoundStatus::Ended);

    let receipt = game.claim(&alice, 1).unwrap();
    assert!((receipt.amount - 150.0).abs() < 1e-9);
    assert_eq!(game.claim(&bob, 1), Err(GameError::NothingToClaim(1)));

    assert!((game.balance(&alice) - 1_070.0).abs() < 1e-9);
    assert!((game.balance(&bob) - 930.0).abs() < 1e-9);
}

#[test]
fn repeated_stakes_merge_and_share_the_pool() {
    let cfg = AppConfig::default();
    let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));
    let mut game = game_with(&cfg, &[&alice, &bob]);

    game.place_bet(&alice, Side::Up, 30.0, start()).unwrap();
    game.place_bet(&alice, Side::Up, 20.0, start() + Duration::seconds(1)).unwrap();
    game.place_bet(&bob, Side::Down, 50.0, start() + Duration::seconds(2)).unwrap();
    assert_eq!(game.bets(&alice).len(), 1);
    assert!((game.bets(&alice)[0].amount - 50.0).abs() < 1e-9);

    close_round_at(&mut game, 0.60);

    assert_eq!(game.claim(&alice, 1), Err(GameError::NothingToClaim(1)));
    let receipt = game.claim(&bob, 1).unwrap();
    assert!((receipt.amount - 100.0).abs() < 1e-9);

    let stats = game.stats(&bob).unwrap();
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.win_rate, 100);
    assert!((stats.profit - 50.0).abs() < 1e-9);

    let history = game.snapshot(&alice, start() + Duration::seconds(31), false).finished_bets;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, BetOutcome::Lost);
}

#[test]
fn push_refunds_or_forfeits_by_policy() {
    for (policy, claimable) in [(PushPolicy::Refund, true), (PushPolicy::Forfeit, false)] {
        let mut cfg = AppConfig::default();
        cfg.settlement.push_policy = policy;
        let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));
        let mut game = game_with(&cfg, &[&alice, &bob]);

        game.place_bet(&alice, Side::Up, 40.0, start()).unwrap();
        game.place_bet(&bob, Side::Down, 60.0, start()).unwrap();
        close_round_at(&mut game, 0.65);
        assert_eq!(game.archived_round(1).unwrap().winner, None);

        let result = game.claim(&alice, 1);
        if claimable {
            assert!((result.unwrap().amount - 40.0).abs() < 1e-9);
            assert!((game.balance(&alice) - 1_000.0).abs() < 1e-9);
        } else {
            assert_eq!(result, Err(GameError::NothingToClaim(1)));
            assert!((game.balance(&alice) - 960.0).abs() < 1e-9);
        }
    }
}

#[test]
fn lone_winner_gets_stake_back_and_empty_winning_side_pays_nobody() {
    let cfg = AppConfig::default();
    let alice = UserId::new("alice");
    let mut game = game_with(&cfg, &[&alice]);

    game.place_bet(&alice, Side::Up, 25.0, start()).unwrap();
    close_round_at(&mut game, 0.66);
    assert!((game.claim(&alice, 1).unwrap().amount - 25.0).abs() < 1e-9);

    game.place_bet(&alice, Side::Down, 25.0, start() + Duration::seconds(31)).unwrap();
    close_round_at(&mut game, 0.70);
    assert_eq!(game.archived_round(2).unwrap().winner, Some(Side::Up));
    assert_eq!(game.claim(&alice, 2), Err(GameError::NothingToClaim(2)));
}

#[test]
fn ticks_are_idempotent_and_rounds_chain() {
    let cfg = AppConfig::default();
    let mut game = game_with(&cfg, &[]);

    close_round_at(&mut game, 0.7);
    let close = game.archived_round(1).unwrap().close_time;
    assert!(game.tick(close).is_none());
    assert!(game.tick(close + Duration::seconds(10)).is_none());

    let current = game.current_round();
    assert_eq!(current.id, 2);
    assert_eq!(current.start_price, 0.7);
    assert_eq!(current.start_time, close);
    assert_eq!(game.past_rounds().count(), 1);
}

#[test]
fn bets_after_close_are_rejected() {
    let cfg = AppConfig::default();
    let alice = UserId::new("alice");
    let mut game = game_with(&cfg, &[&alice]);

    let late = start() + Duration::seconds(30);
    assert_eq!(
        game.place_bet(&alice, Side::Up, 5.0, late),
        Err(GameError::RoundClosed(1))
    );
    assert!((game.balance(&alice) - 1_000.0).abs() < 1e-9);
}

#[test]
fn lock_window_closes_staking_early() {
    let mut cfg = AppConfig::default();
    cfg.settlement.lock_window_secs = 10;
    let alice = UserId::new("alice");
    let mut game = game_with(&cfg, &[&alice]);

    game.tick(start() + Duration::seconds(20));
    assert_eq!(game.current_round().status, RoundStatus::Locked);
    assert_eq!(
        game.place_bet(&alice, Side::Up, 5.0, start() + Duration::seconds(21)),
        Err(GameError::RoundClosed(1))
    );
}

#[test]
fn asset_switch_backfills_from_first_new_price() {
    let cfg = AppConfig::default();
    let mut game = game_with(&cfg, &[]);
    let now = start() + Duration::seconds(5);

    game.select_asset("ETH").unwrap();
    assert!(game.history().is_empty());
    assert_eq!(game.current_round().id, 1);

    game.observe_price(3_150.0, now).unwrap();
    let prices = game.history().to_vec();
    assert_eq!(prices.len(), 40);
    assert_eq!(prices.last().map(|p| p.value), Some(3_150.0));
    assert_eq!(prices.last().map(|p| p.time), Some(now));
    assert_eq!(prices[0].time, now - Duration::seconds(78));
    for w in prices.windows(2) {
        assert!((w[1].value - w[0].value).abs() <= w[1].value * 0.003 + 1e-9);
    }
}
