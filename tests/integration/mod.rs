//! Integration tests for the football arbitrage scanner.
//!
//! The pipeline and scheduler tests run offline against in-memory batches.
//! Live provider tests require ODDS_API_KEY.
//! Run them with: cargo test --test integration -- --ignored

use std::time::Duration;

use football_arb::api::AppState;
use football_arb::arbitrage::StakeAllocator;
use football_arb::config::Config;
use football_arb::odds::{MarketKey, MarketType, Outcome};
use football_arb::provider::mock::{MockConfig, MockOddsSource, RawOddsBatchBuilder};
use football_arb::provider::{events_to_batch, ApiEvent, OddsApiClient, OddsSource};
use football_arb::scheduler::{CycleOutcome, Scheduler, SchedulerSettings};
use football_arb::{scan, scan_with};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::macros::datetime;
use time::OffsetDateTime;

/// Provider payload with one arbitrageable and one fair match.
const EVENTS_JSON: &str = r#"[
  {
    "id": "evt-arb",
    "sport_key": "soccer_epl",
    "commence_time": "2025-03-08T15:00:00Z",
    "home_team": "Arsenal",
    "away_team": "Chelsea",
    "bookmakers": [
      {
        "key": "williamhill",
        "title": "William Hill",
        "last_update": "2025-03-01T12:00:00Z",
        "markets": [
          {
            "key": "h2h",
            "last_update": "2025-03-01T12:00:00Z",
            "outcomes": [
              { "name": "Arsenal", "price": 2.5 },
              { "name": "Chelsea", "price": 3.1 },
              { "name": "Draw", "price": 3.3 }
            ]
          }
        ]
      },
      {
        "key": "bet365",
        "title": "Bet365",
        "last_update": "2025-03-01T12:01:00Z",
        "markets": [
          {
            "key": "h2h",
            "outcomes": [
              { "name": "Arsenal", "price": 2.2 },
              { "name": "Chelsea", "price": 4.0 },
              { "name": "Draw", "price": 4.0 }
            ]
          }
        ]
      }
    ]
  },
  {
    "id": "evt-fair",
    "commence_time": "2025-03-08T17:30:00Z",
    "home_team": "Leeds",
    "away_team": "Burnley",
    "bookmakers": [
      {
        "key": "pinnacle",
        "title": "Pinnacle",
        "markets": [
          {
            "key": "h2h",
            "outcomes": [
              { "name": "Leeds", "price": 2.3 },
              { "name": "Burnley", "price": 3.0 },
              { "name": "Draw", "price": 3.4 }
            ]
          }
        ]
      }
    ]
  }
]"#;

/// Three full books, each holding the best price on one outcome.
fn three_way(match_id: &str, home: &str, draw: &str, away: &str) -> RawOddsBatchBuilder {
    RawOddsBatchBuilder::new()
        .quote("Alpha", match_id, "home", home)
        .quote("Alpha", match_id, "draw", "1.50")
        .quote("Alpha", match_id, "away", "1.50")
        .quote("Bravo", match_id, "home", "1.50")
        .quote("Bravo", match_id, "draw", draw)
        .quote("Bravo", match_id, "away", "1.50")
        .quote("Charlie", match_id, "home", "1.50")
        .quote("Charlie", match_id, "draw", "1.50")
        .quote("Charlie", match_id, "away", away)
}

/// Two full books, each holding the best price on one side.
fn two_way(
    builder: RawOddsBatchBuilder,
    match_id: &str,
    home: &str,
    away: &str,
) -> RawOddsBatchBuilder {
    builder
        .quote("Delta", match_id, "home", home)
        .quote("Delta", match_id, "away", "1.50")
        .quote("Echo", match_id, "home", "1.50")
        .quote("Echo", match_id, "away", away)
}

/// The illustrative README prices imply more than 100% and are not an arbitrage.
#[test]
fn illustrative_three_way_prices_are_not_an_arbitrage() {
    let batch = three_way("m1", "2.30", "3.40", "3.00").build();

    let report = scan(&batch, dec!(100)).unwrap();

    assert!(report.opportunities.is_empty());
    assert_eq!(report.stats.markets_grouped, 1);
    assert_eq!(report.stats.markets_incomplete, 0);
}

#[test]
fn three_way_arbitrage_is_staked_for_equal_payout() {
    let batch = three_way("m1", "2.50", "4.00", "4.00").build();

    let report = scan(&batch, dec!(900)).unwrap();

    assert_eq!(report.opportunities.len(), 1);
    let opp = &report.opportunities[0];
    assert_eq!(opp.market_type, MarketType::ThreeWay);
    assert_eq!(opp.implied_probability_sum, dec!(0.9));
    assert_eq!(opp.margin, dec!(0.1));

    let stakes: Vec<(Outcome, Decimal)> =
        opp.outcomes.iter().map(|l| (l.outcome, l.stake)).collect();
    assert_eq!(
        stakes,
        vec![
            (Outcome::Home, dec!(400)),
            (Outcome::Draw, dec!(250)),
            (Outcome::Away, dec!(250)),
        ]
    );
    assert_eq!(opp.guaranteed_return, dec!(1000));
    assert_eq!(opp.profit, dec!(100));
    assert_eq!(opp.roi_percent, dec!(11.1111));
}

#[test]
fn two_way_market_missing_away_is_incomplete() {
    let batch = RawOddsBatchBuilder::new()
        .quote("Alpha", "m2", "home", "2.10")
        .quote("Alpha", "m2", "away", "n/a")
        .quote("Bravo", "m2", "home", "2.20")
        .quote("Bravo", "m2", "away", "1.00")
        .build();

    let report = scan(&batch, dec!(100)).unwrap();

    assert!(report.opportunities.is_empty());
    assert_eq!(report.stats.rejected, 2);
    assert_eq!(report.stats.rejected_by_reason.get("odds_not_above_one"), Some(&1));
    assert_eq!(report.stats.rejected_by_reason.get("unparseable_odds"), Some(&1));
    assert_eq!(
        report.stats.incomplete_markets,
        vec![MarketKey::new("m2", MarketType::TwoWay)]
    );
}

#[test]
fn equal_best_odds_prefer_the_earlier_observation() {
    // Alpha quotes at 12:00; Aardvark matches its price later and sorts first by name.
    let late = datetime!(2025-03-01 12:05 UTC);
    let batch = three_way("m3", "2.50", "4.00", "4.00")
        .quote_at("Aardvark", "m3", "home", "2.50", late)
        .quote_at("Aardvark", "m3", "draw", "1.50", late)
        .quote_at("Aardvark", "m3", "away", "1.50", late)
        .build();

    let report = scan(&batch, dec!(900)).unwrap();

    let home = report.opportunities[0].leg(Outcome::Home).unwrap();
    assert_eq!(home.bookmaker, "Alpha");
    assert_eq!(home.odds, dec!(2.50));
}

#[test]
fn implied_sum_of_exactly_one_is_not_an_arbitrage() {
    let batch = two_way(RawOddsBatchBuilder::new(), "m4", "2.00", "2.00").build();

    let report = scan(&batch, dec!(100)).unwrap();

    assert_eq!(report.stats.markets_grouped, 1);
    assert!(report.opportunities.is_empty());
}

#[test]
fn mixed_price_formats_feed_one_market() {
    // 3/2 = 2.50 and +300 = 4.00
    let batch = three_way("m5", "3/2", "4.00", "+300").build();

    let report = scan(&batch, dec!(900)).unwrap();

    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.opportunities[0].guaranteed_return, dec!(1000));
}

#[test]
fn identical_batches_yield_identical_reports() {
    let batch = two_way(three_way("m1", "2.50", "4.00", "4.00"), "m2", "2.10", "2.10")
        .quote("Delta", "m6", "home", "1.50")
        .build();

    let first = scan(&batch, dec!(250)).unwrap();
    let second = scan(&batch, dec!(250)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn reports_are_ranked_and_stakes_are_conserved() {
    let batch = three_way("m1", "2.50", "4.00", "4.00");
    let batch = two_way(batch, "m2", "2.10", "2.10");
    let batch = two_way(batch, "m7", "2.07", "2.13").build();
    let total = dec!(333.33);

    let report = scan(&batch, total).unwrap();

    let ids: Vec<&str> = report
        .opportunities
        .iter()
        .map(|o| o.match_id.as_str())
        .collect();
    assert_eq!(ids, vec!["m1", "m2", "m7"]);

    for opp in &report.opportunities {
        let staked: Decimal = opp.outcomes.iter().map(|l| l.stake).sum();
        assert_eq!(staked, total);
        assert_eq!(opp.margin, Decimal::ONE - opp.implied_probability_sum);
        for leg in &opp.outcomes {
            assert!(leg.odds > Decimal::ONE);
            assert!(leg.stake * leg.odds >= opp.guaranteed_return);
        }
    }
}

#[test]
fn exact_allocation_pays_equally() {
    let batch = two_way(RawOddsBatchBuilder::new(), "m7", "2.07", "2.13").build();

    let report = scan_with(&batch, dec!(100), &StakeAllocator::exact()).unwrap();

    let payouts: Vec<Decimal> = report.opportunities[0]
        .outcomes
        .iter()
        .map(|l| l.stake * l.odds)
        .collect();
    let tolerance = payouts[0] * dec!(0.000001);
    assert!((payouts[0] - payouts[1]).abs() <= tolerance);
}

#[test]
fn non_positive_budget_is_rejected() {
    let batch = three_way("m1", "2.50", "4.00", "4.00").build();

    assert!(scan(&batch, Decimal::ZERO).is_err());
    assert!(scan(&batch, dec!(-5)).is_err());
}

#[test]
fn provider_payload_scans_end_to_end() {
    let events: Vec<ApiEvent> = serde_json::from_str(EVENTS_JSON).unwrap();
    let batch = events_to_batch(
        &events,
        football_arb::odds::OddsFormat::Decimal,
        OffsetDateTime::now_utc(),
    );

    let report = scan(&batch, dec!(900)).unwrap();

    assert_eq!(report.stats.entries_received, 9);
    assert_eq!(report.stats.markets_grouped, 2);
    assert_eq!(report.opportunities.len(), 1);

    let opp = &report.opportunities[0];
    assert_eq!(opp.match_id, "evt-arb");
    assert_eq!(opp.label.as_deref(), Some("Arsenal vs Chelsea"));
    assert_eq!(opp.leg(Outcome::Home).unwrap().bookmaker, "William Hill");
    assert_eq!(opp.leg(Outcome::Draw).unwrap().bookmaker, "Bet365");
    assert_eq!(opp.leg(Outcome::Away).unwrap().bookmaker, "Bet365");
    assert_eq!(opp.guaranteed_return, dec!(1000));
    assert!(opp.headline().starts_with("Arsenal vs Chelsea - KO 2025-03-08 15:00 UTC"));
}

fn fast_settings(total_stake: Decimal) -> SchedulerSettings {
    SchedulerSettings {
        interval: Duration::from_millis(25),
        fetch_attempts: 3,
        retry_backoff: Duration::from_millis(1),
        total_stake,
        allocator: StakeAllocator::default(),
    }
}

#[tokio::test]
async fn scheduler_publishes_each_polled_batch() {
    let source = MockOddsSource::with_config(MockConfig {
        transient_failures: 1,
        ..MockConfig::default()
    });
    source.push_batch(three_way("m1", "2.50", "4.00", "4.00").build());
    source.push_batch(three_way("m1", "2.30", "3.40", "3.00").build());
    let state = AppState::new();
    let scheduler = Scheduler::new(source.clone(), fast_settings(dec!(900)), state.clone());

    assert_eq!(
        scheduler.run_cycle().await.unwrap(),
        CycleOutcome::Published { opportunities: 1 }
    );
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(
        state.latest.read().await.as_ref().unwrap().opportunities[0].profit,
        dec!(100)
    );

    assert_eq!(
        scheduler.run_cycle().await.unwrap(),
        CycleOutcome::Published { opportunities: 0 }
    );
    assert!(state.latest.read().await.as_ref().unwrap().opportunities.is_empty());
    assert_eq!(state.scans_completed(), 2);
}

#[tokio::test]
async fn scheduler_keeps_last_report_when_fetch_fails() {
    let source = MockOddsSource::new();
    source.push_batch(three_way("m1", "2.50", "4.00", "4.00").build());
    let state = AppState::new();
    let scheduler = Scheduler::new(source, fast_settings(dec!(900)), state.clone());
    scheduler.run_cycle().await.unwrap();

    let failing = Scheduler::new(
        MockOddsSource::with_config(MockConfig {
            unauthorized: true,
            ..MockConfig::default()
        }),
        fast_settings(dec!(900)),
        state.clone(),
    );

    assert_eq!(failing.run_cycle().await.unwrap(), CycleOutcome::Skipped);
    assert_eq!(state.scans_completed(), 1);
    assert_eq!(
        state.latest.read().await.as_ref().unwrap().opportunities.len(),
        1
    );
}

/// Get a live config from environment.
fn live_config() -> Option<Config> {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("ODDS_API_KEY").ok()?;
    if api_key.trim().is_empty() {
        return None;
    }

    Some(Config {
        odds_api_key: api_key,
        ..Config::default()
    })
}

/// Test a live fetch and scan against The Odds API.
#[tokio::test]
#[ignore = "requires ODDS_API_KEY"]
async fn test_live_fetch_and_scan() {
    let config = match live_config() {
        Some(c) => c,
        None => {
            println!("Skipping: ODDS_API_KEY not set");
            return;
        }
    };

    let client = OddsApiClient::new(&config).expect("client");
    let batch = client.fetch_batch().await.expect("fetch");
    println!("Fetched {} entries", batch.entries.len());

    let report = scan(&batch, config.total_stake()).expect("scan");
    println!(
        "Markets: {} | Opportunities: {}",
        report.stats.markets_grouped,
        report.opportunities.len()
    );
    for opp in &report.opportunities {
        println!("{}", opp.headline());
    }
}
