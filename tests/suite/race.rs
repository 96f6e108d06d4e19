//! Coordinator behavior through the public API, under paused time.

use std::time::Duration;

use lookout_core::{FailureKind, Outcome, Query, Race, RacePhase, race};
use tokio::time::Instant;

use crate::common::{LiveCounter, Script, scripted};

fn query() -> Query {
    Query::new("01153000").unwrap()
}

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test(start_paused = true)]
async fn fastest_success_wins_before_slower_one_finishes() {
    let live = LiveCounter::default();
    let providers = vec![
        scripted("a", Duration::from_millis(50), Script::Succeed, &live),
        scripted("b", Duration::from_millis(300), Script::Succeed, &live),
    ];

    let started = Instant::now();
    let report = Race::new(providers, TIMEOUT).run(query()).await;

    let winner = report.outcome.winner().expect("race should be won");
    assert_eq!(winner.provider().as_str(), "a");
    assert_eq!(winner.field("postal_code"), Some("01153000"));
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(report.failures.is_empty());
    assert_eq!(report.launched, 2);
}

#[tokio::test(start_paused = true)]
async fn all_failures_resolve_before_deadline() {
    let live = LiveCounter::default();
    let providers = vec![
        scripted("a", Duration::from_millis(10), Script::Fail(FailureKind::NotFound), &live),
        scripted("b", Duration::from_millis(20), Script::Fail(FailureKind::Status(500)), &live),
    ];

    let started = Instant::now();
    let report = Race::new(providers, TIMEOUT).run(query()).await;

    assert_eq!(report.outcome, Outcome::AllFailed);
    assert!(started.elapsed() < TIMEOUT);
    let kinds: Vec<FailureKind> = report.failures.iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, [FailureKind::NotFound, FailureKind::Status(500)]);
}

#[tokio::test(start_paused = true)]
async fn stalled_provider_times_out_at_deadline() {
    let live = LiveCounter::default();
    let providers = vec![scripted("a", Duration::ZERO, Script::Stall, &live)];

    let started = Instant::now();
    let outcome = race(&query(), &providers, TIMEOUT).await;

    assert_eq!(outcome, Outcome::TimedOut);
    assert!(started.elapsed() >= TIMEOUT);
    assert_eq!(outcome.phase(), RacePhase::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn early_failure_does_not_end_the_race() {
    let live = LiveCounter::default();
    let providers = vec![
        scripted("a", Duration::from_millis(10), Script::Fail(FailureKind::Transport), &live),
        scripted("b", Duration::from_millis(200), Script::Succeed, &live),
    ];

    let report = Race::new(providers, TIMEOUT).run(query()).await;

    assert_eq!(report.outcome.winner().map(|w| w.provider().as_str()), Some("b"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].provider().as_str(), "a");
}

#[tokio::test(start_paused = true)]
async fn failure_plus_stall_is_timeout_not_all_failed() {
    let live = LiveCounter::default();
    let providers = vec![
        scripted("a", Duration::from_millis(10), Script::Fail(FailureKind::Decode), &live),
        scripted("b", Duration::ZERO, Script::Stall, &live),
    ];

    let report = Race::new(providers, TIMEOUT).run(query()).await;

    assert_eq!(report.outcome, Outcome::TimedOut);
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn losers_are_released_after_grace_period() {
    let live = LiveCounter::default();
    let providers = vec![
        scripted("fast", Duration::from_millis(5), Script::Succeed, &live),
        scripted("slow", Duration::from_secs(30), Script::Succeed, &live),
        scripted("stuck", Duration::ZERO, Script::Stall, &live),
        scripted("deaf", Duration::ZERO, Script::IgnoreSignal, &live),
    ];

    let grace = Duration::from_millis(100);
    let report = Race::new(providers, TIMEOUT)
        .with_grace_period(grace)
        .run(query())
        .await;
    assert_eq!(report.outcome.winner().map(|w| w.provider().as_str()), Some("fast"));

    tokio::time::sleep(grace * 2).await;
    assert_eq!(live.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_races_share_nothing() {
    let live = LiveCounter::default();
    for _ in 0..3 {
        let providers = vec![
            scripted("a", Duration::from_millis(20), Script::Succeed, &live),
            scripted("b", Duration::ZERO, Script::Stall, &live),
        ];
        let outcome = race(&query(), &providers, TIMEOUT).await;
        assert!(matches!(outcome, Outcome::Won(_)));
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(live.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_provider_set_is_all_failed() {
    let report = Race::new(Vec::new(), TIMEOUT).run(query()).await;
    assert_eq!(report.outcome, Outcome::AllFailed);
    assert_eq!(report.launched, 0);
}
