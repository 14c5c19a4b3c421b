//! Integration tests for the decision flow: provider -> log -> gate -> workload.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use ecogate_core::{
    load_history, render_chart, run_when_green, CancelToken, CarbonConfig,
    CarbonIntensityProvider, ChartOptions, DecisionLog, EcoAgent, FixedClock, HistorySummary,
    Outcome, PollOptions, PollOutcome, Provenance, ScriptedProvider, SumOfSquares, Threshold,
};
use rand::SeedableRng;
use std::time::Duration;
use tempfile::TempDir;

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_wait_until_green_then_plot_history() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("eco_log.txt");

    let mut agent = EcoAgent::new(
        ScriptedProvider::new(vec![0.5, 0.5, 0.2]),
        DecisionLog::new(&log_path)
            .with_clock(FixedClock::new(start()).stepping(ChronoDuration::minutes(1))),
        SumOfSquares::new(10),
        Threshold::new(0.3).unwrap(),
    );

    let options = PollOptions {
        check_interval: Duration::ZERO,
        max_wait: None,
    };
    let outcome = run_when_green(&mut agent, &options, &CancelToken::new()).unwrap();

    match outcome {
        PollOutcome::Green { ticks, reading, report } => {
            assert_eq!(ticks, 3);
            assert_eq!(reading.index.value(), 0.2);
            assert_eq!(report.result, "285");
        }
        other => panic!("expected green outcome, got {other:?}"),
    }

    let records = load_history(&log_path).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].timestamp, start());
    assert_eq!(records[2].timestamp, start() + ChronoDuration::minutes(2));

    let summary = HistorySummary::from_records(&records, agent.threshold()).unwrap();
    assert_eq!(summary.green, 1);

    let chart = render_chart(
        &records,
        ChartOptions {
            threshold: Some(agent.threshold()),
            ..ChartOptions::default()
        },
    )
    .unwrap();
    assert!(chart.contains("(3 records)"));
}

#[test]
fn test_history_survives_multiple_runs() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("eco_log.txt");

    for run in 0..3 {
        let mut agent = EcoAgent::new(
            ScriptedProvider::new(vec![0.9]),
            DecisionLog::new(&log_path),
            SumOfSquares::new(1),
            Threshold::default(),
        );
        let decision = agent.maybe_compute(false).unwrap();
        assert_eq!(decision.outcome, Outcome::Deferred);
        assert_eq!(load_history(&log_path).unwrap().len(), run + 1);
    }
}

#[test]
fn test_live_provider_drives_decision() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v3/carbon-intensity/latest")
        .match_query(mockito::Matcher::UrlEncoded("zone".into(), "FR".into()))
        .match_header("auth-token", "token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"zone":"FR","carbonIntensity":{"gCO2eqPerkWh":80}}"#)
        .create();

    let settings = CarbonConfig {
        endpoint: format!("{}/v3/carbon-intensity/latest", server.url()),
        zone: "FR".into(),
        ..CarbonConfig::default()
    };
    let provider = CarbonIntensityProvider::new(settings, Some("token-123".into()))
        .with_rng(rand_pcg::Pcg64::seed_from_u64(1));

    let dir = TempDir::new().unwrap();
    let mut agent = EcoAgent::new(
        provider,
        DecisionLog::new(dir.path().join("eco_log.txt")),
        SumOfSquares::new(3),
        Threshold::new(0.3).unwrap(),
    );

    let decision = agent.maybe_compute(false).unwrap();
    mock.assert();

    assert!(decision.computed());
    assert_eq!(decision.reading.index.value(), 0.1);
    assert!(decision.reading.provenance.is_live());
}

#[test]
fn test_failed_fetch_is_observable_but_not_an_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/latest")
        .match_query(mockito::Matcher::Any)
        .with_status(401)
        .create();

    let settings = CarbonConfig {
        endpoint: format!("{}/latest", server.url()),
        ..CarbonConfig::default()
    };
    let provider = CarbonIntensityProvider::new(settings, Some("bad".into()));

    let dir = TempDir::new().unwrap();
    let mut agent = EcoAgent::new(
        provider,
        DecisionLog::new(dir.path().join("eco_log.txt")),
        SumOfSquares::new(3),
        Threshold::default(),
    );

    let decision = agent.maybe_compute(true).unwrap();
    assert!(decision.computed());
    assert!(matches!(
        decision.reading.provenance,
        Provenance::FetchFailedFallback { .. }
    ));
    assert!((0.0..=1.0).contains(&decision.reading.index.value()));
}
