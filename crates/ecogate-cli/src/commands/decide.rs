use ecogate_core::{
    run_when_green, CancelToken, CarbonIntensityProvider, Config, DecisionLog, EcoAgent,
    IndexReading, Outcome, PollOptions, PollOutcome, Provenance, SumOfSquares,
};
use std::time::Duration;

use super::Overrides;

fn build_agent(
    config: &Config,
    overrides: &Overrides,
) -> EcoAgent<CarbonIntensityProvider, SumOfSquares> {
    EcoAgent::new(
        CarbonIntensityProvider::from_env(config.carbon.clone()),
        DecisionLog::new(overrides.log_path(config)),
        SumOfSquares::default(),
        overrides.threshold(config),
    )
}

fn describe(reading: &IndexReading) -> String {
    let source = match &reading.provenance {
        Provenance::Simulated => "simulated".to_string(),
        Provenance::Fetched { raw_gco2_per_kwh } => {
            format!("{raw_gco2_per_kwh} gCO2eq/kWh")
        }
        Provenance::FetchFailedFallback { .. } => "simulated after fetch failure".to_string(),
    };
    format!("Current Damage Index: {:.2} ({source})", reading.index.value())
}

/// Single evaluation.
pub fn once(force: bool, overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut agent = build_agent(&config, overrides);
    let decision = agent.maybe_compute(force)?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!("{}", describe(&decision.reading));
    match &decision.outcome {
        Outcome::Computed { report, .. } => {
            println!("Green condition met. Ran task.");
            println!("Task complete. Result: {}", report.result);
        }
        Outcome::Deferred => println!("Too much damage. Waiting for better conditions."),
    }
    Ok(())
}

/// Poll until green, then run once.
pub fn wait(overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut agent = build_agent(&config, overrides);
    let options = PollOptions {
        check_interval: Duration::from_secs(
            overrides.interval_secs.unwrap_or(config.check_interval_secs),
        ),
        max_wait: overrides.max_wait_secs.map(Duration::from_secs),
    };

    let outcome = run_when_green(&mut agent, &options, &CancelToken::new())?;

    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        PollOutcome::Green {
            ticks,
            reading,
            report,
        } => {
            println!("{}", describe(reading));
            println!(
                "Conditions met after {ticks} check(s). Task complete. Result: {}",
                report.result
            );
        }
        PollOutcome::TimedOut { ticks } => {
            println!("Gave up after {ticks} check(s): conditions never turned green.");
        }
        PollOutcome::Cancelled { ticks } => {
            println!("Cancelled after {ticks} check(s).");
        }
    }
    Ok(())
}
