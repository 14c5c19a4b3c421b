use ecogate_core::{load_history, render_chart, ChartOptions, Config, HistorySummary};

use super::Overrides;

/// Render the decision history. Failures are reported, never returned.
pub fn run(overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = plot(overrides) {
        eprintln!("Failed to visualize logs: {e}");
    }
    Ok(())
}

fn plot(overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let threshold = overrides.threshold(&config);
    let records = load_history(&overrides.log_path(&config))?;

    let summary = HistorySummary::from_records(&records, threshold);
    if overrides.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Eco Damage Over Time");
    print!(
        "{}",
        render_chart(
            &records,
            ChartOptions {
                threshold: Some(threshold),
                ..ChartOptions::default()
            },
        )?
    );
    if let Some(s) = summary {
        println!(
            "min {:.4}  max {:.4}  mean {:.4}  green {}/{}",
            s.min, s.max, s.mean, s.green, s.count
        );
    }
    Ok(())
}
