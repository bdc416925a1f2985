//! Command-line interface for the credit-default experiment

use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{run_experiment_with, ExperimentConfig, StageEvent, DEFAULT_DATA_PATH};

#[derive(Parser, Debug)]
#[command(name = "credit_default")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Credit-default classification experiment: k-means SMOTE, min-max scaling, boosted trees")]
#[command(long_about = None)]
pub struct Cli {
    /// Input CSV file
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Seed for resampling, splitting and boosting (unseeded when omitted)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Also write the result report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

impl Cli {
    pub fn to_config(&self) -> ExperimentConfig {
        ExperimentConfig::new()
            .with_data_path(self.data.clone())
            .with_random_state(self.seed)
    }
}

/// Run the experiment and print its results to stdout
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let outcome = run_experiment_with(&cli.to_config(), |event| match event {
        StageEvent::Resampled(histogram) => println!("{:?}", histogram),
        StageEvent::Split(shapes) => println!("{}", shapes),
    })?;

    for line in outcome.score_lines() {
        println!("{}", line);
    }
    println!();
    outcome.report.print();

    if let Some(path) = &cli.report_json {
        outcome.report.save_json(path)?;
        tracing::info!(path = %path.display(), "Saved report");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["credit_default"]);
        assert_eq!(cli.data, PathBuf::from(DEFAULT_DATA_PATH));
        assert!(cli.seed.is_none());
        assert!(cli.report_json.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "credit_default",
            "--data",
            "cc.csv",
            "--seed",
            "42",
            "--report-json",
            "out.json",
        ]);
        let config = cli.to_config();
        assert_eq!(config.data_path, PathBuf::from("cc.csv"));
        assert_eq!(config.random_state, Some(42));
        assert_eq!(cli.report_json, Some(PathBuf::from("out.json")));
    }
}
