//! Show a single results file

use anyhow::Result;
use colored::Colorize;
use evalstore::{EstimatorKind, ResultsConfig, ScoredRun, TimedRun};
use serde_json::json;
use std::path::Path;
use tabled::Tabled;

use crate::output::{color_state, format_millis, format_score, print_warning, OutputFormat};

/// Row for the run metadata table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn score_name(kind: EstimatorKind) -> &'static str {
    match kind {
        EstimatorKind::Regression => "MSE",
        EstimatorKind::Classification | EstimatorKind::Clustering => "Accuracy",
    }
}

/// Show metadata and statistics of a results file
pub fn show_results(
    kind: EstimatorKind,
    path: &Path,
    config: ResultsConfig,
    format: OutputFormat,
) -> Result<()> {
    let mut loaded = super::load(kind, path, config)?;
    let results = loaded.as_scored_mut();
    results.compute_all_stats_once()?;
    let results = loaded.as_scored();

    match format {
        OutputFormat::Json => {
            let value = json!({
                "kind": kind,
                "state": results.state(),
                "metadata": results.metadata(),
                "num_instances": results.num_instances(),
                "score": results.primary_score(),
                "has_distributions": results.has_probability_distribution_information(),
                "stats": results.stats_json(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            let m = results.metadata();
            println!("{}", "Results".bold());
            println!("{}", "=".repeat(50));

            let rows = vec![
                FieldRow { field: "Dataset", value: m.dataset_name.cyan().to_string() },
                FieldRow { field: "Estimator", value: m.estimator_name.cyan().to_string() },
                FieldRow { field: "Split", value: m.split.clone() },
                FieldRow { field: "Fold", value: m.fold_id.to_string() },
                FieldRow { field: "State", value: color_state(results.state()) },
                FieldRow { field: "Instances", value: results.num_instances().to_string() },
                FieldRow { field: score_name(kind), value: format_score(results.primary_score()) },
                FieldRow { field: "Build time", value: format_millis(results.build_time_millis()) },
                FieldRow { field: "Test time", value: format_millis(results.total_test_time_millis()) },
                FieldRow { field: "Description", value: m.description.clone() },
            ];
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if kind.has_distributions() && !results.has_probability_distribution_information() {
                print_warning("No probability distributions, distribution-based stats unavailable");
            }

            if let Some(stats) = results.stats_to_string() {
                println!();
                println!("{}", "Statistics".bold());
                println!("{}", "-".repeat(50));
                print!("{}", stats);
            }
        }
    }

    Ok(())
}
