use anyhow::{Context, Result};
use clap::Parser;
use flicrec::utils::metrics::{EvaluationReport, MetricsCalculator};
use flicrec::{init_tracing, AppState, Config, FeedRequest, Recommendation};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Offline ranking evaluation: precision@10, recall@10, MAE and RMSE.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long)]
    log_level: Option<String>,

    /// JSON file with `recommendations`, `relevant` and `actual`.
    #[arg(short, long, conflicts_with = "username")]
    input: Option<String>,

    /// Run the live engine for this user instead of reading `--input`.
    #[arg(short, long)]
    username: Option<String>,

    /// Comma separated ids of videos the user actually found relevant.
    #[arg(short, long, value_delimiter = ',')]
    relevant: Vec<String>,

    /// Optional JSON object of video id -> true score for the live run. Without it a
    /// recommendation's true score is 1.0 when relevant and 0.0 otherwise.
    #[arg(long)]
    labels: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvaluationSet {
    recommendations: Vec<Recommendation>,
    relevant: Vec<String>,
    actual: Vec<f64>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path))
}

fn ground_truth(
    recommendations: &[Recommendation],
    relevant: &[String],
    labels: Option<&HashMap<String, f64>>,
) -> Vec<f64> {
    let relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
    recommendations
        .iter()
        .map(|rec| match labels {
            Some(labels) => labels.get(&rec.video.id).copied().unwrap_or(0.0),
            None if relevant.contains(rec.video.id.as_str()) => 1.0,
            None => 0.0,
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)?;
    if let Some(level) = args.log_level.clone() {
        config.logging.level = level;
    }
    init_tracing(&config.logging)?;

    let calculator = MetricsCalculator::default();

    let report: EvaluationReport = match (&args.input, &args.username) {
        (Some(path), _) => {
            let set: EvaluationSet = read_json(path)?;
            info!(recommendations = set.recommendations.len(), "Evaluating stored ranking");
            calculator.evaluate_recommendations(&set.recommendations, &set.relevant, &set.actual)?
        }
        (None, Some(username)) => {
            let state = AppState::new(config.clone())?;
            let request = FeedRequest::new(username.as_str())
                .with_limit(config.recommendation.default_limit.max(calculator.k()));
            let recommendations = state.recommendation_service.get_recommendations(&request).await;

            let labels: Option<HashMap<String, f64>> =
                args.labels.as_deref().map(read_json::<HashMap<String, f64>>).transpose()?;
            let actual = ground_truth(&recommendations, &args.relevant, labels.as_ref());

            info!(username = %username, recommendations = recommendations.len(), "Evaluating live ranking");
            calculator.evaluate_recommendations(&recommendations, &args.relevant, &actual)?
        }
        (None, None) => anyhow::bail!("either --input or --username is required"),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicrec::Video;

    #[test]
    fn test_ground_truth_from_relevant_set() {
        let recs = vec![
            Recommendation::new(Video::new("a", ""), 0.9),
            Recommendation::new(Video::new("b", ""), 0.4),
        ];
        let actual = ground_truth(&recs, &["b".to_string()], None);
        assert_eq!(actual, vec![0.0, 1.0]);
    }

    #[test]
    fn test_ground_truth_from_labels() {
        let recs = vec![Recommendation::new(Video::new("a", ""), 0.9)];
        let labels: HashMap<String, f64> = [("a".to_string(), 0.7)].into_iter().collect();
        assert_eq!(ground_truth(&recs, &[], Some(&labels)), vec![0.7]);
    }
}
