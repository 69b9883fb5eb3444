use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Recommendation;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("length mismatch: {predicted} predicted values vs {actual} actual values")]
    LengthMismatch { predicted: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub precision_at_10: f64,
    pub recall_at_10: f64,
    pub mae: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    k: usize,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl MetricsCalculator {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn hits(&self, recommended: &[Recommendation], relevant: &[String]) -> usize {
        let relevant_set: HashSet<&str> = relevant.iter().map(String::as_str).collect();
        let recommended_ids: HashSet<&str> = recommended
            .iter()
            .take(self.k)
            .map(|rec| rec.video.id.as_str())
            .collect();

        recommended_ids.intersection(&relevant_set).count()
    }

    /// Hits in the top k divided by the nominal k, even when fewer than k items
    /// were recommended.
    pub fn precision_at_k(&self, recommended: &[Recommendation], relevant: &[String]) -> f64 {
        if self.k == 0 {
            return 0.0;
        }

        self.hits(recommended, relevant) as f64 / self.k as f64
    }

    pub fn recall_at_k(&self, recommended: &[Recommendation], relevant: &[String]) -> f64 {
        if relevant.is_empty() {
            return 0.0;
        }

        let distinct_relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
        self.hits(recommended, relevant) as f64 / distinct_relevant.len() as f64
    }

    /// Scores recommendations against caller-supplied ground truth. `actual[i]` is the
    /// true relevance of `recommendations[i]`.
    pub fn evaluate_recommendations(
        &self,
        recommendations: &[Recommendation],
        relevant: &[String],
        actual: &[f64],
    ) -> Result<EvaluationReport, MetricsError> {
        let predicted: Vec<f64> = recommendations.iter().map(|rec| rec.score as f64).collect();

        Ok(EvaluationReport {
            precision_at_10: self.precision_at_k(recommendations, relevant),
            recall_at_10: self.recall_at_k(recommendations, relevant),
            mae: mean_absolute_error(&predicted, actual)?,
            rmse: root_mean_square_error(&predicted, actual)?,
        })
    }
}

pub fn precision_at_k(recommended: &[Recommendation], relevant: &[String], k: usize) -> f64 {
    MetricsCalculator::new(k).precision_at_k(recommended, relevant)
}

pub fn recall_at_k(recommended: &[Recommendation], relevant: &[String], k: usize) -> f64 {
    MetricsCalculator::new(k).recall_at_k(recommended, relevant)
}

fn check_lengths(predicted: &[f64], actual: &[f64]) -> Result<(), MetricsError> {
    if predicted.len() != actual.len() {
        return Err(MetricsError::LengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(predicted, actual)?;
    if predicted.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .sum();

    Ok(total / predicted.len() as f64)
}

pub fn root_mean_square_error(predicted: &[f64], actual: &[f64]) -> Result<f64, MetricsError> {
    check_lengths(predicted, actual)?;
    if predicted.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();

    Ok((total / predicted.len() as f64).sqrt())
}

pub fn evaluate_recommendations(
    recommendations: &[Recommendation],
    relevant: &[String],
    actual: &[f64],
) -> Result<EvaluationReport, MetricsError> {
    MetricsCalculator::default().evaluate_recommendations(recommendations, relevant, actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Video;

    fn recs(ids: &[&str]) -> Vec<Recommendation> {
        ids.iter()
            .map(|id| Recommendation::new(Video::new(*id, ""), 1.0))
            .collect()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_precision_divides_by_nominal_k() {
        let recommended = recs(&["A", "B"]);
        let precision = precision_at_k(&recommended, &ids(&["A"]), 10);
        assert!((precision - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_precision_only_counts_top_k() {
        let recommended = recs(&["A", "B", "C"]);
        assert_eq!(precision_at_k(&recommended, &ids(&["C"]), 2), 0.0);
        assert_eq!(precision_at_k(&recommended, &ids(&["A", "B"]), 2), 1.0);
        assert_eq!(precision_at_k(&recommended, &ids(&["A"]), 0), 0.0);
    }

    #[test]
    fn test_recall_with_empty_relevant_is_zero() {
        assert_eq!(recall_at_k(&recs(&["A", "B"]), &[], 10), 0.0);
        assert_eq!(recall_at_k(&[], &[], 10), 0.0);
    }

    #[test]
    fn test_recall() {
        let recommended = recs(&["A", "B", "C"]);
        assert_eq!(recall_at_k(&recommended, &ids(&["A", "D"]), 10), 0.5);
    }

    #[test]
    fn test_mae_and_rmse() {
        let predicted = [1.0, 2.0, 3.0];
        let actual = [1.0, 2.0, 5.0];
        let mae = mean_absolute_error(&predicted, &actual).unwrap();
        let rmse = root_mean_square_error(&predicted, &actual).unwrap();
        assert!((mae - 2.0 / 3.0).abs() < 1e-12);
        assert!((rmse - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let err = mean_absolute_error(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, MetricsError::LengthMismatch { predicted: 2, actual: 1 });
        assert!(root_mean_square_error(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_evaluate_recommendations() {
        let mut recommended = recs(&["A", "B"]);
        recommended[1].score = 0.5;

        let report = evaluate_recommendations(&recommended, &ids(&["A"]), &[1.0, 1.0]).unwrap();
        assert!((report.precision_at_10 - 0.1).abs() < 1e-12);
        assert_eq!(report.recall_at_10, 1.0);
        assert!((report.mae - 0.25).abs() < 1e-12);
        assert!((report.rmse - 0.125f64.sqrt()).abs() < 1e-12);

        assert!(evaluate_recommendations(&recommended, &ids(&["A"]), &[1.0]).is_err());
    }
}
