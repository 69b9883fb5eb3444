use super::{CandidateScorer, ScoringContext};
use crate::config::RecommendationConfig;
use crate::services::preprocessor::DataPreprocessor;
use crate::utils::{cosine_similarity, weighted_average};
use std::collections::HashMap;

/// Cosine similarity between a candidate's feature row and the user's profile, the
/// engagement-weighted mean of the rows of videos the user interacted with.
#[derive(Debug, Clone, Default)]
pub struct ContentSimilarity {
    preprocessor: DataPreprocessor,
}

impl ContentSimilarity {
    pub fn new(preprocessor: DataPreprocessor) -> Self {
        Self { preprocessor }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(DataPreprocessor::from_config(config))
    }

    /// `None` when none of the user's videos are in the catalog.
    pub fn user_profile(&self, ctx: &ScoringContext<'_>) -> Option<Vec<f32>> {
        let positions: HashMap<&str, usize> = ctx
            .catalog
            .iter()
            .enumerate()
            .map(|(i, video)| (video.id.as_str(), i))
            .collect();

        let records = self.preprocessor.engagement_records(ctx.history);
        let normalized = self.preprocessor.preprocess_user_interactions(&records);

        let weighted_rows: Vec<(Vec<f32>, f32)> = normalized
            .iter()
            .filter_map(|interaction| {
                positions.get(interaction.video_id.as_str()).map(|&row| {
                    let weight = 1.0 + interaction.engagement() as f32;
                    (ctx.features.row(row), weight)
                })
            })
            .collect();

        if weighted_rows.is_empty() {
            return None;
        }

        Some(weighted_average(&weighted_rows))
    }
}

impl CandidateScorer for ContentSimilarity {
    fn name(&self) -> &'static str {
        "content_similarity"
    }

    fn score(&self, ctx: &ScoringContext<'_>, candidates: &[usize]) -> Vec<f32> {
        let Some(profile) = self.user_profile(ctx) else {
            return vec![0.0; candidates.len()];
        };

        candidates
            .iter()
            .map(|&index| {
                let row = ctx.features.row(index);
                cosine_similarity(&profile, &row).clamp(0.0, 1.0)
            })
            .collect()
    }
}
