pub mod collaborative;
pub mod content;
pub mod encoders;
pub mod tfidf;

pub use collaborative::CollaborativeFiltering;
pub use content::ContentSimilarity;

use crate::config::RecommendationConfig;
use crate::models::*;
use crate::services::preprocessor::VideoFeatures;
use crate::utils::sort_by_score_desc;

/// Everything a scorer may look at for one request. `features` rows line up with
/// `catalog`; candidates are passed as indices into `catalog`.
pub struct ScoringContext<'a> {
    pub user: &'a User,
    pub history: &'a UserInteractions,
    pub community: &'a UserInteractions,
    pub catalog: &'a [Video],
    pub features: &'a VideoFeatures,
}

pub trait CandidateScorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// One score in [0, 1] per candidate, in candidate order.
    fn score(&self, ctx: &ScoringContext<'_>, candidates: &[usize]) -> Vec<f32>;
}

/// Fixed-weight blend of a content scorer and a collaborative scorer.
pub struct HybridScorer {
    content: Box<dyn CandidateScorer>,
    collaborative: Box<dyn CandidateScorer>,
    content_weight: f32,
    collab_weight: f32,
}

impl HybridScorer {
    pub fn new(
        content: Box<dyn CandidateScorer>,
        collaborative: Box<dyn CandidateScorer>,
        content_weight: f32,
        collab_weight: f32,
    ) -> Self {
        Self {
            content,
            collaborative,
            content_weight,
            collab_weight,
        }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(
            Box::new(ContentSimilarity::from_config(config)),
            Box::new(CollaborativeFiltering::from_config(config)),
            config.content_weight,
            config.collab_weight,
        )
    }

    pub fn score(&self, ctx: &ScoringContext<'_>, candidates: &[usize]) -> Vec<f32> {
        let content = self.content.score(ctx, candidates);
        let collab = self.collaborative.score(ctx, candidates);

        tracing::debug!(
            content = self.content.name(),
            collaborative = self.collaborative.name(),
            candidates = candidates.len(),
            "Scored candidates"
        );

        content
            .iter()
            .zip(collab.iter())
            .map(|(c, f)| self.content_weight * c + self.collab_weight * f)
            .collect()
    }
}

/// Scales every score by its video's category popularity boost.
pub fn apply_category_boost(recommendations: &mut [Recommendation], config: &RecommendationConfig) {
    for rec in recommendations.iter_mut() {
        if let Some(category) = rec.video.category.as_deref() {
            rec.score *= config.category_boost(category);
        }
    }
}

/// Scales every score by the mood's weight (1.0 for unknown moods) and re-sorts.
pub fn apply_mood_boost(
    mut recommendations: Vec<Recommendation>,
    mood: Option<&str>,
    config: &RecommendationConfig,
) -> Vec<Recommendation> {
    let Some(mood) = mood else {
        return recommendations;
    };

    let weight = config.mood_weight(mood);
    for rec in recommendations.iter_mut() {
        rec.score *= weight;
    }

    sort_by_score_desc(&mut recommendations);
    recommendations
}
