use crate::algorithms::{apply_category_boost, apply_mood_boost, HybridScorer, ScoringContext};
use crate::config::RecommendationConfig;
use crate::models::*;
use crate::services::api_client::FeedDataSource;
use crate::services::preprocessor::DataPreprocessor;
use crate::utils::sort_by_score_desc;
use crate::utils::validation::validate_feature_matrix;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the feed pipeline: fetch, filter, score, boost, rank, truncate. Holds no
/// per-request state.
pub struct RecommendationService {
    data_source: Arc<dyn FeedDataSource>,
    preprocessor: DataPreprocessor,
    scorer: HybridScorer,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(data_source: Arc<dyn FeedDataSource>, config: RecommendationConfig) -> Self {
        let scorer = HybridScorer::from_config(&config);
        Self::with_scorer(data_source, scorer, config)
    }

    pub fn with_scorer(
        data_source: Arc<dyn FeedDataSource>,
        scorer: HybridScorer,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            data_source,
            preprocessor: DataPreprocessor::from_config(&config),
            scorer,
            config,
        }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub async fn get_recommendations(&self, request: &FeedRequest) -> Vec<Recommendation> {
        let (history, community, catalog) = futures::join!(
            self.data_source.get_user_interactions(&request.username),
            self.data_source.get_community_interactions(),
            self.data_source.get_videos(),
        );

        if catalog.is_empty() {
            warn!(username = %request.username, "No candidate videos available");
            return Vec::new();
        }

        let candidates = filter_by_category(&catalog, request.category_id.as_deref());
        if candidates.is_empty() {
            info!(
                username = %request.username,
                category_id = ?request.category_id,
                "No candidates match the category filter"
            );
            return Vec::new();
        }

        let user = User::from_interactions(&request.username, &history);
        // One joint fit over the whole catalog so history rows and candidate rows share
        // the same encoding.
        let features = self.preprocessor.extract_video_features(&catalog);
        if let Err(e) = validate_feature_matrix(&features.matrix) {
            warn!(username = %request.username, error = %e, "Discarding unusable feature matrix");
            return Vec::new();
        }

        let ctx = ScoringContext {
            user: &user,
            history: &history,
            community: &community,
            catalog: &catalog,
            features: &features,
        };
        let scores = self.scorer.score(&ctx, &candidates);

        let mut recommendations: Vec<Recommendation> = candidates
            .iter()
            .zip(scores)
            .map(|(&index, score)| Recommendation::new(catalog[index].clone(), score))
            .collect();

        if self.config.category_boost_enabled {
            apply_category_boost(&mut recommendations, &self.config);
        }
        sort_by_score_desc(&mut recommendations);
        let mut recommendations = apply_mood_boost(recommendations, request.mood.as_deref(), &self.config);
        recommendations.truncate(request.limit);

        debug!(
            username = %request.username,
            history = history.len(),
            history_items = user.interacted_items().count(),
            community = community.len(),
            catalog = catalog.len(),
            returned = recommendations.len(),
            "Built recommendations"
        );

        recommendations
    }
}

/// Indices of videos whose `category_id` equals `category_id` exactly; all indices
/// when no filter is given.
pub fn filter_by_category(videos: &[Video], category_id: Option<&str>) -> Vec<usize> {
    videos
        .iter()
        .enumerate()
        .filter(|(_, video)| match category_id {
            Some(wanted) => video.category_id.as_deref() == Some(wanted),
            None => true,
        })
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn videos() -> Vec<Video> {
        vec![
            Video::new("m1", "").with_category_id("music"),
            Video::new("s1", "").with_category_id("sports"),
            Video::new("m2", "").with_category_id("music"),
            Video::new("x1", ""),
        ]
    }

    #[test]
    fn test_filter_by_category() {
        let videos = videos();
        assert_eq!(filter_by_category(&videos, Some("music")), vec![0, 2]);
        assert_eq!(filter_by_category(&videos, Some("sports")), vec![1]);
        assert!(filter_by_category(&videos, Some("cooking")).is_empty());
        assert_eq!(filter_by_category(&videos, None), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_filter_is_exact_match() {
        let videos = videos();
        assert!(filter_by_category(&videos, Some("Music")).is_empty());
    }
}
