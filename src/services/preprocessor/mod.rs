use crate::algorithms::encoders::{MultiLabelBinarizer, OneHotEncoder, StandardScaler};
use crate::algorithms::tfidf::TfidfVectorizer;
use crate::config::RecommendationConfig;
use crate::models::*;
use crate::utils::min_max_scale;
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const NUMERICAL_COLUMNS: [&str; 6] = [
    "views",
    "likes",
    "duration",
    "engagement_score",
    "creation_timestamp",
    "popularity_score",
];

const UNKNOWN: &str = "unknown";

/// Per-video engagement of one user, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub video_id: String,
    pub views: Option<f64>,
    pub likes: Option<f64>,
    pub ratings: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInteraction {
    pub video_id: String,
    pub views: f64,
    pub likes: f64,
    pub ratings: f64,
}

impl NormalizedInteraction {
    pub fn engagement(&self) -> f64 {
        self.views + self.likes + self.ratings
    }
}

/// Widths of the blocks making up a feature row, in column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureLayout {
    pub text: usize,
    pub numerical: usize,
    pub categorical: usize,
    pub tags: usize,
}

impl FeatureLayout {
    pub fn width(&self) -> usize {
        self.text + self.numerical + self.categorical + self.tags
    }
}

#[derive(Debug, Clone)]
pub struct VideoFeatures {
    pub matrix: Array2<f32>,
    pub layout: FeatureLayout,
}

impl VideoFeatures {
    pub fn row(&self, index: usize) -> Vec<f32> {
        self.matrix.row(index).to_vec()
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }
}

#[derive(Debug, Clone)]
pub struct DataPreprocessor {
    max_text_features: usize,
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new(50)
    }
}

impl DataPreprocessor {
    pub fn new(max_text_features: usize) -> Self {
        Self { max_text_features }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(config.max_text_features)
    }

    /// Fills missing counters with zero and min-max scales `views`, `likes` and
    /// `ratings` independently.
    pub fn preprocess_user_interactions(&self, records: &[InteractionRecord]) -> Vec<NormalizedInteraction> {
        let column = |f: fn(&InteractionRecord) -> Option<f64>| -> Vec<f64> {
            records.iter().map(|r| f(r).unwrap_or(0.0)).collect()
        };

        let views = min_max_scale(&column(|r| r.views));
        let likes = min_max_scale(&column(|r| r.likes));
        let ratings = min_max_scale(&column(|r| r.ratings));

        records
            .iter()
            .enumerate()
            .map(|(i, record)| NormalizedInteraction {
                video_id: record.video_id.clone(),
                views: views[i],
                likes: likes[i],
                ratings: ratings[i],
            })
            .collect()
    }

    /// Collapses a user's history into one record per video: view count, like count
    /// (likes and inspirations) and mean rating. Order follows first appearance.
    pub fn engagement_records(&self, history: &UserInteractions) -> Vec<InteractionRecord> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut records: Vec<InteractionRecord> = Vec::new();
        let mut rating_counts: Vec<f64> = Vec::new();

        for event in history.iter() {
            let slot = *index.entry(event.video_id.clone()).or_insert_with(|| {
                records.push(InteractionRecord {
                    video_id: event.video_id.clone(),
                    ..Default::default()
                });
                rating_counts.push(0.0);
                records.len() - 1
            });
            let record = &mut records[slot];

            match event.kind {
                InteractionKind::View => *record.views.get_or_insert(0.0) += 1.0,
                InteractionKind::Like | InteractionKind::Inspire => {
                    *record.likes.get_or_insert(0.0) += 1.0
                }
                InteractionKind::Rating => {
                    if let Some(value) = event.value {
                        *record.ratings.get_or_insert(0.0) += value;
                        rating_counts[slot] += 1.0;
                    }
                }
            }
        }

        for (record, count) in records.iter_mut().zip(rating_counts) {
            if count > 0.0 {
                if let Some(total) = record.ratings.as_mut() {
                    *total /= count;
                }
            }
        }

        records
    }

    /// Feature rows for `videos`, with every encoder fitted jointly over this batch.
    /// The width therefore depends on the batch contents.
    pub fn extract_video_features(&self, videos: &[Video]) -> VideoFeatures {
        let text = self.extract_textual_features(videos);
        let numerical = self.extract_numerical_features(videos);
        let categorical = self.extract_categorical_features(videos);
        let tags = self.extract_tag_features(videos);

        let layout = FeatureLayout {
            text: text.ncols(),
            numerical: numerical.ncols(),
            categorical: categorical.ncols(),
            tags: tags.ncols(),
        };

        let matrix = concatenate(
            Axis(1),
            &[text.view(), numerical.view(), categorical.view(), tags.view()],
        )
        .unwrap_or_else(|_| Array2::zeros((videos.len(), 0)));

        debug!(
            videos = videos.len(),
            width = layout.width(),
            text = layout.text,
            categorical = layout.categorical,
            tags = layout.tags,
            "Extracted video features"
        );

        VideoFeatures { matrix, layout }
    }

    fn extract_textual_features(&self, videos: &[Video]) -> Array2<f32> {
        let texts: Vec<String> = videos.iter().map(Video::text).collect();
        TfidfVectorizer::new(self.max_text_features).fit_transform(&texts)
    }

    fn extract_numerical_features(&self, videos: &[Video]) -> Array2<f32> {
        let mut data = Array2::<f64>::zeros((videos.len(), NUMERICAL_COLUMNS.len()));
        for (row, video) in videos.iter().enumerate() {
            let values = [
                video.views,
                video.likes,
                video.duration,
                video.engagement_score,
                video.creation_timestamp,
                video.popularity_score,
            ];
            for (col, value) in values.into_iter().enumerate() {
                data[[row, col]] = if value.is_finite() { value } else { 0.0 };
            }
        }
        StandardScaler::new().fit_transform(&data)
    }

    fn extract_categorical_features(&self, videos: &[Video]) -> Array2<f32> {
        let rows: Vec<Vec<String>> = videos
            .iter()
            .map(|video| {
                [&video.category, &video.language, &video.content_type]
                    .into_iter()
                    .map(|value| value.clone().unwrap_or_else(|| UNKNOWN.to_string()))
                    .collect()
            })
            .collect();

        OneHotEncoder::new().fit_transform(&rows)
    }

    fn extract_tag_features(&self, videos: &[Video]) -> Array2<f32> {
        let labels: Vec<Vec<String>> = videos.iter().map(|video| video.tags.clone()).collect();
        MultiLabelBinarizer::new().fit_transform(&labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, views: Option<f64>, likes: Option<f64>, ratings: Option<f64>) -> InteractionRecord {
        InteractionRecord {
            video_id: id.to_string(),
            views,
            likes,
            ratings,
        }
    }

    fn sample_videos() -> Vec<Video> {
        vec![
            Video::new("v1", "Guitar lesson")
                .with_description("learn chords")
                .with_category("music")
                .with_tags(vec!["guitar".to_string(), "tutorial".to_string()])
                .with_stats(100.0, 10.0),
            Video::new("v2", "Football highlights")
                .with_category("sports")
                .with_tags(vec!["football".to_string()])
                .with_stats(300.0, 30.0),
            Video::new("v3", "Piano lesson").with_stats(200.0, 20.0),
        ]
    }

    #[test]
    fn test_preprocess_user_interactions() {
        let preprocessor = DataPreprocessor::default();
        let normalized = preprocessor.preprocess_user_interactions(&[
            record("a", Some(10.0), Some(1.0), None),
            record("b", Some(20.0), Some(1.0), Some(4.0)),
            record("c", None, Some(1.0), Some(2.0)),
        ]);

        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized[0].views, 0.5);
        assert_eq!(normalized[1].views, 1.0);
        assert_eq!(normalized[2].views, 0.0);
        // constant column maps to zeros instead of dividing by zero
        assert!(normalized.iter().all(|n| n.likes == 0.0));
        assert_eq!(normalized[0].ratings, 0.0);
        assert_eq!(normalized[1].ratings, 1.0);
        assert_eq!(normalized[2].ratings, 0.5);
    }

    #[test]
    fn test_preprocess_empty_interactions() {
        assert!(DataPreprocessor::default().preprocess_user_interactions(&[]).is_empty());
    }

    #[test]
    fn test_engagement_records() {
        let mut history = UserInteractions::default();
        history.set_events(
            InteractionKind::View,
            vec![
                InteractionEvent::new(InteractionKind::View, "alice", "v1"),
                InteractionEvent::new(InteractionKind::View, "alice", "v1"),
                InteractionEvent::new(InteractionKind::View, "alice", "v2"),
            ],
        );
        history.set_events(
            InteractionKind::Rating,
            vec![
                InteractionEvent::new(InteractionKind::Rating, "alice", "v2").with_value(4.0),
                InteractionEvent::new(InteractionKind::Rating, "alice", "v2").with_value(2.0),
            ],
        );
        history.set_events(
            InteractionKind::Inspire,
            vec![InteractionEvent::new(InteractionKind::Inspire, "alice", "v3")],
        );

        let records = DataPreprocessor::default().engagement_records(&history);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], record("v1", Some(2.0), None, None));
        assert_eq!(records[1], record("v2", Some(1.0), None, Some(3.0)));
        assert_eq!(records[2], record("v3", None, Some(1.0), None));
    }

    #[test]
    fn test_extract_video_features_layout() {
        let features = DataPreprocessor::default().extract_video_features(&sample_videos());

        assert_eq!(features.len(), 3);
        assert_eq!(features.layout.numerical, NUMERICAL_COLUMNS.len());
        // category: music, sports, unknown; language: unknown; content_type: unknown
        assert_eq!(features.layout.categorical, 5);
        assert_eq!(features.layout.tags, 3);
        assert_eq!(features.matrix.ncols(), features.layout.width());
        assert!(crate::utils::validation::validate_feature_matrix(&features.matrix).is_ok());
    }

    #[test]
    fn test_numerical_block_is_standardized() {
        let features = DataPreprocessor::default().extract_video_features(&sample_videos());
        let views_col = features.layout.text;
        let column: Vec<f32> = (0..3).map(|row| features.matrix[[row, views_col]]).collect();
        let mean: f32 = column.iter().sum::<f32>() / 3.0;
        assert!(mean.abs() < 1e-5);
        assert!(column[1] > column[2] && column[2] > column[0]);
    }

    #[test]
    fn test_extract_features_from_empty_batch() {
        let features = DataPreprocessor::default().extract_video_features(&[]);
        assert_eq!(features.matrix.nrows(), 0);
        assert!(features.is_empty());
    }

    #[test]
    fn test_text_vocabulary_cap() {
        let features = DataPreprocessor::new(2).extract_video_features(&sample_videos());
        assert_eq!(features.layout.text, 2);
    }
}
