use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

mod wire;

use wire::WireRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Like,
    Inspire,
    Rating,
}

impl InteractionKind {
    /// Upstream endpoint that lists events of this kind.
    pub fn endpoint(&self) -> &'static str {
        match self {
            InteractionKind::View => "posts/view",
            InteractionKind::Like => "posts/like",
            InteractionKind::Inspire => "posts/inspire",
            InteractionKind::Rating => "posts/rating",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionKind::View => "view",
            InteractionKind::Like => "like",
            InteractionKind::Inspire => "inspire",
            InteractionKind::Rating => "rating",
        };
        f.write_str(name)
    }
}

/// One interaction record as returned by the posts API. Upstream payloads carry no
/// kind; it is assigned from the endpoint the record was fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub username: String,
    pub user_id: Option<String>,
    pub video_id: String,
    pub value: Option<f64>,
}

impl TryFrom<Map<String, Value>> for InteractionEvent {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut wire = WireRecord::new(map);
        let video_id = wire
            .id(&["video_id", "post_id"])
            .ok_or_else(|| "interaction has no video_id or post_id".to_string())?;

        let kind = wire
            .category(&["kind"])
            .and_then(|kind| serde_json::from_value(Value::String(kind)).ok())
            .unwrap_or(InteractionKind::View);

        Ok(Self {
            kind,
            username: wire.text(&["username"]),
            user_id: wire.id(&["user_id"]),
            video_id,
            value: wire.number_opt(&["value", "rating_percent", "rating"]),
        })
    }
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, username: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            kind,
            username: username.into(),
            user_id: None,
            video_id: video_id.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_kind(mut self, kind: InteractionKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Interaction history grouped by kind. Holds either one user's history or the
/// community-wide history used for collaborative filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInteractions {
    pub views: Vec<InteractionEvent>,
    pub likes: Vec<InteractionEvent>,
    pub inspired: Vec<InteractionEvent>,
    pub ratings: Vec<InteractionEvent>,
}

impl UserInteractions {
    pub fn events(&self, kind: InteractionKind) -> &[InteractionEvent] {
        match kind {
            InteractionKind::View => &self.views,
            InteractionKind::Like => &self.likes,
            InteractionKind::Inspire => &self.inspired,
            InteractionKind::Rating => &self.ratings,
        }
    }

    pub fn set_events(&mut self, kind: InteractionKind, events: Vec<InteractionEvent>) {
        let events = events.into_iter().map(|e| e.with_kind(kind)).collect();
        match kind {
            InteractionKind::View => self.views = events,
            InteractionKind::Like => self.likes = events,
            InteractionKind::Inspire => self.inspired = events,
            InteractionKind::Rating => self.ratings = events,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.views
            .iter()
            .chain(self.likes.iter())
            .chain(self.inspired.iter())
            .chain(self.ratings.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.views.len() + self.likes.len() + self.inspired.len() + self.ratings.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub user_id: String,
    pub interactions: BTreeMap<InteractionKind, Vec<String>>,
    pub preferences: HashMap<String, f32>,
    pub mood: String,
}

impl User {
    pub fn new(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: user_id.into(),
            interactions: BTreeMap::new(),
            preferences: HashMap::new(),
            mood: "neutral".to_string(),
        }
    }

    /// Builds a user from a fetched history. The user id falls back to the username
    /// when no event carries one.
    pub fn from_interactions(username: &str, history: &UserInteractions) -> Self {
        let user_id = history
            .iter()
            .find_map(|e| e.user_id.clone())
            .unwrap_or_else(|| username.to_string());

        let mut user = Self::new(username, user_id);
        for event in history.iter() {
            user.update_interactions(event.kind, &event.video_id);
        }
        user
    }

    /// Appends `item_id` under `kind` unless it is already recorded.
    pub fn update_interactions(&mut self, kind: InteractionKind, item_id: &str) {
        let items = self.interactions.entry(kind).or_default();
        if !items.iter().any(|existing| existing == item_id) {
            items.push(item_id.to_string());
        }
    }

    pub fn update_preferences(&mut self, category: impl Into<String>, weight: f32) {
        self.preferences.insert(category.into(), weight);
    }

    pub fn interacted_items(&self) -> impl Iterator<Item = &String> {
        self.interactions.values().flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub views: f64,
    pub likes: f64,
    pub duration: f64,
    pub engagement_score: f64,
    pub creation_timestamp: f64,
    pub popularity_score: f64,
    pub tags: Vec<String>,
    /// Upstream fields this service does not model; echoed back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Video {
    type Error = String;

    /// Every field but the id defaults when missing or malformed.
    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut wire = WireRecord::new(map);
        let id = wire
            .id(&["id", "video_id"])
            .ok_or_else(|| "video has no id or video_id".to_string())?;

        Ok(Self {
            id,
            title: wire.text(&["title"]),
            description: wire.text(&["description"]),
            category: wire.category(&["category"]),
            category_id: wire.id(&["category_id"]),
            language: wire.category(&["language"]),
            content_type: wire.category(&["content_type"]),
            views: wire.number(&["views", "view_count"]),
            likes: wire.number(&["likes", "upvote_count", "like_count"]),
            duration: wire.number(&["duration"]),
            engagement_score: wire.number(&["engagement_score"]),
            creation_timestamp: wire.timestamp(&["creation_timestamp"]),
            popularity_score: wire.number(&["popularity_score"]),
            tags: wire.string_list(&["tags"]),
            extra: wire.into_rest(),
        })
    }
}

impl Video {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_category_id(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_stats(mut self, views: f64, likes: f64) -> Self {
        self.views = views;
        self.likes = likes;
        self
    }

    /// Title and description joined for text vectorization.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub video: Video,
    pub score: f32,
}

impl Recommendation {
    pub fn new(video: Video, score: f32) -> Self {
        Self { video, score }
    }
}

/// Immutable description of one feed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRequest {
    pub username: String,
    pub category_id: Option<String>,
    pub mood: Option<String>,
    pub limit: usize,
}

impl FeedRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            category_id: None,
            mood: None,
            limit: 10,
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_interactions_deduplicates() {
        let mut user = User::new("alice", "u1");
        user.update_interactions(InteractionKind::Like, "v1");
        user.update_interactions(InteractionKind::Like, "v1");
        user.update_interactions(InteractionKind::Like, "v2");
        assert_eq!(user.interactions[&InteractionKind::Like], vec!["v1", "v2"]);
        assert_eq!(user.mood, "neutral");
    }

    #[test]
    fn test_update_preferences_last_write_wins() {
        let mut user = User::new("alice", "u1");
        user.update_preferences("music", 0.3);
        user.update_preferences("music", 0.9);
        assert_eq!(user.preferences["music"], 0.9);
    }

    #[test]
    fn test_user_from_interactions() {
        let mut history = UserInteractions::default();
        let mut like = InteractionEvent::new(InteractionKind::Like, "alice", "v9");
        like.user_id = Some("42".to_string());
        history.set_events(InteractionKind::Like, vec![like]);
        history.set_events(
            InteractionKind::View,
            vec![
                InteractionEvent::new(InteractionKind::View, "alice", "v1"),
                InteractionEvent::new(InteractionKind::View, "alice", "v1"),
            ],
        );

        let user = User::from_interactions("alice", &history);
        assert_eq!(user.user_id, "42");
        assert_eq!(user.interactions[&InteractionKind::View], vec!["v1"]);
        assert_eq!(user.interacted_items().count(), 2);
    }

    #[test]
    fn test_video_deserializes_with_defaults_and_extra_fields() {
        let video: Video = serde_json::from_value(json!({
            "id": 17,
            "title": "Sunset",
            "category_id": 3,
            "creation_timestamp": "2024-01-01T00:00:00Z",
            "thumbnail_url": "https://cdn/x.jpg"
        }))
        .unwrap();

        assert_eq!(video.id, "17");
        assert_eq!(video.category_id.as_deref(), Some("3"));
        assert_eq!(video.views, 0.0);
        assert!(video.tags.is_empty());
        assert_eq!(video.creation_timestamp, 1_704_067_200.0);
        assert_eq!(video.extra["thumbnail_url"], "https://cdn/x.jpg");
    }

    #[test]
    fn test_recommendation_serializes_flat() {
        let rec = Recommendation::new(Video::new("v1", "Clip"), 0.5);
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["id"], "v1");
        assert_eq!(value["title"], "Clip");
        assert_eq!(value["score"], 0.5);
    }

    #[test]
    fn test_interaction_event_aliases() {
        let event: InteractionEvent = serde_json::from_value(json!({
            "username": "bob",
            "post_id": 5,
            "rating_percent": 80.0
        }))
        .unwrap();
        assert_eq!(event.video_id, "5");
        assert_eq!(event.value, Some(80.0));
    }

    #[test]
    fn test_malformed_video_fields_are_defaulted() {
        let payloads = vec![
            json!({"id": 1, "title": "clean", "category": "music", "tags": ["a"]}),
            json!({"id": 2, "title": "no description", "description": null}),
            json!({"id": 3, "views": "120", "likes": "lots"}),
            json!({"id": 4, "tags": null}),
            json!({"id": 5, "video_id": 5}),
            json!({"id": 6, "category": 7}),
        ];
        let videos: Vec<Video> = payloads
            .into_iter()
            .map(|p| serde_json::from_value(p).unwrap())
            .collect();

        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
        assert_eq!(videos[1].description, "");
        assert_eq!(videos[2].views, 120.0);
        assert_eq!(videos[2].likes, 0.0);
        assert!(videos[3].tags.is_empty());
        assert!(videos[4].extra.is_empty());
        assert_eq!(videos[5].category, None);
    }

    #[test]
    fn test_video_id_falls_back_to_alias() {
        let video: Video = serde_json::from_value(json!({"id": null, "video_id": "abc"})).unwrap();
        assert_eq!(video.id, "abc");
        assert!(serde_json::from_value::<Video>(json!({"title": "no id"})).is_err());
    }

    #[test]
    fn test_malformed_interaction_fields_are_defaulted() {
        let event: InteractionEvent = serde_json::from_value(json!({
            "username": null,
            "user_id": 12,
            "video_id": 3,
            "post_id": 3,
            "rating_percent": "75"
        }))
        .unwrap();
        assert_eq!(event.username, "");
        assert_eq!(event.user_id.as_deref(), Some("12"));
        assert_eq!(event.video_id, "3");
        assert_eq!(event.value, Some(75.0));
        assert_eq!(event.kind, InteractionKind::View);
    }

    #[test]
    fn test_recommendation_round_trips_through_json() {
        let rec = Recommendation::new(Video::new("v1", "Clip").with_category("music"), 0.25);
        let decoded: Recommendation = serde_json::from_value(serde_json::to_value(&rec).unwrap()).unwrap();
        assert_eq!(decoded, rec);
    }
}
