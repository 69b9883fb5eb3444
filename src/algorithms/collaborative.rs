use super::{CandidateScorer, ScoringContext};
use crate::config::RecommendationConfig;
use crate::models::*;
use nalgebra::DVector;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// User-based neighbourhood collaborative filtering over binary "positive
/// interaction" vectors.
#[derive(Debug, Clone)]
pub struct CollaborativeFiltering {
    pub neighbourhood_size: usize,
    pub positive_rating_threshold: f64,
}

impl CollaborativeFiltering {
    pub fn new(neighbourhood_size: usize, positive_rating_threshold: f64) -> Self {
        Self {
            neighbourhood_size,
            positive_rating_threshold,
        }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(config.neighbourhood_size, config.positive_rating_threshold)
    }

    fn is_positive(&self, event: &InteractionEvent) -> bool {
        match event.kind {
            InteractionKind::Rating => event
                .value
                .map(|v| v >= self.positive_rating_threshold)
                .unwrap_or(false),
            _ => true,
        }
    }

    /// Positive item sets keyed by username. Sorted map keeps neighbour order
    /// deterministic when similarities tie.
    pub fn positive_items<'a>(
        &self,
        interactions: &'a UserInteractions,
    ) -> BTreeMap<&'a str, HashSet<&'a str>> {
        let mut items: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
        for event in interactions.iter().filter(|e| self.is_positive(e)) {
            let owner = match event.username.as_str() {
                "" => event.user_id.as_deref().unwrap_or(""),
                name => name,
            };
            if owner.is_empty() {
                continue;
            }
            items.entry(owner).or_default().insert(event.video_id.as_str());
        }
        items
    }

    fn to_vector(items: &HashSet<&str>, index: &HashMap<&str, usize>) -> DVector<f32> {
        let mut vector = DVector::zeros(index.len());
        for item in items {
            if let Some(&i) = index.get(item) {
                vector[i] = 1.0;
            }
        }
        vector
    }

    fn cosine(a: &DVector<f32>, b: &DVector<f32>) -> f32 {
        let norm_a = a.norm();
        let norm_b = b.norm();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            a.dot(b) / (norm_a * norm_b)
        }
    }

    /// Most similar other users, strongest first, similarity > 0 only.
    pub fn neighbours<'a>(
        &self,
        username: &str,
        own_items: &HashSet<&str>,
        community: &BTreeMap<&'a str, HashSet<&'a str>>,
    ) -> Vec<(&'a str, f32)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for item in own_items.iter().chain(community.values().flatten()) {
            let next = index.len();
            index.entry(*item).or_insert(next);
        }

        let target = Self::to_vector(own_items, &index);

        let mut neighbours: Vec<(&str, f32)> = community
            .iter()
            .filter(|(name, _)| **name != username)
            .map(|(name, items)| (*name, Self::cosine(&target, &Self::to_vector(items, &index))))
            .filter(|(_, similarity)| *similarity > 0.0)
            .collect();

        neighbours.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        neighbours.truncate(self.neighbourhood_size);
        neighbours
    }
}

impl CandidateScorer for CollaborativeFiltering {
    fn name(&self) -> &'static str {
        "collaborative_filtering"
    }

    fn score(&self, ctx: &ScoringContext<'_>, candidates: &[usize]) -> Vec<f32> {
        let community = self.positive_items(ctx.community);

        let mut own_items: HashSet<&str> = ctx
            .history
            .iter()
            .filter(|e| self.is_positive(e))
            .map(|e| e.video_id.as_str())
            .collect();
        if let Some(items) = community.get(ctx.user.username.as_str()) {
            own_items.extend(items.iter().copied());
        }

        let neighbours = self.neighbours(&ctx.user.username, &own_items, &community);
        let total: f32 = neighbours.iter().map(|(_, similarity)| similarity).sum();

        if total <= 0.0 {
            return vec![0.0; candidates.len()];
        }

        candidates
            .iter()
            .map(|&index| {
                let video_id = ctx.catalog[index].id.as_str();
                let support: f32 = neighbours
                    .iter()
                    .filter(|(name, _)| {
                        community
                            .get(name)
                            .map(|items| items.contains(video_id))
                            .unwrap_or(false)
                    })
                    .map(|(_, similarity)| similarity)
                    .sum();
                (support / total).clamp(0.0, 1.0)
            })
            .collect()
    }
}
