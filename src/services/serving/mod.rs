use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::services::recommendation::RecommendationService;
use crate::utils::validation::validate_feed_request;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub username: Option<String>,
    pub category_id: Option<String>,
    pub mood: Option<String>,
    /// Kept as text so a malformed value is reported like any other invalid input.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Wraps the engine with request validation and serving counters.
pub struct ServingService {
    recommendation_service: Arc<RecommendationService>,
    serving_stats: DashMap<String, u64>,
}

impl ServingService {
    pub fn new(recommendation_service: Arc<RecommendationService>) -> Self {
        Self {
            recommendation_service,
            serving_stats: DashMap::new(),
        }
    }

    /// Turns raw query parameters into a request. Empty filter values count as absent.
    pub fn build_request(&self, query: FeedQuery) -> ApiResult<FeedRequest> {
        let config = self.recommendation_service.config();
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let limit = match non_empty(query.limit) {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiError::InvalidInput(format!("Limit must be a positive integer, got {:?}", raw)))?,
            None => config.default_limit,
        };

        let request = FeedRequest {
            username: query.username.unwrap_or_default().trim().to_string(),
            category_id: non_empty(query.category_id),
            mood: non_empty(query.mood),
            limit,
        };

        validate_feed_request(&request, config.max_limit)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        Ok(request)
    }

    pub async fn serve_recommendations(&self, request: &FeedRequest) -> Vec<Recommendation> {
        self.increment_stat("total_requests");
        let start_time = Instant::now();

        let recommendations = self.recommendation_service.get_recommendations(request).await;

        let latency = start_time.elapsed().as_millis() as u64;
        self.add_to_stat("total_latency_ms", latency);
        if recommendations.is_empty() {
            self.increment_stat("empty_responses");
        }

        info!(
            username = %request.username,
            returned = recommendations.len(),
            latency_ms = latency,
            "Served recommendations"
        );
        recommendations
    }

    pub fn increment_stat(&self, key: &str) {
        self.add_to_stat(key, 1);
    }

    fn add_to_stat(&self, key: &str, amount: u64) {
        *self.serving_stats.entry(key.to_string()).or_insert(0) += amount;
    }

    pub fn get_serving_stats(&self) -> BTreeMap<String, u64> {
        self.serving_stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "flicrec",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_feed(
    State(serving): State<Arc<ServingService>>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<Vec<Recommendation>>> {
    let request = match serving.build_request(query) {
        Ok(request) => request,
        Err(e) => {
            serving.increment_stat("rejected_requests");
            return Err(e);
        }
    };

    let span = tracing::info_span!("feed", request_id = %Uuid::new_v4(), username = %request.username);
    let recommendations = serving
        .serve_recommendations(&request)
        .instrument(span)
        .await;

    Ok(Json(recommendations))
}

async fn get_stats(State(serving): State<Arc<ServingService>>) -> Json<BTreeMap<String, u64>> {
    Json(serving.get_serving_stats())
}

pub fn create_router(serving: Arc<ServingService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/feed", get(get_feed))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(serving)
}
