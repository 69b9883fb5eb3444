use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid server address {}:{}: {}", self.host, self.port, e))
    }
}

/// Upstream posts API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub flic_token: String,
    pub page_size: u32,
    pub timeout_seconds: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub expiry_minutes: u64,
}

impl CacheConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_minutes * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub content_weight: f32,
    pub collab_weight: f32,
    pub max_text_features: usize,
    pub neighbourhood_size: usize,
    pub positive_rating_threshold: f64,
    pub mood_weights: HashMap<String, f32>,
    pub category_popularity_boost: HashMap<String, f32>,
    /// Multiplies scores by `category_popularity_boost`. Off unless configured.
    #[serde(default)]
    pub category_boost_enabled: bool,
}

impl RecommendationConfig {
    /// Multiplier for a mood tag; unknown moods leave scores untouched.
    pub fn mood_weight(&self, mood: &str) -> f32 {
        self.mood_weights
            .get(&mood.trim().to_lowercase())
            .copied()
            .unwrap_or(1.0)
    }

    pub fn category_boost(&self, category: &str) -> f32 {
        self.category_popularity_boost
            .get(&category.trim().to_lowercase())
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

fn default_mood_weights() -> HashMap<String, f32> {
    [
        ("happy", 1.2),
        ("neutral", 1.0),
        ("sad", 0.8),
        ("excited", 1.3),
        ("relaxed", 0.9),
    ]
    .into_iter()
    .map(|(mood, weight)| (mood.to_string(), weight))
    .collect()
}

fn default_category_boost() -> HashMap<String, f32> {
    [("trending", 1.5), ("new", 1.2), ("classic", 1.0)]
        .into_iter()
        .map(|(category, boost)| (category.to_string(), boost))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            api: ApiConfig {
                base_url: "https://api.socialverseapp.com".to_string(),
                flic_token: String::new(),
                page_size: 1000,
                timeout_seconds: 30,
            },
            cache: CacheConfig {
                capacity: 100,
                expiry_minutes: 60,
            },
            recommendation: RecommendationConfig {
                default_limit: 10,
                max_limit: 1000,
                content_weight: 0.6,
                collab_weight: 0.4,
                max_text_features: 50,
                neighbourhood_size: 20,
                positive_rating_threshold: 3.0,
                mood_weights: default_mood_weights(),
                category_popularity_boost: default_category_boost(),
                category_boost_enabled: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Config {
    /// Layers a config file and `FLICREC__*` environment variables over the defaults.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("FLICREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
