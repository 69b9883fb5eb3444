use crate::models::*;
use anyhow::{anyhow, Result};
use ndarray::Array2;

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_FILTER_LENGTH: usize = 100;

pub fn validate_feed_request(request: &FeedRequest, max_limit: usize) -> Result<()> {
    if request.username.trim().is_empty() {
        return Err(anyhow!("Username cannot be empty"));
    }

    if request.username.len() > MAX_USERNAME_LENGTH {
        return Err(anyhow!(
            "Username too long (max {} characters)",
            MAX_USERNAME_LENGTH
        ));
    }

    if request.limit == 0 {
        return Err(anyhow!("Limit must be greater than 0"));
    }

    if request.limit > max_limit {
        return Err(anyhow!("Limit too large (max {})", max_limit));
    }

    if let Some(ref category_id) = request.category_id {
        if category_id.len() > MAX_FILTER_LENGTH {
            return Err(anyhow!(
                "Category id too long (max {} characters)",
                MAX_FILTER_LENGTH
            ));
        }
    }

    if let Some(ref mood) = request.mood {
        if mood.len() > MAX_FILTER_LENGTH {
            return Err(anyhow!("Mood too long (max {} characters)", MAX_FILTER_LENGTH));
        }
    }

    Ok(())
}

/// Rejects matrices carrying NaN or infinite values.
pub fn validate_feature_matrix(features: &Array2<f32>) -> Result<()> {
    if let Some(((row, col), _)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(anyhow!(
            "Feature matrix contains invalid value at row {}, column {}",
            row,
            col
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_feed_request() {
        let valid = FeedRequest::new("alice").with_mood("happy");
        assert!(validate_feed_request(&valid, 100).is_ok());

        assert!(validate_feed_request(&FeedRequest::new("  "), 100).is_err());
        assert!(validate_feed_request(&FeedRequest::new("alice").with_limit(0), 100).is_err());
        assert!(validate_feed_request(&FeedRequest::new("alice").with_limit(101), 100).is_err());

        let long_category = FeedRequest::new("alice").with_category("x".repeat(101));
        assert!(validate_feed_request(&long_category, 100).is_err());
    }

    #[test]
    fn test_validate_feature_matrix() {
        let ok = Array2::<f32>::zeros((2, 3));
        assert!(validate_feature_matrix(&ok).is_ok());

        let mut bad = Array2::<f32>::zeros((2, 3));
        bad[[1, 2]] = f32::NAN;
        assert!(validate_feature_matrix(&bad).is_err());
    }
}
