//! Ad listing and creation.

use serde_json::json;
use std::sync::Arc;
use url::Url;

use crate::domain::entities::{Ad, NewAd};
use crate::domain::repositories::AdRepository;
use crate::error::AppError;

const MAX_AD_ID_LEN: usize = 64;

/// Service for reading and creating ads.
///
/// Ad lifecycle is owned here and by the admin CLI; the ingestion pipeline
/// only ever increments totals.
pub struct AdService {
    repository: Arc<dyn AdRepository>,
}

impl AdService {
    pub fn new(repository: Arc<dyn AdRepository>) -> Self {
        Self { repository }
    }

    /// Lists all live ads, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn list_ads(&self) -> Result<Vec<Ad>, AppError> {
        Ok(self.repository.list_ads().await?)
    }

    /// Creates an ad after validating its id and URLs.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the id is empty, too long or
    /// contains whitespace, or if either URL is not an absolute http(s) URL.
    pub async fn create_ad(&self, new_ad: NewAd) -> Result<Ad, AppError> {
        let id = new_ad.id.trim();
        if id.is_empty() || id.len() > MAX_AD_ID_LEN || id.chars().any(char::is_whitespace) {
            return Err(AppError::bad_request(
                "Invalid ad id",
                json!({ "id": new_ad.id, "max_length": MAX_AD_ID_LEN }),
            ));
        }

        validate_http_url("image_url", &new_ad.image_url)?;
        validate_http_url("target_url", &new_ad.target_url)?;

        let new_ad = NewAd {
            id: id.to_string(),
            ..new_ad
        };

        Ok(self.repository.create_ad(new_ad).await?)
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), AppError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(AppError::bad_request(
            format!("Invalid {}", field),
            json!({ field: value }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockAdRepository;
    use chrono::Utc;

    fn new_ad(id: &str, target_url: &str) -> NewAd {
        NewAd {
            id: id.to_string(),
            image_url: "https://cdn.example.com/banner.png".to_string(),
            target_url: target_url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_ad_success() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo
            .expect_create_ad()
            .withf(|ad| ad.id == "tech-001")
            .times(1)
            .returning(|ad| Ok(Ad::new(ad.id, ad.image_url, ad.target_url, 0, Utc::now())));

        let service = AdService::new(Arc::new(mock_repo));

        let ad = service
            .create_ad(new_ad(" tech-001 ", "https://example.com/landing"))
            .await
            .unwrap();

        assert_eq!(ad.id, "tech-001");
        assert_eq!(ad.total_clicks, 0);
    }

    #[tokio::test]
    async fn test_create_ad_rejects_bad_urls() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_create_ad().never();

        let service = AdService::new(Arc::new(mock_repo));

        for target in ["not a url", "ftp://example.com/file", "mailto:someone@example.com"] {
            let result = service.create_ad(new_ad("tech-001", target)).await;
            assert!(matches!(result, Err(AppError::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn test_create_ad_rejects_bad_ids() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_create_ad().never();

        let service = AdService::new(Arc::new(mock_repo));

        for id in ["", "   ", "has space", &"x".repeat(65)] {
            let result = service
                .create_ad(new_ad(id, "https://example.com"))
                .await;
            assert!(matches!(result, Err(AppError::Validation { .. })));
        }
    }
}
