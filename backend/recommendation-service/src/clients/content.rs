use async_trait::async_trait;
use tracing::debug;

use crate::clients::{is_transient, CONTENT_SERVICE};
use crate::error::AppError;
use crate::metrics;
use crate::models::Post;
use crate::utils::retry::{with_retry, RetryConfig};

/// Read side of the content service's posts listing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// List the posts written by `author`, possibly empty.
    async fn posts_by_author(&self, author: &str) -> Result<Vec<Post>, AppError>;
}

pub struct ContentServiceClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl ContentServiceClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            retry: RetryConfig::default(),
        }
    }
}

#[async_trait]
impl ContentApi for ContentServiceClient {
    async fn posts_by_author(&self, author: &str) -> Result<Vec<Post>, AppError> {
        let url = format!("{}/v1/posts", self.base_url);
        debug!("fetching: {}?author={}", url, author);

        let response = with_retry(&self.retry, is_transient, || {
            self.http.get(&url).query(&[("author", author)]).send()
        })
        .await
        .map_err(|e| {
            metrics::observe_upstream_request(CONTENT_SERVICE, "error");
            AppError::upstream(CONTENT_SERVICE, format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            metrics::observe_upstream_request(CONTENT_SERVICE, "error");
            return Err(AppError::upstream(
                CONTENT_SERVICE,
                format!("unexpected status {}", response.status()),
            ));
        }

        let posts: Vec<Post> = response.json().await.map_err(|e| {
            metrics::observe_upstream_request(CONTENT_SERVICE, "error");
            AppError::upstream(CONTENT_SERVICE, format!("malformed body: {e}"))
        })?;

        metrics::observe_upstream_request(CONTENT_SERVICE, "ok");
        Ok(posts)
    }
}
