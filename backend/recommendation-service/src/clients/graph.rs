use async_trait::async_trait;
use tracing::debug;

use crate::clients::{is_transient, GRAPH_SERVICE};
use crate::error::AppError;
use crate::metrics;
use crate::models::{Followee, FolloweesResponse};
use crate::utils::retry::{with_retry, RetryConfig};

/// Read side of the social graph service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// List the users `user_id` follows.
    async fn followees(&self, user_id: &str) -> Result<Vec<Followee>, AppError>;
}

pub struct GraphServiceClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl GraphServiceClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            retry: RetryConfig::default(),
        }
    }
}

#[async_trait]
impl GraphApi for GraphServiceClient {
    async fn followees(&self, user_id: &str) -> Result<Vec<Followee>, AppError> {
        let url = format!("{}/v1/users/{}/followees", self.base_url, user_id);
        debug!("fetching: {}", url);

        let response = with_retry(&self.retry, is_transient, || self.http.get(&url).send())
            .await
            .map_err(|e| {
                metrics::observe_upstream_request(GRAPH_SERVICE, "error");
                AppError::upstream(GRAPH_SERVICE, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            metrics::observe_upstream_request(GRAPH_SERVICE, "error");
            return Err(AppError::upstream(
                GRAPH_SERVICE,
                format!("unexpected status {}", response.status()),
            ));
        }

        let body: FolloweesResponse = response.json().await.map_err(|e| {
            metrics::observe_upstream_request(GRAPH_SERVICE, "error");
            AppError::upstream(GRAPH_SERVICE, format!("malformed body: {e}"))
        })?;

        metrics::observe_upstream_request(GRAPH_SERVICE, "ok");
        Ok(body.user)
    }
}
