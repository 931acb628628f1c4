use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::clients::{is_transient, USER_SERVICE};
use crate::metrics;
use crate::models::LocalUser;
use crate::utils::retry::{with_retry, RetryConfig};

/// Lookup contract against the external user directory. A user record's
/// existence is the authorization predicate for the authentication gate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Read the record for `subject_id`, failing when none exists.
    async fn read_user(&self, subject_id: &str) -> Result<LocalUser>;
}

pub struct UserStoreClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl UserStoreClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self {
            http,
            base_url,
            retry: RetryConfig::default(),
        }
    }
}

#[async_trait]
impl UserDirectory for UserStoreClient {
    async fn read_user(&self, subject_id: &str) -> Result<LocalUser> {
        let url = format!("{}/v1/users/{}", self.base_url, subject_id);
        debug!("fetching: {}", url);

        let response = with_retry(&self.retry, is_transient, || self.http.get(&url).send())
            .await
            .map_err(|e| {
                metrics::observe_upstream_request(USER_SERVICE, "error");
                e
            })
            .context("user directory request failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            metrics::observe_upstream_request(USER_SERVICE, "ok");
            bail!("no record for subject {subject_id}");
        }
        if !response.status().is_success() {
            metrics::observe_upstream_request(USER_SERVICE, "error");
            bail!("user directory returned {}", response.status());
        }

        let user = response
            .json::<LocalUser>()
            .await
            .context("malformed user record")?;

        metrics::observe_upstream_request(USER_SERVICE, "ok");
        Ok(user)
    }
}
