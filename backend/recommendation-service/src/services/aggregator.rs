use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::clients::{ContentApi, GraphApi};
use crate::error::AppError;
use crate::models::Post;

/// Fan-out/fan-in feed assembly: one graph call for the followee list, one
/// concurrent content call per followee, flattened in followee-list order.
pub struct FeedAggregator {
    graph: Arc<dyn GraphApi>,
    content: Arc<dyn ContentApi>,
}

impl FeedAggregator {
    pub fn new(graph: Arc<dyn GraphApi>, content: Arc<dyn ContentApi>) -> Self {
        Self { graph, content }
    }

    /// Build the feed for `user_id`.
    ///
    /// A graph-service failure is fatal. A single author's failed post fetch
    /// is logged and that author is dropped from the merge; the rest of the
    /// feed is still returned.
    pub async fn get_recommendations(&self, user_id: &str) -> Result<Vec<Post>, AppError> {
        let followees = self.graph.followees(user_id).await?;
        debug!("User {} follows {} users", user_id, followees.len());

        if followees.is_empty() {
            return Ok(Vec::new());
        }

        let fetches = followees.iter().map(|f| self.author_posts(&f.subject_id));
        let per_author = join_all(fetches).await;

        let mut feed = Vec::new();
        for result in per_author {
            match result {
                Ok(posts) => feed.extend(posts),
                Err(AppError::PartialUpstream { author, cause }) => {
                    warn!("Dropping posts from author {}: {}", author, cause);
                }
                Err(other) => return Err(other),
            }
        }

        Ok(feed)
    }

    async fn author_posts(&self, author: &str) -> Result<Vec<Post>, AppError> {
        self.content
            .posts_by_author(author)
            .await
            .map_err(|e| AppError::PartialUpstream {
                author: author.to_string(),
                cause: e.to_string(),
            })
    }
}
