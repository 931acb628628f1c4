use actix_web::{get, web, HttpMessage, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::FeedAggregator;

pub struct FeedHandlerState {
    pub aggregator: Arc<FeedAggregator>,
}

/// GET /v1/recommendations/{user_id}
///
/// Returns the flattened posts of every user `user_id` follows, as a JSON
/// array.
#[get("/{user_id}")]
pub async fn get_recommendations(
    path: web::Path<String>,
    http_req: HttpRequest,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    if let Some(caller) = http_req.extensions().get::<CurrentUser>() {
        debug!("Feed requested by authenticated user {}", caller.0.subject_id);
    }

    let posts = state.aggregator.get_recommendations(&user_id).await?;
    Ok(HttpResponse::Ok().json(posts))
}
