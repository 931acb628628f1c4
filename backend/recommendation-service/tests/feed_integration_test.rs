use std::sync::Arc;
use std::time::Duration;

use actix_web::{test, web, App};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recommendation_service::clients::{
    ContentServiceClient, GraphServiceClient, UserStoreClient,
};
use recommendation_service::config::AuthConfig;
use recommendation_service::handlers::{get_recommendations, FeedHandlerState};
use recommendation_service::middleware::{AuthMiddleware, FORWARDED_AUTHORIZATION};
use recommendation_service::security::{AuthGuard, OidcVerifier};
use recommendation_service::services::FeedAggregator;
use recommendation_service::AppError;

fn aggregator_for(graph_url: String, content_url: String, http: reqwest::Client) -> FeedAggregator {
    FeedAggregator::new(
        Arc::new(GraphServiceClient::new(http.clone(), graph_url)),
        Arc::new(ContentServiceClient::new(http, content_url)),
    )
}

async fn mount_followees(server: &MockServer, user_id: &str, subjects: &[&str]) {
    let followees: Vec<_> = subjects.iter().map(|s| json!({ "subjectId": s })).collect();
    Mock::given(method("GET"))
        .and(path(format!("/v1/users/{user_id}/followees")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": followees })))
        .expect(1)
        .mount(server)
        .await;
}

#[actix_web::test]
async fn serves_merged_feed_over_http() {
    let upstream = MockServer::start().await;
    mount_followees(&upstream, "alice", &["a", "b"]).await;

    Mock::given(method("GET"))
        .and(path("/v1/posts"))
        .and(query_param("author", "a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "author": "a", "id": 1 }])),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/posts"))
        .and(query_param("author", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!([{ "author": "b", "id": 2 }, { "author": "b", "id": 3 }]),
        ))
        .expect(1)
        .mount(&upstream)
        .await;

    let state = web::Data::new(FeedHandlerState {
        aggregator: Arc::new(aggregator_for(
            upstream.uri(),
            upstream.uri(),
            reqwest::Client::new(),
        )),
    });
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(web::scope("/v1/recommendations").service(get_recommendations)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/v1/recommendations/alice")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body,
        json!([
            { "author": "a", "id": 1 },
            { "author": "b", "id": 2 },
            { "author": "b", "id": 3 }
        ])
    );
}

#[actix_web::test]
async fn graph_failure_maps_to_bad_gateway() {
    let graph = MockServer::start().await;
    let content = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/alice/followees"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&graph)
        .await;
    // The fan-out must never start when the followee fetch fails.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&content)
        .await;

    let state = web::Data::new(FeedHandlerState {
        aggregator: Arc::new(aggregator_for(
            graph.uri(),
            content.uri(),
            reqwest::Client::new(),
        )),
    });
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(web::scope("/v1/recommendations").service(get_recommendations)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/v1/recommendations/alice")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 502);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 502);
}

#[tokio::test]
async fn empty_followee_list_yields_empty_feed() {
    let graph = MockServer::start().await;
    let content = MockServer::start().await;

    mount_followees(&graph, "loner", &[]).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&content)
        .await;

    let feed = aggregator_for(graph.uri(), content.uri(), reqwest::Client::new())
        .get_recommendations("loner")
        .await
        .unwrap();

    assert!(feed.is_empty());
}

#[tokio::test]
async fn failing_author_is_dropped_from_feed() {
    let upstream = MockServer::start().await;
    mount_followees(&upstream, "alice", &["a", "b"]).await;

    Mock::given(method("GET"))
        .and(path("/v1/posts"))
        .and(query_param("author", "a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "author": "a", "id": 1 }])),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/posts"))
        .and(query_param("author", "b"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&upstream)
        .await;

    let feed = aggregator_for(upstream.uri(), upstream.uri(), reqwest::Client::new())
        .get_recommendations("alice")
        .await
        .unwrap();

    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].author, "a");
}

#[tokio::test]
async fn timed_out_post_fetch_is_retried_once_then_dropped() {
    let upstream = MockServer::start().await;
    mount_followees(&upstream, "alice", &["a"]).await;

    // Slower than the client timeout on both attempts: initial try plus
    // exactly one retry.
    Mock::given(method("GET"))
        .and(path("/v1/posts"))
        .and(query_param("author", "a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "author": "a", "id": 1 }]))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&upstream)
        .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let feed = aggregator_for(upstream.uri(), upstream.uri(), http)
        .get_recommendations("alice")
        .await
        .unwrap();

    assert!(feed.is_empty());
}

#[tokio::test]
async fn timed_out_followee_fetch_is_retried_once_then_fatal() {
    let graph = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/alice/followees"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "user": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&graph)
        .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = aggregator_for(graph.uri(), graph.uri(), http)
        .get_recommendations("alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Upstream { service, .. } if service == "graph-service"));
}

fn auth_guard_for(jwks_url: String, user_store_url: String) -> Arc<AuthGuard> {
    let http = reqwest::Client::new();
    let auth = AuthConfig {
        enabled: true,
        issuer: "https://accounts.google.com".to_string(),
        audience: "test-client".to_string(),
        jwks_url,
    };
    Arc::new(AuthGuard::new(
        Arc::new(OidcVerifier::new(http.clone(), &auth)),
        Arc::new(UserStoreClient::new(http, user_store_url)),
    ))
}

#[actix_web::test]
async fn missing_token_is_rejected_with_401() {
    let upstream = MockServer::start().await;

    let state = web::Data::new(FeedHandlerState {
        aggregator: Arc::new(aggregator_for(
            upstream.uri(),
            upstream.uri(),
            reqwest::Client::new(),
        )),
    });
    let guard = auth_guard_for(
        format!("{}/certs", upstream.uri()),
        upstream.uri(),
    );
    let app = test::init_service(
        App::new().app_data(state).service(
            web::scope("/v1/recommendations")
                .wrap(AuthMiddleware::new(guard))
                .service(get_recommendations),
        ),
    )
    .await;

    // Rejections surface as service errors; the HTTP layer renders them.
    let req = test::TestRequest::get()
        .uri("/v1/recommendations/alice")
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    let resp = err.error_response();

    assert_eq!(resp.status().as_u16(), 401);
    let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Token not provided");
}

#[actix_web::test]
async fn garbage_token_is_rejected_with_401() {
    let upstream = MockServer::start().await;

    let state = web::Data::new(FeedHandlerState {
        aggregator: Arc::new(aggregator_for(
            upstream.uri(),
            upstream.uri(),
            reqwest::Client::new(),
        )),
    });
    let guard = auth_guard_for(
        format!("{}/certs", upstream.uri()),
        upstream.uri(),
    );
    let app = test::init_service(
        App::new().app_data(state).service(
            web::scope("/v1/recommendations")
                .wrap(AuthMiddleware::new(guard))
                .service(get_recommendations),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/v1/recommendations/alice")
        .insert_header((FORWARDED_AUTHORIZATION, "Bearer not-a-jwt"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    let resp = err.error_response();

    assert_eq!(resp.status().as_u16(), 401);
    let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Invalid token or user not signed up");
}
