mod openapi;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{dev::Service, middleware::Condition, web, App, HttpResponse, HttpServer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa_swagger_ui::SwaggerUi;

use recommendation_service::clients::{ContentServiceClient, GraphServiceClient, UserStoreClient};
use recommendation_service::config::{Config, Environment};
use recommendation_service::handlers::{get_recommendations, FeedHandlerState};
use recommendation_service::middleware::AuthMiddleware;
use recommendation_service::security::{AuthGuard, OidcVerifier};
use recommendation_service::services::FeedAggregator;

async fn openapi_json(
    doc: web::Data<utoipa::openapi::OpenApi>,
) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.app.env == Environment::Production {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    info!(
        "Starting recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Running application in {} environment", config.app.env);

    // One shared HTTP client; its timeout bounds every upstream call.
    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let graph_client = Arc::new(GraphServiceClient::new(
        http.clone(),
        config.upstream.graph_service_url.clone(),
    ));
    let content_client = Arc::new(ContentServiceClient::new(
        http.clone(),
        config.upstream.content_service_url.clone(),
    ));
    let aggregator = Arc::new(FeedAggregator::new(graph_client, content_client));
    let feed_state = web::Data::new(FeedHandlerState { aggregator });

    let verifier = Arc::new(OidcVerifier::new(http.clone(), &config.auth));
    let user_store = Arc::new(UserStoreClient::new(
        http,
        config.upstream.user_service_url.clone(),
    ));
    let guard = Arc::new(AuthGuard::new(verifier, user_store));

    let auth_enabled = config.auth.enabled;
    if auth_enabled {
        info!("Authentication gate enabled on /v1/recommendations");
    } else {
        info!("Authentication gate disabled by configuration");
    }

    let port = config.app.port;
    HttpServer::new(move || {
        let openapi_doc = openapi::doc();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/v1/openapi.json", openapi_doc.clone()),
            )
            .route("/v1/openapi.json", web::get().to(openapi_json))
            .app_data(feed_state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            // Health endpoints for K8s probes
            .route("/v1/health/live", web::get().to(|| async { "OK" }))
            .route("/v1/health/ready", web::get().to(|| async { "OK" }))
            .route(
                "/metrics",
                web::get().to(recommendation_service::metrics::serve_metrics),
            )
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            recommendation_service::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            recommendation_service::metrics::observe_http_request(
                                &method,
                                &path,
                                500,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .service(
                web::scope("/v1/recommendations")
                    .wrap(Condition::new(
                        auth_enabled,
                        AuthMiddleware::new(guard.clone()),
                    ))
                    .service(get_recommendations),
            )
    })
    .bind(format!("0.0.0.0:{port}"))?
    .run()
    .await
}
