use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder, Paths};

/// Minimal OpenAPI specification for the recommendation service.
pub fn doc() -> OpenApi {
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("PostSpot Recommendation Service")
                .version("1.0.0")
                .description(Some(
                    "Follow-graph feed aggregation endpoints for the PostSpot platform.",
                ))
                .build(),
        )
        .paths(Paths::new())
        .build()
}
