use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "kiosk API",
        version = "0.1.0",
        description = "Scheduled feed aggregator with per-source extraction scripts."
    ),
    paths(
        crate::routes::get_snapshot,
        crate::routes::get_status,
        crate::routes::refresh,
        crate::routes::list_sources,
        crate::routes::create_source,
        crate::routes::get_source,
        crate::routes::update_source,
        crate::routes::delete_source,
        crate::routes::get_setting,
        crate::routes::put_setting,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SnapshotResponse,
        crate::dto::SourceResultResponse,
        crate::dto::NewsItemResponse,
        crate::dto::StatusResponse,
        crate::dto::IndicatorResponse,
        crate::dto::CreateSourceRequest,
        crate::dto::CreateSourceResponse,
        crate::dto::UpdateSourceRequest,
        crate::dto::SourceResponse,
        crate::dto::SourceSummaryResponse,
        crate::dto::SourceListResponse,
        crate::dto::SettingResponse,
        crate::dto::PutSettingRequest,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "feed", description = "Aggregated snapshot, cycle status, and manual refresh"),
        (name = "sources", description = "Source definition management"),
        (name = "settings", description = "Key-value settings"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "API key. Set via KIOSK_API_KEY environment variable.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
