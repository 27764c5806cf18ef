// src/routes.rs

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

pub fn build_router(app_state: AppState) -> Router {
    let import_routes = Router::new()
        .route(
            "/",
            post(handlers::imports::start_import).get(handlers::imports::list_imports),
        )
        .route("/preview", post(handlers::imports::preview_import))
        .route("/stream", post(handlers::imports::stream_import))
        .route("/schemas/{schema}/fields", get(handlers::imports::list_target_fields))
        .route("/{id}", get(handlers::imports::get_import));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/activity", get(handlers::imports::list_activity))
        .nest("/api/imports", import_routes)
        .with_state(app_state)
}
