use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::shared::config::Config;
use crate::{handlers, system};

/// Конфигурация всех роутов приложения
pub fn configure_routes(config: &Config) -> Router {
    let import_batches = Router::new()
        .route(
            "/",
            get(handlers::a105_import_batch::list).post(handlers::a105_import_batch::create),
        )
        .route("/:id", get(handlers::a105_import_batch::get_detail))
        .route("/:id/rows", get(handlers::a105_import_batch::get_rows))
        .route(
            "/:id/parse",
            post(handlers::a105_import_batch::parse)
                .layer(DefaultBodyLimit::max(config.server.max_upload_bytes)),
        )
        .route("/:id/validate", post(handlers::a105_import_batch::validate))
        .route("/:id/commit", post(handlers::a105_import_batch::commit))
        .route(
            "/:id/errors.csv",
            get(handlers::a105_import_batch::errors_csv),
        )
        .route("/:id/history", get(handlers::a105_import_batch::history))
        .route(
            "/:id/release-lock",
            post(handlers::a105_import_batch::release_lock),
        )
        .layer(middleware::from_fn(system::auth::middleware::require_auth));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/import-batches", import_batches)
}
