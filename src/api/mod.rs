pub mod auth;
mod contents;
pub mod error;
mod pages;
mod settings;
mod uploads;
mod users;
mod validation;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::storage::PUBLIC_PREFIX;
use crate::AppState;

/// Room for the multipart framing around an upload of the maximum size
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    // Public site routes
    let public_routes = Router::new()
        .route("/pages", get(pages::list_pages))
        .route("/pages/:id", get(pages::get_page))
        .route("/settings", get(settings::get_settings));

    // Protected API routes
    let api_routes = Router::new()
        // Pages
        .route("/pages", post(pages::create_page))
        .route(
            "/pages/:id",
            put(pages::update_page).delete(pages::delete_page),
        )
        .route("/pages/:id/move-up", post(pages::move_page_up))
        .route("/pages/:id/move-down", post(pages::move_page_down))
        .route("/pages/:id/banner", post(pages::upload_banner))
        // Content sections
        .route(
            "/pages/:id/contents",
            post(contents::insert_content).put(pages::save_contents),
        )
        .route(
            "/pages/:id/contents/:content_id",
            put(contents::update_content).delete(contents::delete_content),
        )
        .route(
            "/pages/:id/contents/:content_id/move-up",
            post(contents::move_content_up),
        )
        .route(
            "/pages/:id/contents/:content_id/move-down",
            post(contents::move_content_down),
        )
        .route(
            "/pages/:id/contents/:content_id/image",
            post(contents::upload_content_image),
        )
        // Settings
        .route("/settings", put(settings::update_settings))
        .route("/settings/logo", post(settings::upload_logo))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        // Protected by auth
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let uploads = ServeDir::new(state.files.root());
    let body_limit = state.config.uploads.max_size_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes.merge(api_routes))
        .nest_service(PUBLIC_PREFIX.trim_end_matches('/'), uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
