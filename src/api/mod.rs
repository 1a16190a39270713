//! HTTP layer - page handlers and routing
//!
//! Server-rendered pages only:
//! - Post listings (index, category, profile)
//! - Post detail and the post/comment forms
//! - Profile edit, login, logout and registration
//! - The admin pages under `/admin/`
//! - Static pages and uploaded media

pub mod admin;
pub mod auth;
pub mod blog;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod profile;

use axum::{middleware as axum_middleware, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use middleware::{AppState, AuthenticatedUser, PageError, Viewer};

/// Build the complete router with middleware.
///
/// Layer order, outermost first: tracing, session lookup, error pages,
/// CSRF check, then the routes (admin routes add `require_admin`).
pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(state.upload_config.path.clone());

    Router::new()
        .merge(blog::router())
        .merge(posts::router(&state))
        .merge(comments::router())
        .merge(profile::router())
        .merge(auth::router())
        .merge(pages::router())
        .merge(admin::router())
        .nest_service("/media", media)
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn(middleware::csrf_guard))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
