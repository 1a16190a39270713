//! Static pages

use axum::{extract::State, response::Html, routing::get, Router};
use tera::Context as TeraContext;

use super::middleware::{AppState, PageError, Viewer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pages/about/", get(about))
        .route("/pages/rules/", get(rules))
}

async fn about(State(state): State<AppState>, viewer: Viewer) -> Result<Html<String>, PageError> {
    state.render(&viewer, "pages/about.html", &TeraContext::new())
}

async fn rules(State(state): State<AppState>, viewer: Viewer) -> Result<Html<String>, PageError> {
    state.render(&viewer, "pages/rules.html", &TeraContext::new())
}

/// Fallback for every unknown route
pub async fn not_found(viewer: Viewer) -> PageError {
    PageError::NotFound(viewer.path)
}
