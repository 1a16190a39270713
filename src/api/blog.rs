//! Post listings: index, category and profile pages

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use super::common::PageQuery;
use super::middleware::{AppState, PageError, Viewer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/category/{slug}/", get(category_posts))
        .route("/profile/{username}/", get(profile))
}

/// GET / - publicly visible posts
async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let posts = state.post_service.published_posts(query.page()).await?;

    let mut context = TeraContext::new();
    context.insert("page_obj", &posts.page_info());
    context.insert("posts", &posts.items);
    state.render(&viewer, "blog/index.html", &context)
}

/// GET /category/{slug}/
async fn category_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let (category, posts) = state
        .post_service
        .category_posts(&slug, query.page())
        .await?;

    let mut context = TeraContext::new();
    context.insert("category", &category);
    context.insert("page_obj", &posts.page_info());
    context.insert("posts", &posts.items);
    state.render(&viewer, "blog/category.html", &context)
}

/// GET /profile/{username}/ - the owner also sees hidden and scheduled posts
async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let profile = state.user_service.get_by_username(&username).await?;
    let posts = state
        .post_service
        .author_posts(&profile, viewer.user.as_ref(), query.page())
        .await?;
    let is_owner = viewer.user.as_ref().is_some_and(|u| u.id == profile.id);

    let mut context = TeraContext::new();
    context.insert("profile", &profile);
    context.insert("is_owner", &is_owner);
    context.insert("page_obj", &posts.page_info());
    context.insert("posts", &posts.items);
    state.render(&viewer, "blog/profile.html", &context)
}
