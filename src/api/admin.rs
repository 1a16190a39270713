//! Administrative pages under `/admin/`
//!
//! Categories and locations get full CRUD; posts and comments can only be
//! hidden or re-published here. Every route sits behind `require_admin`, so
//! the handlers below assume an admin viewer.

use axum::{
    extract::{Path, Query, State},
    middleware as axum_middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use super::common::{found, PageQuery};
use super::middleware::{require_admin, AppState, PageError, Viewer};
use crate::forms::{CategoryForm, FormErrors, LocationForm, VisibilityForm};
use crate::models::{Category, Location};
use crate::services::{CategoryServiceError, LocationServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/", get(index))
        .route("/admin/categories/", get(list_categories))
        .route("/admin/categories/create/", get(create_category_form).post(create_category))
        .route("/admin/categories/{id}/edit/", get(edit_category_form).post(edit_category))
        .route("/admin/categories/{id}/delete/", get(delete_category_confirm).post(delete_category))
        .route("/admin/locations/", get(list_locations))
        .route("/admin/locations/create/", get(create_location_form).post(create_location))
        .route("/admin/locations/{id}/edit/", get(edit_location_form).post(edit_location))
        .route("/admin/locations/{id}/delete/", get(delete_location_confirm).post(delete_location))
        .route("/admin/posts/", get(list_posts))
        .route("/admin/posts/{id}/publish/", post(publish_post))
        .route("/admin/comments/", get(list_comments))
        .route("/admin/comments/{id}/publish/", post(publish_comment))
        .route_layer(axum_middleware::from_fn(require_admin))
}

/// GET /admin/
async fn index(State(state): State<AppState>, viewer: Viewer) -> Result<Html<String>, PageError> {
    let categories = state.category_service.list().await?;
    let locations = state.location_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("category_count", &categories.len());
    context.insert("location_count", &locations.len());
    state.render(&viewer, "admin/index.html", &context)
}

// ============================================================================
// Categories
// ============================================================================

async fn list_categories(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, PageError> {
    let categories = state.category_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("categories", &categories);
    state.render(&viewer, "admin/categories.html", &context)
}

async fn create_category_form(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, PageError> {
    let form = CategoryForm {
        is_published: Some("on".to_string()),
        ..CategoryForm::default()
    };
    render_category_form(&state, &viewer, None, &form, &FormErrors::new())
}

async fn create_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<CategoryForm>,
) -> Result<Response, PageError> {
    match state.category_service.create(&form).await {
        Ok(_) => Ok(found("/admin/categories/")),
        Err(CategoryServiceError::Validation(errors)) => {
            Ok(render_category_form(&state, &viewer, None, &form, &errors)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_category_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let category = state.category_service.get(id).await?;
    let form = CategoryForm::from_category(&category);
    render_category_form(&state, &viewer, Some(&category), &form, &FormErrors::new())
}

async fn edit_category(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, PageError> {
    let category = state.category_service.get(id).await?;
    match state.category_service.update(id, &form).await {
        Ok(_) => Ok(found("/admin/categories/")),
        Err(CategoryServiceError::Validation(errors)) => Ok(render_category_form(
            &state,
            &viewer,
            Some(&category),
            &form,
            &errors,
        )?
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn delete_category_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let category = state.category_service.get(id).await?;
    let context = confirm_context(
        "category",
        &category.title,
        "Its posts stay, without a category.",
        format!("/admin/categories/{}/delete/", id),
        "/admin/categories/",
    );
    state.render(&viewer, "admin/confirm_delete.html", &context)
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    state.category_service.delete(id).await?;
    Ok(found("/admin/categories/"))
}

fn render_category_form(
    state: &AppState,
    viewer: &Viewer,
    category: Option<&Category>,
    form: &CategoryForm,
    errors: &FormErrors,
) -> Result<Html<String>, PageError> {
    let mut context = TeraContext::new();
    if let Some(category) = category {
        context.insert("category", category);
    }
    context.insert("form", form);
    context.insert("errors", errors);
    state.render(viewer, "admin/category_form.html", &context)
}

// ============================================================================
// Locations
// ============================================================================

async fn list_locations(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, PageError> {
    let locations = state.location_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("locations", &locations);
    state.render(&viewer, "admin/locations.html", &context)
}

async fn create_location_form(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, PageError> {
    let form = LocationForm {
        is_published: Some("on".to_string()),
        ..LocationForm::default()
    };
    render_location_form(&state, &viewer, None, &form, &FormErrors::new())
}

async fn create_location(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LocationForm>,
) -> Result<Response, PageError> {
    match state.location_service.create(&form).await {
        Ok(_) => Ok(found("/admin/locations/")),
        Err(LocationServiceError::Validation(errors)) => {
            Ok(render_location_form(&state, &viewer, None, &form, &errors)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_location_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let location = state.location_service.get(id).await?;
    let form = LocationForm::from_location(&location);
    render_location_form(&state, &viewer, Some(&location), &form, &FormErrors::new())
}

async fn edit_location(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Form(form): Form<LocationForm>,
) -> Result<Response, PageError> {
    let location = state.location_service.get(id).await?;
    match state.location_service.update(id, &form).await {
        Ok(_) => Ok(found("/admin/locations/")),
        Err(LocationServiceError::Validation(errors)) => Ok(render_location_form(
            &state,
            &viewer,
            Some(&location),
            &form,
            &errors,
        )?
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn delete_location_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let location = state.location_service.get(id).await?;
    let context = confirm_context(
        "location",
        &location.name,
        "Its posts stay, without a location.",
        format!("/admin/locations/{}/delete/", id),
        "/admin/locations/",
    );
    state.render(&viewer, "admin/confirm_delete.html", &context)
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    state.location_service.delete(id).await?;
    Ok(found("/admin/locations/"))
}

fn render_location_form(
    state: &AppState,
    viewer: &Viewer,
    location: Option<&Location>,
    form: &LocationForm,
    errors: &FormErrors,
) -> Result<Html<String>, PageError> {
    let mut context = TeraContext::new();
    if let Some(location) = location {
        context.insert("location", location);
    }
    context.insert("form", form);
    context.insert("errors", errors);
    state.render(viewer, "admin/location_form.html", &context)
}

fn confirm_context(
    kind: &str,
    object_name: &str,
    consequence: &str,
    action_url: String,
    cancel_url: &str,
) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("kind", kind);
    context.insert("object_name", object_name);
    context.insert("consequence", consequence);
    context.insert("action_url", &action_url);
    context.insert("cancel_url", cancel_url);
    context
}

// ============================================================================
// Moderation
// ============================================================================

async fn list_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let posts = state.post_service.all_posts(query.page()).await?;

    let mut context = TeraContext::new();
    context.insert("page_obj", &posts.page_info());
    context.insert("posts", &posts.items);
    state.render(&viewer, "admin/posts.html", &context)
}

async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<VisibilityForm>,
) -> Result<Response, PageError> {
    state.post_service.set_published(id, form.is_published()).await?;
    Ok(found("/admin/posts/"))
}

async fn list_comments(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let comments = state.comment_service.all_comments(query.page()).await?;

    let mut context = TeraContext::new();
    context.insert("page_obj", &comments.page_info());
    context.insert("comments", &comments.items);
    state.render(&viewer, "admin/comments.html", &context)
}

async fn publish_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<VisibilityForm>,
) -> Result<Response, PageError> {
    state.comment_service.set_published(id, form.is_published()).await?;
    Ok(found("/admin/comments/"))
}
