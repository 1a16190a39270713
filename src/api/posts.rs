//! Post detail and the create/edit/delete pages

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use super::common::{found, login_redirect, post_url, profile_url};
use super::middleware::{AppState, PageError, Viewer};
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::models::Post;
use crate::services::{author_only, ImageUpload, PostServiceError};

/// Room for the text fields next to the largest allowed image
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    Router::new()
        .route("/posts/create/", get(create_form).post(create))
        .route("/posts/{id}/", get(detail))
        .route("/posts/{id}/edit/", get(edit_form).post(edit))
        .route("/posts/{id}/delete/", get(delete_confirm).post(delete))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// GET /posts/{id}/ - post with its comment thread
async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let post = state
        .post_service
        .get_for_viewer(id, viewer.user.as_ref())
        .await?;
    let comments = state
        .comment_service
        .list_for_post(id)
        .await?;
    let is_author = author_only(viewer.user.as_ref(), &post).is_granted();

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("comments", &comments);
    context.insert("is_author", &is_author);
    context.insert("form", &CommentForm::default());
    context.insert("errors", &FormErrors::new());
    Ok(state.render(&viewer, "blog/detail.html", &context)?.into_response())
}

/// GET /posts/create/
async fn create_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, PageError> {
    if viewer.user.is_none() {
        return Ok(login_redirect(&viewer.path));
    }
    render_form(&state, &viewer, "create", None, &PostForm::default(), &FormErrors::new()).await
}

/// POST /posts/create/ - on success, off to the author's profile
async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let Some(author) = viewer.user.as_ref() else {
        return Ok(login_redirect(&viewer.path));
    };
    let (form, image) = read_post_form(multipart).await?;

    match state.post_service.create(author, &form, image).await {
        Ok(_) => Ok(found(profile_url(&author.username))),
        Err(PostServiceError::Validation(errors)) => {
            render_form(&state, &viewer, "create", None, &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/edit/
async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let post = state.post_service.get_post(id).await?;
    if !author_only(viewer.user.as_ref(), &post).is_granted() {
        return Ok(found(post_url(id)));
    }
    let form = PostForm::from_post(&post);
    render_form(&state, &viewer, "edit", Some(&post), &form, &FormErrors::new()).await
}

/// POST /posts/{id}/edit/
async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, PageError> {
    let post = state.post_service.get_post(id).await?;
    if !author_only(viewer.user.as_ref(), &post).is_granted() {
        return Ok(found(post_url(id)));
    }
    let (form, image) = read_post_form(multipart).await?;

    match state.post_service.update(&post, &form, image).await {
        Ok(_) => Ok(found(post_url(id))),
        Err(PostServiceError::Validation(errors)) => {
            render_form(&state, &viewer, "edit", Some(&post), &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}/delete/ - confirmation page
async fn delete_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let post = state.post_service.get_post(id).await?;
    if !author_only(viewer.user.as_ref(), &post).is_granted() {
        return Ok(found(post_url(id)));
    }

    let mut context = TeraContext::new();
    context.insert("action", "delete");
    context.insert("post", &post);
    context.insert("form", &PostForm::from_post(&post));
    context.insert("errors", &FormErrors::new());
    Ok(state.render(&viewer, "blog/create.html", &context)?.into_response())
}

/// POST /posts/{id}/delete/
async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Response, PageError> {
    let post = state.post_service.get_post(id).await?;
    if !author_only(viewer.user.as_ref(), &post).is_granted() {
        return Ok(found(post_url(id)));
    }
    state.post_service.delete(&post).await?;
    Ok(found("/"))
}

async fn render_form(
    state: &AppState,
    viewer: &Viewer,
    action: &str,
    post: Option<&Post>,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let (categories, locations) = state.post_service.form_choices().await?;

    let mut context = TeraContext::new();
    context.insert("action", action);
    if let Some(post) = post {
        context.insert("post", post);
    }
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", &categories);
    context.insert("locations", &locations);
    Ok(state.render(viewer, "blog/create.html", &context)?.into_response())
}

/// Read the multipart post form. An empty file input means "no new image".
async fn read_post_form(
    mut multipart: Multipart,
) -> Result<(PostForm, Option<ImageUpload>), PageError> {
    let mut form = PostForm::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PageError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            let filename = field.file_name().unwrap_or("").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| PageError::BadRequest(format!("Failed to read image: {}", e)))?;
            if !filename.is_empty() && !data.is_empty() {
                image = Some(ImageUpload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| PageError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
        match name.as_str() {
            "title" => form.title = value,
            "text" => form.text = value,
            "pub_date" => form.pub_date = value,
            "category" => form.category = value,
            "location" => form.location = value,
            "image-clear" => form.image_clear = true,
            _ => {}
        }
    }

    Ok((form, image))
}
