//! Comment create/edit/delete pages
//!
//! Every outcome, including a refused edit, lands back on the post page.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use super::common::{found, login_redirect, post_url};
use super::middleware::{AppState, PageError, Viewer};
use crate::forms::{CommentForm, FormErrors};
use crate::models::Comment;
use crate::services::{author_only, CommentServiceError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comment/", post(create))
        .route(
            "/posts/{id}/edit_comment/{comment_id}",
            get(edit_form).post(edit),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}",
            get(delete_confirm).post(delete),
        )
}

/// POST /posts/{id}/comment/
async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let Some(author) = viewer.user.as_ref() else {
        return Ok(login_redirect(&post_url(post_id)));
    };
    // only posts the author can see take comments
    state
        .post_service
        .get_for_viewer(post_id, Some(author))
        .await?;

    match state.comment_service.create(author, post_id, &form).await {
        Ok(_) => Ok(found(post_url(post_id))),
        Err(CommentServiceError::Validation(errors)) => {
            render_form(&state, &viewer, "create", post_id, None, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/edit_comment/{comment_id}
async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    let comment = state
        .comment_service
        .get_for_post(post_id, comment_id)
        .await?;
    if !author_only(viewer.user.as_ref(), &comment).is_granted() {
        return Ok(found(post_url(post_id)));
    }

    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_form(&state, &viewer, "edit", post_id, Some(&comment), &form, &FormErrors::new())
}

/// POST /posts/{post_id}/edit_comment/{comment_id}
async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, PageError> {
    let comment = state
        .comment_service
        .get_for_post(post_id, comment_id)
        .await?;
    if !author_only(viewer.user.as_ref(), &comment).is_granted() {
        return Ok(found(post_url(post_id)));
    }

    match state.comment_service.update(&comment, &form).await {
        Ok(_) => Ok(found(post_url(post_id))),
        Err(CommentServiceError::Validation(errors)) => {
            render_form(&state, &viewer, "edit", post_id, Some(&comment), &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id}
async fn delete_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    let comment = state
        .comment_service
        .get_for_post(post_id, comment_id)
        .await?;
    if !author_only(viewer.user.as_ref(), &comment).is_granted() {
        return Ok(found(post_url(post_id)));
    }

    let form = CommentForm {
        text: comment.text.clone(),
    };
    render_form(&state, &viewer, "delete", post_id, Some(&comment), &form, &FormErrors::new())
}

/// POST /posts/{post_id}/delete_comment/{comment_id}
async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, PageError> {
    let comment = state
        .comment_service
        .get_for_post(post_id, comment_id)
        .await?;
    if author_only(viewer.user.as_ref(), &comment).is_granted() {
        state.comment_service.delete(&comment).await?;
    }
    Ok(found(post_url(post_id)))
}

fn render_form(
    state: &AppState,
    viewer: &Viewer,
    action: &str,
    post_id: i64,
    comment: Option<&Comment>,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();
    context.insert("action", action);
    context.insert("post_id", &post_id);
    if let Some(comment) = comment {
        context.insert("comment", comment);
    }
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(state.render(viewer, "blog/comment.html", &context)?.into_response())
}
