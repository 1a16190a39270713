//! Profile edit page

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use tera::Context as TeraContext;

use super::common::{found, login_redirect, profile_url};
use super::middleware::{AppState, PageError, Viewer};
use crate::forms::{FormErrors, ProfileForm};
use crate::services::UserServiceError;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile/edit/", get(edit_form).post(edit))
}

/// GET /profile/edit/
async fn edit_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, PageError> {
    let Some(user) = viewer.user.as_ref() else {
        return Ok(login_redirect(&viewer.path));
    };
    render_form(&state, &viewer, &ProfileForm::from_user(user), &FormErrors::new())
}

/// POST /profile/edit/ - redirects to the profile under its (new) name
async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<ProfileForm>,
) -> Result<Response, PageError> {
    let Some(user) = viewer.user.as_ref() else {
        return Ok(login_redirect(&viewer.path));
    };

    match state.user_service.update_profile(user, &form).await {
        Ok(updated) => Ok(found(profile_url(&updated.username))),
        Err(UserServiceError::Validation(errors)) => render_form(&state, &viewer, &form, &errors),
        Err(e) => Err(e.into()),
    }
}

fn render_form(
    state: &AppState,
    viewer: &Viewer,
    form: &ProfileForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(state.render(viewer, "blog/user.html", &context)?.into_response())
}
