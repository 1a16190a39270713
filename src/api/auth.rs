//! Login, logout and registration pages
//!
//! The session token travels in an HttpOnly `session` cookie.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use super::common::{found, safe_next};
use super::middleware::{extract_session_token, AppState, PageError, Viewer};
use crate::forms::{FormErrors, LoginForm, RegistrationForm, NON_FIELD_ERRORS};
use crate::models::Session;
use crate::services::UserServiceError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", get(logout).post(logout))
        .route("/auth/registration/", get(registration_form).post(register))
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

fn session_cookie(session: &Session) -> String {
    format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        session.max_age_seconds()
    )
}

const CLEAR_SESSION_COOKIE: &str = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

/// GET /auth/login/
async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<Response, PageError> {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    render_login(&state, &viewer, &form, &FormErrors::new())
}

/// POST /auth/login/
async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    match state.user_service.login(&form).await {
        Ok((user, session)) => {
            tracing::info!("User {} logged in", user.username);
            let mut response = found(safe_next(form.next.as_deref()));
            let cookie = HeaderValue::from_str(&session_cookie(&session))
                .map_err(|e| PageError::Internal(e.into()))?;
            response.headers_mut().insert(header::SET_COOKIE, cookie);
            Ok(response)
        }
        Err(UserServiceError::Validation(errors)) => render_login(&state, &viewer, &form, &errors),
        Err(UserServiceError::AuthenticationError(message)) => {
            let mut errors = FormErrors::new();
            errors.add(NON_FIELD_ERRORS, message);
            render_login(&state, &viewer, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

/// GET|POST /auth/logout/ - ends the session and says goodbye
async fn logout(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    if let Some(user) = &viewer.user {
        tracing::info!("User {} logged out", user.username);
    }

    let anonymous = Viewer {
        user: None,
        path: viewer.path,
    };
    let mut response = state
        .render(&anonymous, "registration/logged_out.html", &TeraContext::new())?
        .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static(CLEAR_SESSION_COOKIE),
    );
    Ok(response)
}

/// GET /auth/registration/
async fn registration_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, PageError> {
    render_registration(&state, &viewer, &RegistrationForm::default(), &FormErrors::new())
}

/// POST /auth/registration/ - the new account logs in separately
async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, PageError> {
    match state.user_service.register(&form).await {
        Ok(_) => Ok(found("/auth/login/")),
        Err(UserServiceError::Validation(errors)) => {
            render_registration(&state, &viewer, &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

fn render_login(
    state: &AppState,
    viewer: &Viewer,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(state.render(viewer, "registration/login.html", &context)?.into_response())
}

fn render_registration(
    state: &AppState,
    viewer: &Viewer,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(state
        .render(viewer, "registration/registration_form.html", &context)?
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_cookie_attributes() {
        let session = Session::start(1, Duration::days(7));
        let cookie = session_cookie(&session);

        assert!(cookie.starts_with(&format!("session={};", session.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains(&format!("Max-Age={}", session.max_age_seconds())));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        assert!(CLEAR_SESSION_COOKIE.starts_with("session=;"));
        assert!(CLEAR_SESSION_COOKIE.ends_with("Max-Age=0"));
    }
}
