//! Request middleware and shared handler plumbing
//!
//! - Session lookup (`optional_auth`) and the [`Viewer`] extractor
//! - Admin gate for the `/admin/` pages
//! - Origin check for unsafe methods (`csrf_guard`)
//! - [`PageError`] and the middleware that turns it into a rendered page

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::config::{BlogConfig, Config, UploadConfig};
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CategoryService, CategoryServiceError, CommentService, CommentServiceError, LocationService,
    LocationServiceError, MediaStore, PostService, PostServiceError, UserService,
    UserServiceError,
};
use crate::theme::{StandardTemplateVars, ThemeEngine};

use super::common::login_redirect;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub theme: Arc<ThemeEngine>,
    pub upload_config: Arc<UploadConfig>,
    pub blog: Arc<BlogConfig>,
}

impl AppState {
    /// Wire repositories, services and the template engine for `config`
    pub fn from_config(pool: DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let per_page = u32::try_from(config.blog.posts_per_page).unwrap_or(u32::MAX);
        let media = Arc::new(MediaStore::new(config.upload.clone()));

        let user_service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.blog.session_days,
        );
        let post_service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxLocationRepository::boxed(pool.clone()),
            media,
            per_page,
        );
        let comment_service = CommentService::new(SqlxCommentRepository::boxed(pool.clone()), per_page);
        let category_service = CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()));
        let location_service = LocationService::new(SqlxLocationRepository::boxed(pool.clone()));

        let theme = ThemeEngine::new(config.theme.path.as_deref())?;

        Ok(Self {
            user_service: Arc::new(user_service),
            post_service: Arc::new(post_service),
            comment_service: Arc::new(comment_service),
            category_service: Arc::new(category_service),
            location_service: Arc::new(location_service),
            theme: Arc::new(theme),
            upload_config: Arc::new(config.upload.clone()),
            blog: Arc::new(config.blog.clone()),
        })
    }

    /// Render `template` with the layout variables for `viewer`
    pub fn render(
        &self,
        viewer: &Viewer,
        template: &str,
        context: &TeraContext,
    ) -> Result<Html<String>, PageError> {
        let vars = StandardTemplateVars::new(self.blog.site_name.as_str(), viewer.path.as_str())
            .with_user(viewer.user.as_ref());
        let html = self.theme.render_with_standard_vars(template, context, &vars)?;
        Ok(Html(html))
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Who is asking, and for which page.
///
/// Always extractable: `user` is `None` for anonymous requests. `path` is the
/// full request path, also inside nested routers.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: Option<User>,
    pub path: String,
}

impl Viewer {
    pub fn from_parts(parts: &Parts) -> Self {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|u| u.0.clone());
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.0.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        Self { user, path }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Page-level failures, rendered by [`error_pages`]
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("CSRF verification failed: {0}")]
    Csrf(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marks a response whose body should be replaced by an error template
#[derive(Debug, Clone, Copy)]
struct ErrorPage(&'static str);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, template) = match &self {
            PageError::NotFound(what) => {
                tracing::debug!("404: {}", what);
                (StatusCode::NOT_FOUND, Some("pages/404.html"))
            }
            PageError::Forbidden => (StatusCode::FORBIDDEN, Some("pages/403.html")),
            PageError::Csrf(reason) => {
                tracing::warn!("CSRF check failed: {}", reason);
                (StatusCode::FORBIDDEN, Some("pages/403csrf.html"))
            }
            PageError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            PageError::Internal(e) => {
                tracing::error!("{:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Some("pages/500.html"))
            }
        };

        let mut response = (status, self.to_string()).into_response();
        if let Some(template) = template {
            response.extensions_mut().insert(ErrorPage(template));
        }
        response
    }
}

impl From<PostServiceError> for PageError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(what) => PageError::NotFound(what),
            PostServiceError::InvalidPage(e) => PageError::NotFound(e.to_string()),
            PostServiceError::Validation(errors) => {
                PageError::Internal(anyhow::anyhow!("Unhandled form errors: {}", errors))
            }
            PostServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for PageError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(what) => PageError::NotFound(what),
            CommentServiceError::InvalidPage(e) => PageError::NotFound(e.to_string()),
            CommentServiceError::Validation(errors) => {
                PageError::Internal(anyhow::anyhow!("Unhandled form errors: {}", errors))
            }
            CommentServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

impl From<CategoryServiceError> for PageError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(what) => PageError::NotFound(what),
            CategoryServiceError::Validation(errors) => {
                PageError::Internal(anyhow::anyhow!("Unhandled form errors: {}", errors))
            }
            CategoryServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

impl From<LocationServiceError> for PageError {
    fn from(e: LocationServiceError) -> Self {
        match e {
            LocationServiceError::NotFound(id) => PageError::NotFound(format!("location {}", id)),
            LocationServiceError::Validation(errors) => {
                PageError::Internal(anyhow::anyhow!("Unhandled form errors: {}", errors))
            }
            LocationServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

impl From<UserServiceError> for PageError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(what) => PageError::NotFound(format!("user '{}'", what)),
            UserServiceError::AuthenticationError(msg) => {
                PageError::Internal(anyhow::anyhow!("Unhandled authentication error: {}", msg))
            }
            UserServiceError::Validation(errors) => {
                PageError::Internal(anyhow::anyhow!("Unhandled form errors: {}", errors))
            }
            UserServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

/// Extract session token from the `session` cookie
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_str
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("session="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Attach the logged-in user, if any, to the request.
///
/// Unknown or expired tokens are treated as anonymous. A failing session
/// lookup is logged and also treated as anonymous.
pub async fn optional_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    if let Some(token) = extract_session_token(&parts.headers) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                parts.extensions.insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Session validation failed: {}", e),
        }
    }
    next.run(Request::from_parts(parts, body)).await
}

/// Admin gate: anonymous viewers go to the login page, everybody else
/// without the admin role gets a 403 page
pub async fn require_admin(viewer: Viewer, request: Request, next: Next) -> Response {
    match &viewer.user {
        None => login_redirect(&viewer.path),
        Some(user) if !user.is_admin() => {
            tracing::debug!("User {} denied admin access to {}", user.username, viewer.path);
            PageError::Forbidden.into_response()
        }
        Some(_) => next.run(request).await,
    }
}

/// Reject cross-origin form posts.
///
/// For methods other than GET/HEAD/OPTIONS/TRACE the `Origin` header (or,
/// without one, the `Referer`) must name the host the request was sent to.
/// Requests carrying neither header are let through.
pub async fn csrf_guard(request: Request, next: Next) -> Result<Response, PageError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let source = headers
        .get(header::ORIGIN)
        .or_else(|| headers.get(header::REFERER))
        .map(|v| v.to_str().unwrap_or_default().to_string());

    if let Some(source) = source {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()));

        match host {
            Some(host) if same_origin(&source, &host) => {}
            Some(host) => {
                return Err(PageError::Csrf(format!("{} does not match host {}", source, host)))
            }
            None => return Err(PageError::Csrf(format!("no host to compare {} with", source))),
        }
    }

    Ok(next.run(request).await)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Whether an `Origin`/`Referer` value points at `host` (`name[:port]`)
pub(crate) fn same_origin(source: &str, host: &str) -> bool {
    let Some((_, rest)) = source.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    !authority.is_empty() && authority.eq_ignore_ascii_case(host)
}

/// Replace the body of error responses with the matching error template.
///
/// Runs inside `optional_auth` so the error page still shows who is logged in.
pub async fn error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let viewer = Viewer::from_parts(&parts);

    let response = next.run(Request::from_parts(parts, body)).await;
    let Some(ErrorPage(template)) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let vars = StandardTemplateVars::new(state.blog.site_name.as_str(), viewer.path.as_str())
        .with_user(viewer.user.as_ref());
    let html = match state
        .theme
        .render_with_standard_vars(template, &TeraContext::new(), &vars)
    {
        Ok(html) => html,
        Err(e) => {
            tracing::error!("Failed to render {}: {:#}", template, e);
            let mut context = TeraContext::new();
            context.insert("site_name", &vars.site_name);
            context.insert("request_path", &vars.request_path);
            context.insert("year", &vars.year);
            state.theme.render_with_fallback("pages/500.html", &context)
        }
    };

    (response.status(), Html(html)).into_response()
}
