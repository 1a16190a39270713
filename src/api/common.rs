//! Helpers shared by the page handlers

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// `?page=` of a listing; resolved by the services
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// 302 to `location`
pub fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// Send an anonymous visitor to the login page, coming back to `path` afterwards
pub fn login_redirect(path: &str) -> Response {
    found(format!("/auth/login/?next={}", urlencoding::encode(path)))
}

pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// The `next` target after login.
///
/// Only local absolute paths are followed; anything that could leave the
/// site (`//host`, `http://...`, backslash tricks) falls back to the index.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_sets_location() {
        let response = found("/posts/1/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/posts/1/");
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        let response = login_redirect("/posts/create/");
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login/?next=%2Fposts%2Fcreate%2F"
        );
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/posts/3/")), "/posts/3/");
        assert_eq!(safe_next(Some("/profile/leo/?page=2")), "/profile/leo/?page=2");
        assert_eq!(safe_next(None), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(Some("//evil.test/")), "/");
        assert_eq!(safe_next(Some("https://evil.test/")), "/");
        assert_eq!(safe_next(Some("/\\evil.test")), "/");
    }

    #[test]
    fn test_urls() {
        assert_eq!(post_url(7), "/posts/7/");
        assert_eq!(profile_url("leo"), "/profile/leo/");
        assert_eq!(profile_url("a+b@c"), "/profile/a%2Bb%40c/");
    }
}
