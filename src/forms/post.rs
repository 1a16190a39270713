use serde::{Deserialize, Serialize};

use super::validators::{self, MAX_LENGTH};
use super::{FormErrors, REQUIRED};
use crate::models::{Post, PostInput};

/// Post create/edit form.
///
/// `author` and `is_published` are deliberately not part of the form: the
/// author is the logged-in user and publication is an admin decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    /// Category id as submitted by the `<select>`
    #[serde(default)]
    pub category: String,
    /// Location id, empty for none
    #[serde(default)]
    pub location: String,
    /// "Clear" checkbox next to the current image
    #[serde(default)]
    pub image_clear: bool,
}

impl PostForm {
    /// Pre-filled form for editing an existing post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: validators::format_datetime_local(&post.pub_date),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            image_clear: false,
        }
    }

    /// Check field constraints. Whether the chosen category and location
    /// exist is up to the caller. The returned input carries no image.
    pub fn clean(&self, errors: &mut FormErrors) -> PostInput {
        let title = validators::required("title", &self.title, errors);
        validators::max_length("title", &title, MAX_LENGTH, errors);

        let text = validators::required("text", &self.text, errors);
        let pub_date = validators::datetime("pub_date", &self.pub_date, errors);

        let category_id = validators::choice("category", &self.category, errors);
        if self.category.trim().is_empty() {
            errors.add("category", REQUIRED);
        }
        let location_id = validators::choice("location", &self.location, errors);

        PostInput {
            title,
            text,
            pub_date: pub_date.unwrap_or_else(chrono::Utc::now),
            location_id,
            category_id,
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn valid_form() -> PostForm {
        PostForm {
            title: "Hello".into(),
            text: "World".into(),
            pub_date: "2024-05-01T12:30".into(),
            category: "3".into(),
            location: String::new(),
            image_clear: false,
        }
    }

    #[test]
    fn test_clean_valid_form() {
        let mut errors = FormErrors::new();
        let input = valid_form().clean(&mut errors);

        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(input.title, "Hello");
        assert_eq!(input.pub_date, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
        assert_eq!(input.category_id, Some(3));
        assert_eq!(input.location_id, None);
        assert!(input.image.is_none());
    }

    #[test]
    fn test_clean_reports_every_field() {
        let mut errors = FormErrors::new();
        PostForm::default().clean(&mut errors);

        for field in ["title", "text", "pub_date", "category"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
        assert!(!errors.has("location"));
    }

    #[test]
    fn test_clean_rejects_long_title_and_bad_date() {
        let mut form = valid_form();
        form.title = "x".repeat(MAX_LENGTH + 1);
        form.pub_date = "31.12.2024".into();
        form.location = "abc".into();

        let mut errors = FormErrors::new();
        form.clean(&mut errors);
        assert!(errors.has("title"));
        assert!(errors.has("pub_date"));
        assert!(errors.has("location"));
    }

    #[test]
    fn test_from_post_round_trips_through_clean() {
        let post = Post {
            id: 1,
            title: "T".into(),
            text: "body".into(),
            pub_date: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap(),
            image: None,
            is_published: true,
            created_at: Utc::now(),
            author_id: 1,
            location_id: Some(5),
            category_id: Some(2),
        };

        let mut errors = FormErrors::new();
        let input = PostForm::from_post(&post).clean(&mut errors);
        assert!(errors.is_empty());
        assert_eq!(input.pub_date, post.pub_date);
        assert_eq!(input.location_id, Some(5));
        assert_eq!(input.category_id, Some(2));
    }
}
