//! Forms of the admin pages

use serde::{Deserialize, Serialize};

use super::validators::{self, MAX_LENGTH, SLUG_MAX_LENGTH};
use super::{checkbox, FormErrors};
use crate::models::{Category, CategoryInput, Location, LocationInput};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub is_published: Option<String>,
}

impl CategoryForm {
    pub fn from_category(category: &Category) -> Self {
        Self {
            title: category.title.clone(),
            description: category.description.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published.then(|| "on".to_string()),
        }
    }

    pub fn clean(&self, errors: &mut FormErrors) -> CategoryInput {
        let title = validators::required("title", &self.title, errors);
        validators::max_length("title", &title, MAX_LENGTH, errors);

        let description = validators::required("description", &self.description, errors);

        let slug = validators::required("slug", &self.slug, errors);
        validators::max_length("slug", &slug, SLUG_MAX_LENGTH, errors);
        validators::slug("slug", &slug, errors);

        CategoryInput {
            title,
            description,
            slug,
            is_published: checkbox(&self.is_published),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_published: Option<String>,
}

impl LocationForm {
    pub fn from_location(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            is_published: location.is_published.then(|| "on".to_string()),
        }
    }

    pub fn clean(&self, errors: &mut FormErrors) -> LocationInput {
        let name = validators::required("name", &self.name, errors);
        validators::max_length("name", &name, MAX_LENGTH, errors);
        LocationInput {
            name,
            is_published: checkbox(&self.is_published),
        }
    }
}

/// Publish/unpublish toggle for posts and comments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisibilityForm {
    #[serde(default)]
    pub is_published: Option<String>,
}

impl VisibilityForm {
    pub fn is_published(&self) -> bool {
        checkbox(&self.is_published)
    }
}
