use serde::{Deserialize, Serialize};

use super::validators::{self, EMAIL_MAX_LENGTH, NAME_MAX_LENGTH};
use super::FormErrors;
use crate::models::{UpdateProfileInput, User};

/// Profile edit form. Uniqueness of the username is checked by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn clean(&self, errors: &mut FormErrors) -> UpdateProfileInput {
        let username = validators::required("username", &self.username, errors);
        validators::max_length("username", &username, NAME_MAX_LENGTH, errors);
        validators::username("username", &username, errors);

        let first_name = self.first_name.trim().to_string();
        validators::max_length("first_name", &first_name, NAME_MAX_LENGTH, errors);
        let last_name = self.last_name.trim().to_string();
        validators::max_length("last_name", &last_name, NAME_MAX_LENGTH, errors);

        let email = self.email.trim().to_string();
        validators::max_length("email", &email, EMAIL_MAX_LENGTH, errors);
        validators::email("email", &email, errors);

        UpdateProfileInput {
            username,
            first_name,
            last_name,
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_clean() {
        let form = ProfileForm {
            username: " leo ".into(),
            first_name: "Leo".into(),
            last_name: String::new(),
            email: String::new(),
        };
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);

        assert!(errors.is_empty());
        assert_eq!(input.username, "leo");
        assert_eq!(input.first_name, "Leo");
    }

    #[test]
    fn test_profile_rejects_bad_values() {
        let form = ProfileForm {
            username: "leo tolstoy".into(),
            first_name: "L".repeat(NAME_MAX_LENGTH + 1),
            last_name: String::new(),
            email: "not-an-email".into(),
        };
        let mut errors = FormErrors::new();
        form.clean(&mut errors);

        assert!(errors.has("username"));
        assert!(errors.has("first_name"));
        assert!(errors.has("email"));
        assert!(!errors.has("last_name"));
    }
}
