use serde::{Deserialize, Serialize};

use super::validators::{self, EMAIL_MAX_LENGTH, NAME_MAX_LENGTH};
use super::FormErrors;

/// Login form. `next` is carried through a hidden input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    /// Both fields present; credentials are checked by the user service
    pub fn clean(&self, errors: &mut FormErrors) -> (String, String) {
        let username = validators::required("username", &self.username, errors);
        if self.password.is_empty() {
            errors.add("password", super::REQUIRED);
        }
        (username, self.password.clone())
    }
}

/// Sign-up form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

/// Registration fields after form validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    /// Field checks and password confirmation. The password strength policy
    /// and username uniqueness are applied by the user service.
    pub fn clean(&self, errors: &mut FormErrors) -> RegistrationInput {
        let username = validators::required("username", &self.username, errors);
        validators::max_length("username", &username, NAME_MAX_LENGTH, errors);
        validators::username("username", &username, errors);

        let email = self.email.trim().to_string();
        validators::max_length("email", &email, EMAIL_MAX_LENGTH, errors);
        validators::email("email", &email, errors);

        if self.password1.is_empty() {
            errors.add("password1", super::REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", super::REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        RegistrationInput {
            username,
            email,
            password: self.password1.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let mut errors = FormErrors::new();
        LoginForm::default().clean(&mut errors);
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_registration_password_mismatch() {
        let form = RegistrationForm {
            username: "leo".into(),
            email: String::new(),
            password1: "war-and-peace".into(),
            password2: "anna-karenina".into(),
        };
        let mut errors = FormErrors::new();
        form.clean(&mut errors);

        assert!(!errors.has("password1"));
        assert_eq!(errors.get("password2"), ["The two password fields didn't match.".to_string()]);
    }

    #[test]
    fn test_registration_valid() {
        let form = RegistrationForm {
            username: "leo".into(),
            email: "leo@example.com".into(),
            password1: "war-and-peace".into(),
            password2: "war-and-peace".into(),
        };
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);
        assert!(errors.is_empty());
        assert_eq!(input.password, "war-and-peace");
    }

    #[test]
    fn test_passwords_are_not_echoed_back() {
        let form = RegistrationForm {
            username: "leo".into(),
            email: String::new(),
            password1: "secret-one".into(),
            password2: "secret-two".into(),
        };
        let json = serde_json::to_string(&form).unwrap();
        assert!(!json.contains("secret"));
    }
}
