//! User service
//!
//! Registration (the first user becomes admin), login sessions and profile
//! edits.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::forms::{FormErrors, LoginForm, ProfileForm, RegistrationForm};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, password_problems, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    Validation(FormErrors),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_lifetime: Duration,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_lifetime: Duration::days(session_expiration_days.max(1)),
        }
    }

    /// Register a new user.
    ///
    /// The first account in an empty database is made an admin, everybody
    /// after that is an author.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, UserServiceError> {
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);

        if !errors.has("password1") && !errors.has("password2") {
            for problem in password_problems(&input.password, &input.username) {
                errors.add("password2", problem);
            }
        }
        if !errors.has("username")
            && self
                .user_repo
                .username_taken(&input.username, None)
                .await
                .context("Failed to check username")?
        {
            errors.add("username", USERNAME_TAKEN);
        }
        errors.check().map_err(UserServiceError::Validation)?;

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::Author
        };
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = self
            .user_repo
            .create(&User::new(input.username, input.email, password_hash, role))
            .await
            .context("Failed to create user")?;

        tracing::info!("Registered user {} as {}", user.username, user.role);
        Ok(user)
    }

    /// Check credentials and open a session
    pub async fn login(&self, form: &LoginForm) -> Result<(User, Session), UserServiceError> {
        let mut errors = FormErrors::new();
        let (username, password) = form.clean(&mut errors);
        errors.check().map_err(UserServiceError::Validation)?;

        let user = self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to get user by username")?;

        let Some(user) = user else {
            tracing::debug!("Login failed: unknown user {}", username);
            return Err(UserServiceError::AuthenticationError(INVALID_LOGIN.to_string()));
        };

        let password_valid = verify_password(&password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!("Login failed: wrong password for {}", username);
            return Err(UserServiceError::AuthenticationError(INVALID_LOGIN.to_string()));
        }

        let session = self
            .session_repo
            .create(&Session::start(user.id, self.session_lifetime))
            .await
            .context("Failed to create session")?;
        Ok((user, session))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a session token.
    ///
    /// Unknown and expired tokens yield `None`; an expired session is removed
    /// on the spot.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// Check if this is the first user (for auto-admin)
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| UserServiceError::NotFound(username.to_string()))
    }

    /// Apply the profile form; the username must stay unique
    pub async fn update_profile(
        &self,
        user: &User,
        form: &ProfileForm,
    ) -> Result<User, UserServiceError> {
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);

        if !errors.has("username")
            && self
                .user_repo
                .username_taken(&input.username, Some(user.id))
                .await
                .context("Failed to check username")?
        {
            errors.add("username", USERNAME_TAKEN);
        }
        errors.check().map_err(UserServiceError::Validation)?;

        self.user_repo
            .update_profile(user.id, &input)
            .await
            .context("Failed to update profile")?
            .ok_or_else(|| UserServiceError::NotFound(user.username.clone()))
    }

    /// Delete all expired sessions; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired(Utc::now())
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}
