//! Location service for the admin pages

use crate::db::repositories::LocationRepository;
use crate::forms::{FormErrors, LocationForm};
use crate::models::Location;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    Validation(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self.repo.list().await.context("Failed to list locations")?)
    }

    pub async fn get(&self, id: i64) -> Result<Location, LocationServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load location")?
            .ok_or(LocationServiceError::NotFound(id))
    }

    pub async fn create(&self, form: &LocationForm) -> Result<Location, LocationServiceError> {
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);
        errors.check().map_err(LocationServiceError::Validation)?;

        Ok(self
            .repo
            .create(&input)
            .await
            .context("Failed to create location")?)
    }

    pub async fn update(&self, id: i64, form: &LocationForm) -> Result<Location, LocationServiceError> {
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);
        errors.check().map_err(LocationServiceError::Validation)?;

        self.repo
            .update(id, &input)
            .await
            .context("Failed to update location")?
            .ok_or(LocationServiceError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        if self.repo.delete(id).await.context("Failed to delete location")? {
            Ok(())
        } else {
            Err(LocationServiceError::NotFound(id))
        }
    }
}
