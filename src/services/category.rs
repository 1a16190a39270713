//! Category service
//!
//! Admin-side management of categories. Slugs are unique; deleting a
//! category leaves its posts in place without a category.

use crate::db::repositories::CategoryRepository;
use crate::forms::{CategoryForm, FormErrors};
use crate::models::Category;
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to load category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    pub async fn create(&self, form: &CategoryForm) -> Result<Category, CategoryServiceError> {
        let input = self.clean(form, None).await?;
        let category = self
            .repo
            .create(&input)
            .await
            .context("Failed to create category")?;
        tracing::info!("Created category {}", category.slug);
        Ok(category)
    }

    pub async fn update(&self, id: i64, form: &CategoryForm) -> Result<Category, CategoryServiceError> {
        let input = self.clean(form, Some(id)).await?;
        self.repo
            .update(id, &input)
            .await
            .context("Failed to update category")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete category")? {
            return Err(CategoryServiceError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted category {}", id);
        Ok(())
    }

    async fn clean(
        &self,
        form: &CategoryForm,
        except_id: Option<i64>,
    ) -> Result<crate::models::CategoryInput, CategoryServiceError> {
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);

        if !errors.has("slug")
            && self
                .repo
                .slug_taken(&input.slug, except_id)
                .await
                .context("Failed to check slug")?
        {
            errors.add("slug", "Category with this slug already exists.");
        }

        errors.check().map_err(CategoryServiceError::Validation)?;
        Ok(input)
    }
}
