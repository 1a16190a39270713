//! Comment service

use crate::db::repositories::CommentRepository;
use crate::forms::{CommentForm, FormErrors};
use crate::models::{Comment, CommentWithAuthor, InvalidPage, ListParams, PagedResult, User};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    #[error("Validation error: {0}")]
    Validation(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    per_page: u32,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, per_page: u32) -> Self {
        Self {
            repo,
            per_page: per_page.max(1),
        }
    }

    /// Thread of a post. Comments hidden by an admin stay in the thread and
    /// are marked as hidden by the template.
    pub async fn list_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let comments = self
            .repo
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    pub async fn create(
        &self,
        author: &User,
        post_id: i64,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        let mut errors = FormErrors::new();
        let text = form.clean(&mut errors);
        errors.check().map_err(CommentServiceError::Validation)?;

        let comment = self
            .repo
            .create(author.id, post_id, &text)
            .await
            .context("Failed to create comment")?;
        tracing::info!("User {} commented on post {}", author.username, post_id);
        Ok(comment)
    }

    /// Comment `comment_id`, which must belong to post `post_id`
    pub async fn get_for_post(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(comment_id)
            .await
            .context("Failed to load comment")?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| {
                CommentServiceError::NotFound(format!("comment {} on post {}", comment_id, post_id))
            })
    }

    /// Replace the text; `created_at` stays as it was
    pub async fn update(
        &self,
        comment: &Comment,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        let mut errors = FormErrors::new();
        let text = form.clean(&mut errors);
        errors.check().map_err(CommentServiceError::Validation)?;

        self.repo
            .update_text(comment.id, &text)
            .await
            .context("Failed to update comment")?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", comment.id)))
    }

    pub async fn delete(&self, comment: &Comment) -> Result<(), CommentServiceError> {
        let deleted = self
            .repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;
        if deleted {
            Ok(())
        } else {
            Err(CommentServiceError::NotFound(format!("comment {}", comment.id)))
        }
    }

    /// Admin listing, newest first
    pub async fn all_comments(
        &self,
        page: Option<&str>,
    ) -> Result<PagedResult<CommentWithAuthor>, CommentServiceError> {
        let total = self.repo.count_all().await.context("Failed to count comments")?;
        let params = ListParams::resolve(page, total, self.per_page)?;
        let items = self
            .repo
            .list_all(&params)
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(items, total, &params))
    }

    pub async fn set_published(&self, id: i64, is_published: bool) -> Result<(), CommentServiceError> {
        let found = self
            .repo
            .set_published(id, is_published)
            .await
            .context("Failed to change comment visibility")?;
        if found {
            Ok(())
        } else {
            Err(CommentServiceError::NotFound(format!("comment {}", id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::test_fixtures;
    use crate::db::repositories::{PostRepository, SqlxCommentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    async fn setup() -> (CommentService, User, User, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = test_fixtures::user(&pool, "leo").await;
        let reader = test_fixtures::user(&pool, "anna").await;
        let category = test_fixtures::category(&pool, "news", true).await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(
                author.id,
                &test_fixtures::post_input("Hello", Utc::now(), Some(category)),
            )
            .await
            .unwrap();

        let service = CommentService::new(SqlxCommentRepository::boxed(pool), 2);
        (service, author, reader, post.id)
    }

    fn text(value: &str) -> CommentForm {
        CommentForm { text: value.into() }
    }

    #[tokio::test]
    async fn test_create_and_thread() {
        let (service, author, reader, post_id) = setup().await;
        service.create(&reader, post_id, &text("first")).await.unwrap();
        service.create(&author, post_id, &text("second")).await.unwrap();

        let thread = service.list_for_post(post_id).await.unwrap();
        let texts: Vec<_> = thread.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(thread[0].author_username, "anna");
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let (service, author, _, post_id) = setup().await;
        let err = service.create(&author, post_id, &text("   ")).await.unwrap_err();
        assert!(matches!(err, CommentServiceError::Validation(ref e) if e.has("text")));
        assert!(service.list_for_post(post_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_must_belong_to_post() {
        let (service, author, _, post_id) = setup().await;
        let comment = service.create(&author, post_id, &text("hi")).await.unwrap();

        assert!(service.get_for_post(post_id, comment.id).await.is_ok());
        assert!(matches!(
            service.get_for_post(post_id + 1, comment.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_delete_and_moderation() {
        let (service, author, _, post_id) = setup().await;
        let created = service.create(&author, post_id, &text("draft")).await.unwrap();
        let comment = service.get_for_post(post_id, created.id).await.unwrap();

        let updated = service.update(&comment, &text("final")).await.unwrap();
        assert_eq!(updated.text, "final");
        assert_eq!(updated.created_at, comment.created_at);

        service.set_published(comment.id, false).await.unwrap();
        let thread = service.list_for_post(post_id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert!(!thread[0].comment.is_published);

        let all = service.all_comments(None).await.unwrap();
        assert_eq!(all.total, 1);

        service.delete(&comment).await.unwrap();
        assert!(matches!(
            service.delete(&comment).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
