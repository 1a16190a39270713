//! Post service
//!
//! Listing scopes, viewer-aware lookups and the create/update/delete flow
//! of the post form, including the post image.

use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository};
use crate::forms::{FormErrors, PostForm, INVALID_CHOICE};
use crate::models::{
    Category, InvalidPage, ListParams, Location, PagedResult, Post, PostInput, PostScope,
    PostWithMeta, User,
};
use crate::services::media::{ImageUpload, MediaStore};
use crate::services::visibility;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Missing, or not visible to the viewer
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    /// Form errors; nothing was written
    #[error("Validation error: {0}")]
    Validation(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    location_repo: Arc<dyn LocationRepository>,
    media: Arc<MediaStore>,
    posts_per_page: u32,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        location_repo: Arc<dyn LocationRepository>,
        media: Arc<MediaStore>,
        posts_per_page: u32,
    ) -> Self {
        Self {
            post_repo,
            category_repo,
            location_repo,
            media,
            posts_per_page: posts_per_page.max(1),
        }
    }

    /// Index page: every publicly visible post
    pub async fn published_posts(
        &self,
        page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.page_of(PostScope::Published, page, Utc::now()).await
    }

    /// Category page; the category itself must exist and be published
    pub async fn category_posts(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<(Category, PagedResult<PostWithMeta>), PostServiceError> {
        let category = self
            .category_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load category")?
            .filter(|c| c.is_published)
            .ok_or_else(|| PostServiceError::NotFound(format!("category '{}'", slug)))?;

        let posts = self
            .page_of(PostScope::PublishedInCategory(category.id), page, Utc::now())
            .await?;
        Ok((category, posts))
    }

    /// Profile page; the owner also sees hidden and scheduled posts
    pub async fn author_posts(
        &self,
        author: &User,
        viewer: Option<&User>,
        page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let scope = PostScope::ByAuthor {
            author_id: author.id,
            include_hidden: viewer.is_some_and(|v| v.id == author.id),
        };
        self.page_of(scope, page, Utc::now()).await
    }

    /// Admin listing of every post
    pub async fn all_posts(
        &self,
        page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.page_of(PostScope::All, page, Utc::now()).await
    }

    async fn page_of(
        &self,
        scope: PostScope,
        page: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let total = self
            .post_repo
            .count(scope, now)
            .await
            .context("Failed to count posts")?;
        let params = ListParams::resolve(page, total, self.posts_per_page)?;
        let items = self
            .post_repo
            .list(scope, now, &params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Raw post, no visibility rules
    pub async fn get_post(&self, id: i64) -> Result<Post, PostServiceError> {
        self.post_repo
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }

    /// Post as `viewer` may see it; hidden posts of other authors are not found
    pub async fn get_for_viewer(
        &self,
        id: i64,
        viewer: Option<&User>,
    ) -> Result<PostWithMeta, PostServiceError> {
        let post = self
            .post_repo
            .get_with_meta(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))?;

        if visibility::can_view(viewer, &post, Utc::now()) {
            Ok(post)
        } else {
            Err(PostServiceError::NotFound(format!("post {}", id)))
        }
    }

    /// Options for the category and location selects
    pub async fn form_choices(&self) -> Result<(Vec<Category>, Vec<Location>), PostServiceError> {
        let categories = self
            .category_repo
            .list()
            .await
            .context("Failed to list categories")?;
        let locations = self
            .location_repo
            .list()
            .await
            .context("Failed to list locations")?;
        Ok((categories, locations))
    }

    pub async fn create(
        &self,
        author: &User,
        form: &PostForm,
        image: Option<ImageUpload>,
    ) -> Result<Post, PostServiceError> {
        let mut input = self.clean(form, image.as_ref()).await?;
        if let Some(upload) = &image {
            input.image = Some(self.media.save(upload).await?);
        }

        let post = self
            .post_repo
            .create(author.id, &input)
            .await
            .context("Failed to create post")?;

        tracing::info!("User {} created post {}", author.username, post.id);
        Ok(post)
    }

    /// Apply the edit form to `post`.
    ///
    /// A new upload replaces the current image and `image_clear` drops it; the
    /// old file is deleted once the row is updated.
    pub async fn update(
        &self,
        post: &Post,
        form: &PostForm,
        image: Option<ImageUpload>,
    ) -> Result<Post, PostServiceError> {
        let mut input = self.clean(form, image.as_ref()).await?;
        input.image = match &image {
            Some(upload) => Some(self.media.save(upload).await?),
            None if form.image_clear => None,
            None => post.image.clone(),
        };

        let updated = self
            .post_repo
            .update(post.id, &input)
            .await
            .context("Failed to update post")?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", post.id)))?;

        if let Some(old) = &post.image {
            if updated.image.as_deref() != Some(old.as_str()) {
                self.media.remove(old).await;
            }
        }
        Ok(updated)
    }

    /// Delete a post with its comments and image
    pub async fn delete(&self, post: &Post) -> Result<(), PostServiceError> {
        let deleted = self
            .post_repo
            .delete(post.id)
            .await
            .context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound(format!("post {}", post.id)));
        }
        if let Some(image) = &post.image {
            self.media.remove(image).await;
        }
        tracing::info!("Deleted post {}", post.id);
        Ok(())
    }

    pub async fn set_published(&self, id: i64, is_published: bool) -> Result<(), PostServiceError> {
        let found = self
            .post_repo
            .set_published(id, is_published)
            .await
            .context("Failed to change post visibility")?;
        if found {
            Ok(())
        } else {
            Err(PostServiceError::NotFound(format!("post {}", id)))
        }
    }

    /// Form validation plus the checks that need the database
    async fn clean(
        &self,
        form: &PostForm,
        image: Option<&ImageUpload>,
    ) -> Result<PostInput, PostServiceError> {
        let mut errors = FormErrors::new();
        let input = form.clean(&mut errors);

        if let Some(id) = input.category_id {
            let exists = self
                .category_repo
                .get_by_id(id)
                .await
                .context("Failed to check category")?
                .is_some();
            if !exists {
                errors.add("category", INVALID_CHOICE);
            }
        }
        if let Some(id) = input.location_id {
            let exists = self
                .location_repo
                .get_by_id(id)
                .await
                .context("Failed to check location")?
                .is_some();
            if !exists {
                errors.add("location", INVALID_CHOICE);
            }
        }

        if let Some(upload) = image {
            self.media.check(upload, &mut errors);
            if form.image_clear {
                errors.add(
                    "image",
                    "Please either submit a file or check the clear checkbox, not both.",
                );
            }
        }

        errors.check().map_err(PostServiceError::Validation)?;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::post::test_fixtures;
    use crate::db::repositories::{
        CommentRepository, SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository,
        SqlxPostRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::forms::validators::format_datetime_local;
    use crate::models::LocationInput;
    use chrono::Duration;
    use tempfile::TempDir;

    struct Fixture {
        pool: DynDatabasePool,
        service: PostService,
        media_dir: TempDir,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let media_dir = TempDir::new().unwrap();
        let media = Arc::new(MediaStore::new(UploadConfig {
            path: media_dir.path().to_path_buf(),
            ..UploadConfig::default()
        }));
        let service = PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxLocationRepository::boxed(pool.clone()),
            media,
            2,
        );
        Fixture {
            pool,
            service,
            media_dir,
        }
    }

    fn form(title: &str, pub_date: DateTime<Utc>, category_id: i64) -> PostForm {
        PostForm {
            title: title.into(),
            text: format!("{} text", title),
            pub_date: format_datetime_local(&pub_date),
            category: category_id.to_string(),
            ..PostForm::default()
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            filename: "cat.png".into(),
            content_type: "image/png".into(),
            data: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn test_scheduled_post_visible_to_author_only() {
        let fx = setup().await;
        let author = test_fixtures::user(&fx.pool, "leo").await;
        let reader = test_fixtures::user(&fx.pool, "anna").await;
        let news = test_fixtures::category(&fx.pool, "news", true).await;

        let past = Utc::now() - Duration::hours(1);
        let future = Utc::now() + Duration::hours(1);
        fx.service.create(&author, &form("Hello", past, news), None).await.unwrap();
        let scheduled = fx
            .service
            .create(&author, &form("Later", future, news), None)
            .await
            .unwrap();

        let index = fx.service.published_posts(None).await.unwrap();
        assert_eq!(index.total, 1);
        assert_eq!(index.items[0].post.title, "Hello");

        let (category, listed) = fx.service.category_posts("news", None).await.unwrap();
        assert_eq!(category.id, news);
        assert_eq!(listed.total, 1);

        let own = fx.service.author_posts(&author, Some(&author), None).await.unwrap();
        assert_eq!(own.total, 2);
        let others = fx.service.author_posts(&author, Some(&reader), None).await.unwrap();
        assert_eq!(others.total, 1);

        assert!(fx.service.get_for_viewer(scheduled.id, Some(&author)).await.is_ok());
        assert!(matches!(
            fx.service.get_for_viewer(scheduled.id, Some(&reader)).await,
            Err(PostServiceError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.get_for_viewer(scheduled.id, None).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unpublished_category_page_is_not_found() {
        let fx = setup().await;
        test_fixtures::category(&fx.pool, "drafts", false).await;

        assert!(matches!(
            fx.service.category_posts("drafts", None).await,
            Err(PostServiceError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.category_posts("missing", None).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pagination_and_bad_pages() {
        let fx = setup().await;
        let author = test_fixtures::user(&fx.pool, "leo").await;
        let news = test_fixtures::category(&fx.pool, "news", true).await;
        let base = Utc::now() - Duration::days(1);
        for i in 0..5 {
            let pub_date = base - Duration::hours(i);
            fx.service
                .create(&author, &form(&format!("Post {}", i), pub_date, news), None)
                .await
                .unwrap();
        }

        let first = fx.service.published_posts(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].post.title, "Post 0");
        assert_eq!(first.total_pages(), 3);

        let last = fx.service.published_posts(Some("last")).await.unwrap();
        assert_eq!(last.page, 3);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].post.title, "Post 4");

        assert!(matches!(
            fx.service.published_posts(Some("4")).await,
            Err(PostServiceError::InvalidPage(InvalidPage::OutOfRange))
        ));
        assert!(matches!(
            fx.service.published_posts(Some("two")).await,
            Err(PostServiceError::InvalidPage(InvalidPage::NotANumber(_)))
        ));
    }

    #[tokio::test]
    async fn test_create_validation_persists_nothing() {
        let fx = setup().await;
        let author = test_fixtures::user(&fx.pool, "leo").await;

        let mut bad = form("", Utc::now(), 999);
        bad.location = "42".into();
        let err = fx.service.create(&author, &bad, None).await.unwrap_err();
        match err {
            PostServiceError::Validation(errors) => {
                assert!(errors.has("title"));
                assert_eq!(errors.get("category"), [INVALID_CHOICE.to_string()]);
                assert_eq!(errors.get("location"), [INVALID_CHOICE.to_string()]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let all = fx.service.all_posts(None).await.unwrap();
        assert_eq!(all.total, 0);
    }

    #[tokio::test]
    async fn test_image_upload_replace_clear_and_delete() {
        let fx = setup().await;
        let author = test_fixtures::user(&fx.pool, "leo").await;
        let news = test_fixtures::category(&fx.pool, "news", true).await;
        let location = SqlxLocationRepository::new(fx.pool.clone())
            .create(&LocationInput {
                name: "Tula".into(),
                is_published: true,
            })
            .await
            .unwrap();

        let mut with_location = form("Pic", Utc::now(), news);
        with_location.location = location.id.to_string();
        let post = fx
            .service
            .create(&author, &with_location, Some(png()))
            .await
            .unwrap();
        let first = post.image.clone().expect("image stored");
        assert_eq!(post.location_id, Some(location.id));
        assert!(fx.media_dir.path().join(&first).exists());

        let replaced = fx
            .service
            .update(&post, &PostForm::from_post(&post), Some(png()))
            .await
            .unwrap();
        let second = replaced.image.clone().expect("new image stored");
        assert_ne!(first, second);
        assert!(!fx.media_dir.path().join(&first).exists());

        let kept = fx
            .service
            .update(&replaced, &PostForm::from_post(&replaced), None)
            .await
            .unwrap();
        assert_eq!(kept.image.as_deref(), Some(second.as_str()));

        let mut clear = PostForm::from_post(&kept);
        clear.image_clear = true;
        let both = fx.service.update(&kept, &clear, Some(png())).await;
        assert!(matches!(both, Err(PostServiceError::Validation(_))));

        let cleared = fx.service.update(&kept, &clear, None).await.unwrap();
        assert_eq!(cleared.image, None);
        assert!(!fx.media_dir.path().join(&second).exists());

        fx.service.delete(&cleared).await.unwrap();
        assert!(matches!(
            fx.service.get_post(cleared.id).await,
            Err(PostServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_comments() {
        let fx = setup().await;
        let author = test_fixtures::user(&fx.pool, "leo").await;
        let news = test_fixtures::category(&fx.pool, "news", true).await;
        let post = fx
            .service
            .create(&author, &form("Hello", Utc::now(), news), None)
            .await
            .unwrap();

        let comments = SqlxCommentRepository::new(fx.pool.clone());
        let comment = comments.create(author.id, post.id, "first").await.unwrap();

        fx.service.delete(&post).await.unwrap();
        assert!(comments.get_by_id(comment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_published_hides_post() {
        let fx = setup().await;
        let author = test_fixtures::user(&fx.pool, "leo").await;
        let news = test_fixtures::category(&fx.pool, "news", true).await;
        let post = fx
            .service
            .create(&author, &form("Hello", Utc::now() - Duration::minutes(5), news), None)
            .await
            .unwrap();

        fx.service.set_published(post.id, false).await.unwrap();
        assert_eq!(fx.service.published_posts(None).await.unwrap().total, 0);
        assert!(matches!(
            fx.service.set_published(9999, true).await,
            Err(PostServiceError::NotFound(_))
        ));
    }
}
