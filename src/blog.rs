use crate::{
    error::AppError,
    models::{AccountId, Comment, CommentId, NewPost, Post, PostId, PostUpdate},
    policy::{ensure_can_delete_comment, ensure_owner},
    repository::RepositoryState,
};

/// BlogService
///
/// Post and comment operations. Every mutation loads the target first, so a
/// missing resource is reported as `NotFound` before ownership is considered,
/// then runs the matching policy check against the authenticated principal.
#[derive(Clone)]
pub struct BlogService {
    repo: RepositoryState,
}

impl BlogService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    async fn load_post(&self, id: PostId) -> Result<Post, AppError> {
        self.repo.find_post(id).await?.ok_or(AppError::NotFound("Post"))
    }

    async fn load_comment(&self, id: CommentId) -> Result<Comment, AppError> {
        self.repo
            .find_comment(id)
            .await?
            .ok_or(AppError::NotFound("Comment"))
    }

    // --- Posts ---

    /// The owner always comes from the principal, never from the request body.
    pub async fn create_post(&self, principal: AccountId, draft: NewPost) -> Result<Post, AppError> {
        let post = self.repo.insert_post(Post::new(principal, draft)).await?;
        tracing::info!(post_id = %post.id, owner = %principal, "post created");
        Ok(post)
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.repo.list_posts().await?)
    }

    pub async fn update_post(&self, principal: AccountId, id: PostId, update: PostUpdate) -> Result<Post, AppError> {
        let post = self.load_post(id).await?;
        ensure_owner(principal, &post)?;

        self.repo
            .update_post(id, update)
            .await?
            .ok_or(AppError::NotFound("Post"))
    }

    pub async fn delete_post(&self, principal: AccountId, id: PostId) -> Result<(), AppError> {
        let post = self.load_post(id).await?;
        ensure_owner(principal, &post)?;

        if !self.repo.delete_post(id).await? {
            return Err(AppError::NotFound("Post"));
        }
        tracing::info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// Any authenticated account may like any post, its own included.
    pub async fn toggle_post_like(&self, principal: AccountId, id: PostId) -> Result<usize, AppError> {
        self.repo
            .toggle_post_like(id, principal)
            .await?
            .ok_or(AppError::NotFound("Post"))
    }

    // --- Comments ---

    pub async fn add_comment(&self, principal: AccountId, post: PostId, content: String) -> Result<Comment, AppError> {
        self.load_post(post).await?;
        Ok(self
            .repo
            .insert_comment(Comment::new(post, principal, content))
            .await?)
    }

    pub async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, AppError> {
        Ok(self.repo.list_comments(post).await?)
    }

    pub async fn update_comment(
        &self,
        principal: AccountId,
        id: CommentId,
        content: String,
    ) -> Result<Comment, AppError> {
        let comment = self.load_comment(id).await?;
        ensure_owner(principal, &comment)?;

        self.repo
            .update_comment(id, content)
            .await?
            .ok_or(AppError::NotFound("Comment"))
    }

    /// delete_comment
    ///
    /// Allowed for the comment's author and for the owner of the post it belongs
    /// to. If the parent post is gone, only the author qualifies.
    pub async fn delete_comment(&self, principal: AccountId, id: CommentId) -> Result<(), AppError> {
        let comment = self.load_comment(id).await?;
        let parent = self.repo.find_post(comment.post).await?;
        ensure_can_delete_comment(principal, &comment, parent.as_ref())?;

        if !self.repo.delete_comment(id).await? {
            return Err(AppError::NotFound("Comment"));
        }
        Ok(())
    }

    pub async fn toggle_comment_like(&self, principal: AccountId, id: CommentId) -> Result<usize, AppError> {
        self.repo
            .toggle_comment_like(id, principal)
            .await?
            .ok_or(AppError::NotFound("Comment"))
    }
}
