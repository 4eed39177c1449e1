use crate::{
    likes::toggle_like,
    models::{Account, AccountId, AuthorSummary, Comment, CommentId, Post, PostId, PostUpdate},
    password::PasswordDigest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique key (account email) is already taken.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    /// The record points at an account or post that does not exist.
    #[error("missing {0}")]
    MissingReference(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Repository Trait
///
/// The persistence seam. Handlers and services only see this trait, so the
/// Postgres store and the in-memory store are interchangeable.
///
/// Requirements every implementation must meet:
/// - `insert_account` / `update_account` enforce email uniqueness atomically
///   (a check-then-insert in the caller is not enough on its own).
/// - `toggle_*_like` flip membership in a single atomic step; two concurrent
///   toggles must never lose an update.
/// - A write is visible to the next read of the same record.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    /// Fails with `Duplicate` if the email is already registered.
    async fn insert_account(&self, account: Account) -> Result<Account, RepositoryError>;
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;
    /// Exact, case-sensitive match.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;
    /// Replaces the mutable fields (name, email, password, avatar). `None` if the account is gone.
    async fn update_account(&self, account: Account) -> Result<Option<Account>, RepositoryError>;

    // --- Posts ---
    /// Fails with `MissingReference("User")` if the owner has no account.
    async fn insert_post(&self, post: Post) -> Result<Post, RepositoryError>;
    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepositoryError>;
    /// Newest first, with the author summary attached.
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError>;
    /// Writes only the supplied fields. Never touches `owner` or `likes`.
    async fn update_post(&self, id: PostId, update: PostUpdate) -> Result<Option<Post>, RepositoryError>;
    /// Also removes the post's comments.
    async fn delete_post(&self, id: PostId) -> Result<bool, RepositoryError>;
    /// Returns the like count after the flip, `None` if the post does not exist.
    async fn toggle_post_like(&self, id: PostId, account: AccountId) -> Result<Option<usize>, RepositoryError>;

    // --- Comments ---
    /// Fails with `MissingReference` if the parent post or the author is gone.
    async fn insert_comment(&self, comment: Comment) -> Result<Comment, RepositoryError>;
    async fn find_comment(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError>;
    /// Oldest first, with the author name attached.
    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, RepositoryError>;
    async fn update_comment(&self, id: CommentId, content: String) -> Result<Option<Comment>, RepositoryError>;
    async fn delete_comment(&self, id: CommentId) -> Result<bool, RepositoryError>;
    async fn toggle_comment_like(&self, id: CommentId, account: AccountId) -> Result<Option<usize>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- PostgreSQL ---

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Schema lives in `migrations/`.
/// Likes are a `uuid[]` column toggled by a single `UPDATE`, which Postgres
/// serializes per row.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: AccountId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password: PasswordDigest::from_stored(row.password_hash),
            avatar: row.avatar,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PostRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    content: String,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[sqlx(default)]
    author_name: Option<String>,
    #[sqlx(default)]
    author_email: Option<String>,
    #[sqlx(default)]
    author_avatar: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let owner = AccountId::from_uuid(row.owner_id);
        Post {
            id: PostId::from_uuid(row.id),
            owner,
            title: row.title,
            content: row.content,
            likes: row.likes.into_iter().map(AccountId::from_uuid).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: row.author_name.map(|name| AuthorSummary {
                id: owner,
                name,
                email: row.author_email,
                avatar: row.author_avatar,
            }),
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    owner_id: Uuid,
    content: String,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[sqlx(default)]
    author_name: Option<String>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let owner = AccountId::from_uuid(row.owner_id);
        Comment {
            id: CommentId::from_uuid(row.id),
            post: PostId::from_uuid(row.post_id),
            owner,
            content: row.content,
            likes: row.likes.into_iter().map(AccountId::from_uuid).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: row.author_name.map(|name| AuthorSummary {
                id: owner,
                name,
                email: None,
                avatar: None,
            }),
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, avatar, created_at, updated_at";
const POST_COLUMNS: &str = "id, owner_id, title, content, likes, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, owner_id, content, likes, created_at, updated_at";

/// Maps a unique-constraint violation to `Duplicate`, anything else to `Database`.
fn unique_violation(err: sqlx::Error, what: &'static str) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Duplicate(what);
        }
    }
    tracing::error!("database error: {:?}", err);
    RepositoryError::Database(err)
}

fn logged(err: sqlx::Error) -> RepositoryError {
    tracing::error!("database error: {:?}", err);
    RepositoryError::Database(err)
}

/// Maps a foreign-key violation to `MissingReference`, naming the side that is gone.
fn missing_reference(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            let what = match db.constraint() {
                Some("comments_post_id_fkey") => "Post",
                _ => "User",
            };
            return RepositoryError::MissingReference(what);
        }
    }
    logged(err)
}

fn like_count(cardinality: Option<i32>) -> Result<Option<usize>, RepositoryError> {
    cardinality
        .map(|n| usize::try_from(n).map_err(|e| RepositoryError::Corrupt(e.to_string())))
        .transpose()
}

#[async_trait]
impl Repository for PostgresRepository {
    /// insert_account
    ///
    /// Relies on the `UNIQUE (email)` constraint: of two concurrent signups with
    /// the same email, exactly one succeeds.
    async fn insert_account(&self, account: Account) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id.as_uuid())
            .bind(&account.name)
            .bind(&account.email)
            .bind(account.password.as_str())
            .bind(&account.avatar)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .await
            .map(Account::from)
            .map_err(|e| unique_violation(e, "User"))
    }

    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)?;
        Ok(row.map(Account::from))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)?;
        Ok(row.map(Account::from))
    }

    async fn update_account(&self, account: Account) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET name = $2, email = $3, password_hash = $4, avatar = $5, updated_at = $6
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id.as_uuid())
            .bind(&account.name)
            .bind(&account.email)
            .bind(account.password.as_str())
            .bind(&account.avatar)
            .bind(account.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unique_violation(e, "User"))?;
        Ok(row.map(Account::from))
    }

    async fn insert_post(&self, post: Post) -> Result<Post, RepositoryError> {
        let sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {POST_COLUMNS}"
        );
        let likes: Vec<Uuid> = post.likes.iter().map(AccountId::as_uuid).collect();
        sqlx::query_as::<_, PostRow>(&sql)
            .bind(post.id.as_uuid())
            .bind(post.owner.as_uuid())
            .bind(&post.title)
            .bind(&post.content)
            .bind(likes)
            .bind(post.created_at)
            .bind(post.updated_at)
            .fetch_one(&self.pool)
            .await
            .map(Post::from)
            .map_err(missing_reference)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepositoryError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)?;
        Ok(row.map(Post::from))
    }

    /// list_posts
    ///
    /// Joins `accounts` for the author summary. LEFT JOIN so a post whose author
    /// row is missing is still listed, just without an author.
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT
                p.id, p.owner_id, p.title, p.content, p.likes, p.created_at, p.updated_at,
                a.name AS author_name, a.email AS author_email, a.avatar AS author_avatar
            FROM posts p
            LEFT JOIN accounts a ON a.id = p.owner_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(logged)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// update_post
    ///
    /// COALESCE keeps the stored value for every field that was not supplied.
    async fn update_post(&self, id: PostId, update: PostUpdate) -> Result<Option<Post>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id.as_uuid())
            .bind(update.title)
            .bind(update.content)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)?;
        Ok(row.map(Post::from))
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, RepositoryError> {
        // Comments go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(logged)?;
        Ok(result.rows_affected() > 0)
    }

    /// toggle_post_like
    ///
    /// Membership test and flip happen in one statement under the row lock, so
    /// concurrent toggles on the same post serialize instead of racing.
    async fn toggle_post_like(&self, id: PostId, account: AccountId) -> Result<Option<usize>, RepositoryError> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE posts
            SET likes = CASE
                WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                ELSE array_append(likes, $2)
            END
            WHERE id = $1
            RETURNING cardinality(likes)
            "#,
        )
        .bind(id.as_uuid())
        .bind(account.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(logged)?;
        like_count(count)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        let sql = format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COMMENT_COLUMNS}"
        );
        let likes: Vec<Uuid> = comment.likes.iter().map(AccountId::as_uuid).collect();
        sqlx::query_as::<_, CommentRow>(&sql)
            .bind(comment.id.as_uuid())
            .bind(comment.post.as_uuid())
            .bind(comment.owner.as_uuid())
            .bind(&comment.content)
            .bind(likes)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map(Comment::from)
            .map_err(missing_reference)
    }

    async fn find_comment(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)?;
        Ok(row.map(Comment::from))
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT
                c.id, c.post_id, c.owner_id, c.content, c.likes, c.created_at, c.updated_at,
                a.name AS author_name
            FROM comments c
            LEFT JOIN accounts a ON a.id = c.owner_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(logged)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn update_comment(&self, id: CommentId, content: String) -> Result<Option<Comment>, RepositoryError> {
        let sql = format!(
            "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id.as_uuid())
            .bind(content)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)?;
        Ok(row.map(Comment::from))
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(logged)?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_comment_like(&self, id: CommentId, account: AccountId) -> Result<Option<usize>, RepositoryError> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE comments
            SET likes = CASE
                WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                ELSE array_append(likes, $2)
            END
            WHERE id = $1
            RETURNING cardinality(likes)
            "#,
        )
        .bind(id.as_uuid())
        .bind(account.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(logged)?;
        like_count(count)
    }
}

// --- In-Memory ---

#[derive(Default)]
struct Store {
    accounts: HashMap<AccountId, Account>,
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
}

impl Store {
    fn email_taken(&self, email: &str, except: Option<AccountId>) -> bool {
        self.accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != except)
    }

    fn author(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }
}

/// InMemoryRepository
///
/// `Repository` over a single `RwLock`. Used for local runs without
/// `DATABASE_URL` and throughout the tests. Each check-and-write (email
/// uniqueness, like toggles) happens while holding the write lock.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_account(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut store = self.store.write().await;
        if store.email_taken(&account.email, None) {
            return Err(RepositoryError::Duplicate("User"));
        }
        store.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.store.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn update_account(&self, account: Account) -> Result<Option<Account>, RepositoryError> {
        let mut store = self.store.write().await;
        if store.email_taken(&account.email, Some(account.id)) {
            return Err(RepositoryError::Duplicate("User"));
        }
        let Some(stored) = store.accounts.get_mut(&account.id) else {
            return Ok(None);
        };
        stored.name = account.name;
        stored.email = account.email;
        stored.password = account.password;
        stored.avatar = account.avatar;
        stored.updated_at = account.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn insert_post(&self, post: Post) -> Result<Post, RepositoryError> {
        let mut store = self.store.write().await;
        if !store.accounts.contains_key(&post.owner) {
            return Err(RepositoryError::MissingReference("User"));
        }
        store.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, RepositoryError> {
        Ok(self.store.read().await.posts.get(&id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        let store = self.store.read().await;
        let mut posts: Vec<Post> = store
            .posts
            .values()
            .map(|post| {
                let mut post = post.clone();
                post.author = store.author(post.owner).map(|a| AuthorSummary {
                    id: a.id,
                    name: a.name.clone(),
                    email: Some(a.email.clone()),
                    avatar: a.avatar.clone(),
                });
                post
            })
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn update_post(&self, id: PostId, update: PostUpdate) -> Result<Option<Post>, RepositoryError> {
        let mut store = self.store.write().await;
        let Some(post) = store.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(content) = update.content {
            post.content = content;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, RepositoryError> {
        let mut store = self.store.write().await;
        let removed = store.posts.remove(&id).is_some();
        if removed {
            store.comments.retain(|_, c| c.post != id);
        }
        Ok(removed)
    }

    async fn toggle_post_like(&self, id: PostId, account: AccountId) -> Result<Option<usize>, RepositoryError> {
        let mut store = self.store.write().await;
        Ok(store.posts.get_mut(&id).map(|post| toggle_like(post, account)))
    }

    async fn insert_comment(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        let mut store = self.store.write().await;
        if !store.posts.contains_key(&comment.post) {
            return Err(RepositoryError::MissingReference("Post"));
        }
        if !store.accounts.contains_key(&comment.owner) {
            return Err(RepositoryError::MissingReference("User"));
        }
        store.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        Ok(self.store.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, RepositoryError> {
        let store = self.store.read().await;
        let mut comments: Vec<Comment> = store
            .comments
            .values()
            .filter(|c| c.post == post)
            .map(|c| {
                let mut comment = c.clone();
                comment.author = store.author(c.owner).map(|a| AuthorSummary {
                    id: a.id,
                    name: a.name.clone(),
                    email: None,
                    avatar: None,
                });
                comment
            })
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn update_comment(&self, id: CommentId, content: String) -> Result<Option<Comment>, RepositoryError> {
        let mut store = self.store.write().await;
        let Some(comment) = store.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.content = content;
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, RepositoryError> {
        Ok(self.store.write().await.comments.remove(&id).is_some())
    }

    async fn toggle_comment_like(&self, id: CommentId, account: AccountId) -> Result<Option<usize>, RepositoryError> {
        let mut store = self.store.write().await;
        Ok(store.comments.get_mut(&id).map(|comment| toggle_like(comment, account)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;

    fn account(email: &str) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(),
            name: "Ann".into(),
            email: email.into(),
            password: PasswordDigest::from_stored("$argon2id$stub".into()),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn post(owner: AccountId) -> Post {
        Post::new(
            owner,
            NewPost {
                title: "t".into(),
                content: "c".into(),
            },
        )
    }

    #[tokio::test]
    async fn email_is_unique_and_case_sensitive() {
        let repo = InMemoryRepository::new();
        repo.insert_account(account("a@x.com")).await.unwrap();

        assert!(matches!(
            repo.insert_account(account("a@x.com")).await,
            Err(RepositoryError::Duplicate("User"))
        ));
        assert!(repo.insert_account(account("A@x.com")).await.is_ok());
        assert!(repo.find_account_by_email("A@X.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_account_rejects_taken_email() {
        let repo = InMemoryRepository::new();
        repo.insert_account(account("a@x.com")).await.unwrap();
        let mut bob = repo.insert_account(account("b@x.com")).await.unwrap();

        bob.email = "a@x.com".into();
        assert!(matches!(
            repo.update_account(bob).await,
            Err(RepositoryError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_toggles_do_not_lose_updates() {
        let repo = Arc::new(InMemoryRepository::new());
        let owner = repo.insert_account(account("a@x.com")).await.unwrap();
        let post_id = repo.insert_post(post(owner.id)).await.unwrap().id;

        let likers: Vec<AccountId> = (0..32).map(|_| AccountId::new()).collect();
        let handles: Vec<_> = likers
            .iter()
            .map(|&liker| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.toggle_post_like(post_id, liker).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.find_post(post_id).await.unwrap().unwrap();
        assert_eq!(stored.likes.len(), likers.len());
    }

    #[tokio::test]
    async fn toggle_on_missing_resource_is_none() {
        let repo = InMemoryRepository::new();

        assert_eq!(repo.toggle_post_like(PostId::new(), AccountId::new()).await.unwrap(), None);
        assert_eq!(
            repo.toggle_comment_like(CommentId::new(), AccountId::new()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let repo = InMemoryRepository::new();
        let owner = repo.insert_account(account("a@x.com")).await.unwrap().id;
        let post = repo.insert_post(post(owner)).await.unwrap();
        let comment = repo
            .insert_comment(Comment::new(post.id, owner, "hi".into()))
            .await
            .unwrap();

        assert!(repo.delete_post(post.id).await.unwrap());
        assert!(repo.find_comment(comment.id).await.unwrap().is_none());
        assert!(!repo.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn inserts_reject_missing_references() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.insert_post(post(AccountId::new())).await,
            Err(RepositoryError::MissingReference("User"))
        ));

        let ann = repo.insert_account(account("a@x.com")).await.unwrap();
        assert!(matches!(
            repo.insert_comment(Comment::new(PostId::new(), ann.id, "hi".into())).await,
            Err(RepositoryError::MissingReference("Post"))
        ));

        let post = repo.insert_post(post(ann.id)).await.unwrap();
        assert!(matches!(
            repo.insert_comment(Comment::new(post.id, AccountId::new(), "hi".into())).await,
            Err(RepositoryError::MissingReference("User"))
        ));
        assert!(repo.list_comments(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listings_attach_authors_and_order() {
        let repo = InMemoryRepository::new();
        let ann = repo.insert_account(account("a@x.com")).await.unwrap();

        let mut older = post(ann.id);
        older.created_at -= chrono::Duration::minutes(5);
        let older = repo.insert_post(older).await.unwrap();
        let newer = repo.insert_post(post(ann.id)).await.unwrap();

        let posts = repo.list_posts().await.unwrap();
        assert_eq!(posts[0].id, newer.id);
        assert_eq!(posts[1].id, older.id);
        assert_eq!(posts[0].author.as_ref().unwrap().name, "Ann");

        repo.insert_comment(Comment::new(newer.id, ann.id, "first".into()))
            .await
            .unwrap();
        let comments = repo.list_comments(newer.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author.as_ref().unwrap().name, "Ann");
        assert!(repo.list_comments(older.id).await.unwrap().is_empty());
    }
}
