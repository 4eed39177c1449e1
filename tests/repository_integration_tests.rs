use blog_backend::{
    AppError, BlogService,
    models::{Account, AccountId, Comment, NewPost, Post, PostId, PostUpdate},
    password::hash_password,
    repository::{PostgresRepository, Repository, RepositoryError},
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

// --- Test Context and Setup ---

/// Holds the pool of a real Postgres database. These tests only run when
/// `DATABASE_URL` points at one; otherwise they return early.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres repository test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn new_account(name: &str) -> Account {
    let now = Utc::now();
    Account {
        id: AccountId::new(),
        name: name.to_string(),
        // Unique per run so repeated runs against the same database don't collide.
        email: format!("{}-{}@test.com", name.to_lowercase(), AccountId::new()),
        password: hash_password("pw").unwrap(),
        avatar: None,
        created_at: now,
        updated_at: now,
    }
}

fn new_post(owner: AccountId) -> Post {
    Post::new(
        owner,
        NewPost {
            title: "Hello".into(),
            content: "World".into(),
        },
    )
}

// --- Tests ---

#[tokio::test]
async fn test_account_roundtrip_and_unique_email() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let ann = repo.insert_account(new_account("Ann")).await.unwrap();
    let found = repo.find_account_by_email(&ann.email).await.unwrap().unwrap();
    assert_eq!(found.id, ann.id);
    assert_eq!(found.password, ann.password);

    let mut twin = new_account("Twin");
    twin.email = ann.email.clone();
    assert!(matches!(
        repo.insert_account(twin).await,
        Err(RepositoryError::Duplicate("User"))
    ));

    assert!(repo
        .find_account_by_email(&ann.email.to_uppercase())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_post_update_keeps_unsupplied_fields() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let ann = repo.insert_account(new_account("Ann")).await.unwrap();
    let post = repo.insert_post(new_post(ann.id)).await.unwrap();

    let updated = repo
        .update_post(
            post.id,
            PostUpdate {
                title: Some("Renamed".into()),
                content: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.content, "World");
    assert_eq!(updated.owner, ann.id);
}

#[tokio::test]
async fn test_concurrent_likes_are_not_lost() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = Arc::new(ctx.repository());

    let ann = repo.insert_account(new_account("Ann")).await.unwrap();
    let post_id = repo.insert_post(new_post(ann.id)).await.unwrap().id;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.toggle_post_like(post_id, AccountId::new()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = repo.find_post(post_id).await.unwrap().unwrap();
    assert_eq!(stored.likes.len(), 16);

    // Toggling the same account twice is a no-op overall.
    assert_eq!(repo.toggle_post_like(post_id, ann.id).await.unwrap(), Some(17));
    assert_eq!(repo.toggle_post_like(post_id, ann.id).await.unwrap(), Some(16));
}

#[tokio::test]
async fn test_deleting_post_cascades_to_comments() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    let ann = repo.insert_account(new_account("Ann")).await.unwrap();
    let post = repo.insert_post(new_post(ann.id)).await.unwrap();
    let comment = repo
        .insert_comment(Comment::new(post.id, ann.id, "hi".into()))
        .await
        .unwrap();

    let listed = repo.list_comments(post.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].author.as_ref().unwrap().name, "Ann");

    assert!(repo.delete_post(post.id).await.unwrap());
    assert!(repo.find_comment(comment.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_dangling_references_are_reported_not_failed() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();

    assert!(matches!(
        repo.insert_post(new_post(AccountId::new())).await,
        Err(RepositoryError::MissingReference("User"))
    ));

    let ann = repo.insert_account(new_account("Ann")).await.unwrap();
    assert!(matches!(
        repo.insert_comment(Comment::new(PostId::new(), ann.id, "hi".into())).await,
        Err(RepositoryError::MissingReference("Post"))
    ));

    let post = repo.insert_post(new_post(ann.id)).await.unwrap();
    assert!(matches!(
        repo.insert_comment(Comment::new(post.id, AccountId::new(), "hi".into())).await,
        Err(RepositoryError::MissingReference("User"))
    ));

    // Through the service, a token for an account with no row is a 404, not a 500.
    let blog = BlogService::new(Arc::new(ctx.repository()));
    let draft = NewPost {
        title: "Hello".into(),
        content: "World".into(),
    };
    assert!(matches!(
        blog.create_post(AccountId::new(), draft).await,
        Err(AppError::NotFound("User"))
    ));
}
