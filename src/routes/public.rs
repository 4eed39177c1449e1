use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no credential: the account entry points (signup, login,
/// refresh) and the read-only post and comment listings.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
        // --- Account entry points ---
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/refresh
        // Trades a refresh token for a new access token.
        .route("/api/auth/refresh", post(handlers::refresh))
        // --- Read-only listings ---
        .route("/api/posts", get(handlers::list_posts))
        // GET /api/comments/{id}
        // `{id}` is the parent post here.
        .route("/api/comments/{id}", get(handlers::list_comments))
}
