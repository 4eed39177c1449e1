use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `authenticate` route layer applied in
/// `create_router`, so handlers always receive a resolved `AuthUser`. Ownership
/// checks happen in `BlogService`, after the target has been loaded.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Profile ---
        .route(
            "/api/auth/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        // --- Posts ---
        // POST /api/posts
        // The owner is always the caller; any owner field in the body is ignored.
        .route("/api/posts", post(handlers::create_post))
        // PUT/DELETE /api/posts/{id}
        // Owner only.
        .route(
            "/api/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // PUT /api/posts/{id}/like
        // Toggles the caller's like. No ownership check.
        .route("/api/posts/{id}/like", put(handlers::like_post))
        // --- Comments ---
        // POST takes the parent post id, PUT/DELETE the comment id.
        // DELETE is also open to the owner of the parent post.
        .route(
            "/api/comments/{id}",
            post(handlers::add_comment)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        .route("/api/comments/{id}/like", put(handlers::like_comment))
}
