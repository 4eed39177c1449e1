use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, ErrorResponse},
    models::{
        AccessTokenResponse, AccountProfile, Comment, CommentId, CommentRequest, CreatePostRequest,
        LikesResponse, LoginRequest, MessageResponse, Post, PostId, ProfileUpdatedResponse,
        RefreshRequest, SignupRequest, TokenPair, UpdatePostRequest, UpdateProfileRequest,
    },
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

// Bodies and path ids are taken as `Result<_, Rejection>` so that a malformed
// request becomes an `AppError` (400 with the JSON error body) before any
// business logic runs.

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type PathId<T> = Result<Path<T>, PathRejection>;

// --- Auth ---

/// signup
///
/// [Public Route] Registers a new account. All of `name`, `email` and `password`
/// are required; an email that is already registered is rejected.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Missing field or email taken", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    payload: JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(payload) = payload?;
    state.accounts.signup(payload.validate()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully!")),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "Unknown email", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: JsonBody<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let Json(payload) = payload?;
    let pair = state
        .accounts
        .login(payload.validate()?, &state.tokens)
        .await?;
    Ok(Json(pair))
}

/// refresh
///
/// [Public Route] Mints a new access token from a refresh token. The refresh
/// token is not rotated and stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Expired or invalid refresh token", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    payload: JsonBody<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let Json(payload) = payload?;
    let refresh_token = payload.validate()?;
    let access_token = state
        .accounts
        .refresh(&refresh_token, &state.tokens)
        .await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

/// get_profile
///
/// [Authenticated Route] The caller's own profile. The password digest is never part of it.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Profile", body = AccountProfile),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    )
)]
pub async fn get_profile(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AccountProfile>, AppError> {
    let account = state.accounts.find_by_id(id).await?;
    Ok(Json(account.profile()))
}

/// update_profile
///
/// [Authenticated Route] Partial update of the caller's profile. Only supplied,
/// non-empty fields change; a new password is re-hashed before storage.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileUpdatedResponse),
        (status = 400, description = "Email already in use", body = ErrorResponse)
    )
)]
pub async fn update_profile(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    payload: JsonBody<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdatedResponse>, AppError> {
    let Json(payload) = payload?;
    let account = state
        .accounts
        .update_profile(id, payload.validate()?)
        .await?;
    Ok(Json(ProfileUpdatedResponse {
        message: "Profile updated successfully".to_string(),
        user: account.profile(),
    }))
}

// --- Posts ---

/// create_post
///
/// [Authenticated Route] The new post is owned by the caller.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Missing title or content", body = ErrorResponse)
    )
)]
pub async fn create_post(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    payload: JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let Json(payload) = payload?;
    let post = state.blog.create_post(id, payload.validate()?).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// list_posts
///
/// [Public Route] Every post, newest first, with its author's summary.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.blog.list_posts().await?))
}

/// update_post
///
/// [Authenticated Route] Owner only. `title` and `content` are the only writable fields.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    params(("id" = uuid::Uuid, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn update_post(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    id: PathId<PostId>,
    payload: JsonBody<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let post = state
        .blog
        .update_post(principal, id, payload.validate()?)
        .await?;
    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Owner only. The post's comments are removed with it.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = uuid::Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    id: PathId<PostId>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    state.blog.delete_post(principal, id).await?;
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// like_post
///
/// [Authenticated Route] Likes the post, or unlikes it if the caller already does.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/like",
    params(("id" = uuid::Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Like count after the toggle", body = LikesResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn like_post(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    id: PathId<PostId>,
) -> Result<Json<LikesResponse>, AppError> {
    let Path(id) = id?;
    let likes = state.blog.toggle_post_like(principal, id).await?;
    Ok(Json(LikesResponse { likes }))
}

// --- Comments ---
//
// POST and GET address comments by their parent post, PUT and DELETE by the
// comment itself. The routes share one `{id}` segment.

/// add_comment
///
/// [Authenticated Route] Comments on the post `{id}`.
#[utoipa::path(
    post,
    path = "/api/comments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Post id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn add_comment(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    post: PathId<PostId>,
    payload: JsonBody<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let Path(post) = post?;
    let Json(payload) = payload?;
    let comment = state
        .blog
        .add_comment(principal, post, payload.validate()?)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// list_comments
///
/// [Public Route] Comments on the post `{id}`, oldest first.
#[utoipa::path(
    get,
    path = "/api/comments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    post: PathId<PostId>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let Path(post) = post?;
    Ok(Json(state.blog.list_comments(post).await?))
}

/// update_comment
///
/// [Authenticated Route] Comment author only.
#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Comment id")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = Comment),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    )
)]
pub async fn update_comment(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    id: PathId<CommentId>,
    payload: JsonBody<CommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let comment = state
        .blog
        .update_comment(principal, id, payload.validate()?)
        .await?;
    Ok(Json(comment))
}

/// delete_comment
///
/// [Authenticated Route] The comment's author or the owner of the post it is on.
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = uuid::Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Neither author nor post owner", body = ErrorResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    )
)]
pub async fn delete_comment(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    id: PathId<CommentId>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    state.blog.delete_comment(principal, id).await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}

/// like_comment
#[utoipa::path(
    put,
    path = "/api/comments/{id}/like",
    params(("id" = uuid::Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Like count after the toggle", body = LikesResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    )
)]
pub async fn like_comment(
    AuthUser { id: principal }: AuthUser,
    State(state): State<AppState>,
    id: PathId<CommentId>,
) -> Result<Json<LikesResponse>, AppError> {
    let Path(id) = id?;
    let likes = state.blog.toggle_comment_like(principal, id).await?;
    Ok(Json(LikesResponse { likes }))
}
