use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core building blocks.
pub mod config;
pub mod error;
pub mod models;
pub mod password;
pub mod repository;
pub mod token;

// Authentication, authorization and the like toggle.
pub mod auth;
pub mod likes;
pub mod policy;

// Application services over the repository.
pub mod accounts;
pub mod blog;

// HTTP surface.
pub mod handlers;
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use accounts::AccountService;
pub use blog::BlogService;
pub use config::{AppConfig, Env};
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryState};
pub use token::TokenService;

/// ApiDoc
///
/// Generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::signup, handlers::login, handlers::refresh,
        handlers::get_profile, handlers::update_profile,
        handlers::create_post, handlers::list_posts, handlers::update_post,
        handlers::delete_post, handlers::like_post,
        handlers::add_comment, handlers::list_comments, handlers::update_comment,
        handlers::delete_comment, handlers::like_comment
    ),
    components(
        schemas(
            models::AccountId, models::PostId, models::CommentId,
            models::AccountProfile, models::AuthorSummary, models::Post, models::Comment,
            models::SignupRequest, models::LoginRequest, models::RefreshRequest,
            models::UpdateProfileRequest, models::CreatePostRequest, models::UpdatePostRequest,
            models::CommentRequest, models::TokenPair, models::AccessTokenResponse,
            models::MessageResponse, models::ProfileUpdatedResponse, models::LikesResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "blog-backend", description = "Blog accounts, posts and comments API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler. Everything in it is
/// cheap to clone and immutable after startup; the only mutable state lives
/// behind the repository.
#[derive(Clone)]
pub struct AppState {
    /// Signup, login and profile operations.
    pub accounts: AccountService,
    /// Posts, comments and likes.
    pub blog: BlogService,
    /// Token issuing and verification with the two signing secrets.
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the services over one repository and the configured token settings.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            accounts: AccountService::new(repo.clone()),
            blog: BlogService::new(repo),
            tokens: TokenService::new(&config.tokens),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// Any origin when none are configured, otherwise exactly the configured ones.
/// Origins that are not valid header values are skipped with a warning.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// create_router
///
/// Assembles the routing table, applies scoped and global middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Authenticated Routes: the principal is resolved once here and handed
        // to the handler through the request extensions.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::authenticate,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, tagged with the `x-request-id` so all log lines of
/// one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // Only the path: query strings never carry credentials here, but headers
    // (the bearer token) are deliberately left out.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
