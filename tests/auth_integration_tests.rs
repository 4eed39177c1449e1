use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use blog_backend::{
    AccountService, AppConfig, AppError, AppState, BlogService, InMemoryRepository, RepositoryState,
    TokenService,
    auth::AuthUser,
    models::AccountId,
    token::MockClock,
};
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;

// --- Helper Functions ---

fn create_app_state(clock: Arc<MockClock>) -> AppState {
    let config = AppConfig::default();
    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    AppState {
        accounts: AccountService::new(repo.clone()),
        blog: BlogService::new(repo),
        tokens: TokenService::with_clock(&config.tokens, clock),
        config,
    }
}

fn start_clock() -> Arc<MockClock> {
    Arc::new(MockClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()))
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn parts_with_authorization(value: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(value).unwrap(),
    );
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_access_token() {
    let app_state = create_app_state(start_clock());
    let id = AccountId::new();
    let token = app_state.tokens.issue_access(id).unwrap();

    let mut parts = parts_with_authorization(&format!("Bearer {}", token));
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap().id, id);
}

#[tokio::test]
async fn test_missing_header_is_forbidden_not_unauthorized() {
    let app_state = create_app_state(start_clock());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let err = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthenticated));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_header_is_unauthenticated() {
    let app_state = create_app_state(start_clock());
    let token = app_state.tokens.issue_access(AccountId::new()).unwrap();

    for value in [token.clone(), format!("Basic {}", token), "Bearer ".to_string()] {
        let mut parts = parts_with_authorization(&value);
        let result = AuthUser::from_request_parts(&mut parts, &app_state).await;
        assert!(
            matches!(result, Err(AppError::Unauthenticated)),
            "header {value:?} should count as no credential"
        );
    }
}

#[tokio::test]
async fn test_expired_token_is_reported_distinctly() {
    let clock = start_clock();
    let app_state = create_app_state(clock.clone());
    let token = app_state.tokens.issue_access(AccountId::new()).unwrap();

    clock.advance(Duration::hours(1) + Duration::seconds(1));

    let mut parts = parts_with_authorization(&format!("Bearer {}", token));
    let err = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ExpiredToken));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app_state = create_app_state(start_clock());
    let refresh = app_state.tokens.issue_refresh(AccountId::new()).unwrap();

    let mut parts = parts_with_authorization(&format!("Bearer {}", refresh));
    let err = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn test_token_signed_with_foreign_secret_is_invalid() {
    let app_state = create_app_state(start_clock());

    #[derive(serde::Serialize)]
    struct ForgedClaims {
        sub: AccountId,
        kind: &'static str,
        iat: i64,
        exp: i64,
    }
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap().timestamp();
    let forged = encode(
        &Header::default(),
        &ForgedClaims {
            sub: AccountId::new(),
            kind: "access",
            iat: now,
            exp: now + 3600,
        },
        &EncodingKey::from_secret(b"not-the-access-secret"),
    )
    .unwrap();

    let mut parts = parts_with_authorization(&format!("Bearer {}", forged));
    let err = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn test_principal_in_extensions_is_reused() {
    let app_state = create_app_state(start_clock());
    let id = AccountId::new();

    // No header at all: the middleware has already resolved the principal.
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.extensions.insert(AuthUser { id });

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(auth_user.unwrap().id, id);
}
