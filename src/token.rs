use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::{config::TokenSettings, error::AppError, models::AccountId, repository::Repository};

// --- Clock ---

/// Clock
///
/// Wall-clock source for issuing and expiring tokens. Injected so tests can
/// move time forward instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// MockClock
///
/// A settable clock for tests.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<DateTime<Utc>>,
}

impl MockClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Claims ---

/// Which signing domain a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims
///
/// Payload of both token kinds. Only `sub` is trusted downstream; the other
/// fields exist so the token service can check expiry and kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account the token was issued to.
    pub sub: AccountId,
    pub kind: TokenKind,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds). The token is rejected once `now > exp`.
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("token signing failed: {0}")]
    Signing(String),
}

// --- Token Service ---

struct SigningDomain {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningDomain {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

struct Inner {
    access: SigningDomain,
    refresh: SigningDomain,
    /// Lifetime of access tokens minted from a refresh token.
    refreshed_access_ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// TokenService
///
/// Issues and verifies the two token kinds. Each kind has its own HMAC secret
/// and lifetime, so a token of one kind never verifies as the other. Stateless:
/// nothing is stored server-side, and an issued token stays valid until it
/// expires (there is no rotation or revocation).
///
/// Cheap to clone; the keys are loaded once at startup and never change.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<Inner>,
}

impl TokenService {
    pub fn new(settings: &TokenSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                access: SigningDomain::new(&settings.access_secret, settings.access_ttl),
                refresh: SigningDomain::new(&settings.refresh_secret, settings.refresh_ttl),
                refreshed_access_ttl: settings.refreshed_access_ttl,
                clock,
            }),
        }
    }

    fn domain(&self, kind: TokenKind) -> &SigningDomain {
        match kind {
            TokenKind::Access => &self.inner.access,
            TokenKind::Refresh => &self.inner.refresh,
        }
    }

    fn issue(&self, account: AccountId, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        let now = self.inner.clock.now();
        let claims = Claims {
            sub: account,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.domain(kind).encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn issue_access(&self, account: AccountId) -> Result<String, TokenError> {
        self.issue(account, TokenKind::Access, self.inner.access.ttl)
    }

    pub fn issue_refresh(&self, account: AccountId) -> Result<String, TokenError> {
        self.issue(account, TokenKind::Refresh, self.inner.refresh.ttl)
    }

    /// verify
    ///
    /// Checks the signature against the secret of `kind`, then the expiry
    /// against the injected clock.
    ///
    /// Expiry is compared here rather than inside `jsonwebtoken` so that the
    /// clock is the single source of time and no leeway applies.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.domain(kind).decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error_kind = ?e.kind(), ?kind, "token rejected");
                TokenError::Invalid
            })?
            .claims;

        if claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        if self.inner.clock.now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// refresh_access
    ///
    /// Mints a new access token from a refresh token. The account must still
    /// exist. The refresh token itself is left untouched and remains usable
    /// until its own expiry.
    pub async fn refresh_access(
        &self,
        refresh_token: &str,
        repo: &dyn Repository,
    ) -> Result<String, AppError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;

        let account = repo
            .find_account_by_id(claims.sub)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        Ok(self.issue(account.id, TokenKind::Access, self.inner.refreshed_access_ttl)?)
    }
}
