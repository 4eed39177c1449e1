use chrono::Utc;

use crate::{
    error::AppError,
    models::{Account, AccountId, Credentials, NewAccount, ProfileUpdate, TokenPair},
    password::{self, PasswordDigest},
    repository::RepositoryState,
    token::TokenService,
};

/// Argon2 is deliberately slow; keep it off the async worker threads.
async fn hash_blocking(plain: String) -> Result<PasswordDigest, AppError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

async fn verify_blocking(plain: String, digest: PasswordDigest) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &digest))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

/// AccountService
///
/// The only component that sees password digests. Creates accounts, checks
/// credentials at login and applies profile updates. Everything it hands back
/// to the HTTP layer is either an [`Account`] (not serializable) or a token pair.
#[derive(Clone)]
pub struct AccountService {
    repo: RepositoryState,
}

impl AccountService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// signup
    ///
    /// Rejects an email that is already registered, otherwise hashes the password
    /// and stores the account. The store's uniqueness guarantee catches the
    /// case where two signups for the same email race past the lookup.
    pub async fn signup(&self, new: NewAccount) -> Result<Account, AppError> {
        if self.repo.find_account_by_email(&new.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            name: new.name,
            email: new.email,
            password: hash_blocking(new.password).await?,
            avatar: None,
            created_at: now,
            updated_at: now,
        };

        let account = self.repo.insert_account(account).await?;
        tracing::info!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// login
    ///
    /// An unknown email is `NotFound`; a known email with the wrong password is
    /// `InvalidCredentials`. On success both tokens are issued for the account.
    pub async fn login(&self, credentials: Credentials, tokens: &TokenService) -> Result<TokenPair, AppError> {
        let account = self
            .repo
            .find_account_by_email(&credentials.email)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if !verify_blocking(credentials.password, account.password.clone()).await? {
            tracing::debug!(account_id = %account.id, "login rejected");
            return Err(AppError::InvalidCredentials);
        }

        Ok(TokenPair {
            access_token: tokens.issue_access(account.id)?,
            refresh_token: tokens.issue_refresh(account.id)?,
        })
    }

    /// refresh
    ///
    /// A new access token for the subject of `refresh_token`, provided the
    /// account still exists.
    pub async fn refresh(&self, refresh_token: &str, tokens: &TokenService) -> Result<String, AppError> {
        tokens.refresh_access(refresh_token, self.repo.as_ref()).await
    }

    pub async fn find_by_id(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .find_account_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Account, AppError> {
        self.repo
            .find_account_by_email(email)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// update_profile
    ///
    /// Applies only the supplied fields. A new password is hashed before it is
    /// stored; an omitted one leaves the existing digest untouched. Moving to an
    /// email owned by another account is a `Conflict`.
    pub async fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> Result<Account, AppError> {
        let mut account = self.find_by_id(id).await?;

        if let Some(email) = update.email {
            if email != account.email && self.repo.find_account_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict("Email already in use".to_string()));
            }
            account.email = email;
        }
        if let Some(name) = update.name {
            account.name = name;
        }
        if let Some(avatar) = update.avatar {
            account.avatar = Some(avatar);
        }
        if let Some(plain) = update.password {
            account.password = hash_blocking(plain).await?;
        }
        account.updated_at = Utc::now();

        self.repo
            .update_account(account)
            .await?
            .ok_or(AppError::NotFound("User"))
    }
}
