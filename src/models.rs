use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, password::PasswordDigest};

// --- Identifiers ---

/// Declares an opaque UUID-backed identifier.
///
/// Ownership checks compare these by value; two ids are equal only if they wrap
/// the same UUID, regardless of how either was written on the wire.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, TS, ToSchema,
        )]
        #[serde(transparent)]
        #[ts(export)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Primary key of an [`Account`]; also the `sub` of every token.
    AccountId
);
id_type!(PostId);
id_type!(CommentId);

// --- Core Records ---

/// Account
///
/// The identity record. `email` is the unique, case-sensitive lookup key.
/// The password digest never leaves the account manager: this type is not
/// `Serialize`, and everything sent to clients goes through [`AccountProfile`].
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub password: PasswordDigest,
    /// Reference to an already stored avatar (e.g. `/uploads/avatars/123.png`).
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            created_at: self.created_at,
        }
    }
}

/// AccountProfile
///
/// Public view of an account (GET/PUT /api/auth/profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccountProfile {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AuthorSummary
///
/// Author fields joined onto posts and comments in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: AccountId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Post
///
/// `owner` is set from the authenticated principal when the post is created and
/// is never written again. It is exposed as `user` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Post {
    pub id: PostId,
    #[serde(rename = "user")]
    pub owner: AccountId,
    pub title: String,
    pub content: String,
    /// Accounts that currently like the post. Set semantics, order irrelevant.
    pub likes: Vec<AccountId>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    /// Filled in by listings only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
}

impl Post {
    pub fn new(owner: AccountId, draft: NewPost) -> Self {
        let now = Utc::now();
        Self {
            id: PostId::new(),
            owner,
            title: draft.title,
            content: draft.content,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
            author: None,
        }
    }
}

/// Comment
///
/// Like [`Post`], plus the parent post reference. Both `owner` and `post` are
/// fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    #[serde(rename = "user")]
    pub owner: AccountId,
    pub content: String,
    pub likes: Vec<AccountId>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
}

impl Comment {
    pub fn new(post: PostId, owner: AccountId, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: CommentId::new(),
            post,
            owner,
            content,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
            author: None,
        }
    }
}

// --- Request Payloads (Input Schemas) ---
//
// Every field is optional at the serde level so that a missing field is a
// `ValidationError` (400) produced by `validate()`, not a deserializer rejection.

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(message))
}

fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// SignupRequest (POST /api/auth/signup)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A signup that passed validation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<NewAccount, AppError> {
        const MSG: &str = "All fields are required";
        Ok(NewAccount {
            name: required(self.name, MSG)?,
            email: required(self.email, MSG)?,
            password: required(self.password, MSG)?,
        })
    }
}

/// LoginRequest (POST /api/auth/login)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, AppError> {
        const MSG: &str = "All fields are required";
        Ok(Credentials {
            email: required(self.email, MSG)?,
            password: required(self.password, MSG)?,
        })
    }
}

/// RefreshRequest (POST /api/auth/refresh)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

impl RefreshRequest {
    pub fn validate(self) -> Result<String, AppError> {
        required(self.refresh_token, "Refresh token is required")
    }
}

/// UpdateProfileRequest (PUT /api/auth/profile)
///
/// Each field is independently optional; empty strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

/// The fields of a profile update that were actually supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<ProfileUpdate, AppError> {
        Ok(ProfileUpdate {
            name: supplied(self.name),
            email: supplied(self.email),
            password: supplied(self.password),
            avatar: supplied(self.avatar),
        })
    }
}

/// CreatePostRequest (POST /api/posts)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

impl CreatePostRequest {
    pub fn validate(self) -> Result<NewPost, AppError> {
        Ok(NewPost {
            title: required(self.title, "Title is required")?,
            content: required(self.content, "Content is required")?,
        })
    }
}

/// UpdatePostRequest (PUT /api/posts/{id})
///
/// Only the content fields are accepted. Anything else in the body
/// (`user`, `likes`, ...) is ignored, so ownership can never be reassigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdatePostRequest {
    pub fn validate(self) -> Result<PostUpdate, AppError> {
        Ok(PostUpdate {
            title: supplied(self.title),
            content: supplied(self.content),
        })
    }
}

/// CommentRequest (POST /api/comments/{post_id}, PUT /api/comments/{id})
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: Option<String>,
}

impl CommentRequest {
    pub fn validate(self) -> Result<String, AppError> {
        required(self.content, "Content is required")
    }
}

// --- Responses ---

/// TokenPair
///
/// Returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileUpdatedResponse {
    pub message: String,
    pub user: AccountProfile,
}

/// LikesResponse
///
/// Like count after a toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LikesResponse {
    pub likes: usize,
}
