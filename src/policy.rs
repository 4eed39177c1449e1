//! Ownership rules for mutating posts and comments.
//!
//! Every check here is a pure function of the principal and the already-loaded
//! resource. Callers load the resource first and report `NotFound` before any
//! of these run.

use crate::{
    error::AppError,
    models::{AccountId, Comment, Post},
};

/// Resources that record the account that created them.
pub trait Owned {
    fn owner(&self) -> AccountId;
}

impl Owned for Post {
    fn owner(&self) -> AccountId {
        self.owner
    }
}

impl Owned for Comment {
    fn owner(&self) -> AccountId {
        self.owner
    }
}

/// Update of a post or comment, and deletion of a post: owner only.
pub fn ensure_owner<R: Owned>(principal: AccountId, resource: &R) -> Result<(), AppError> {
    if resource.owner() == principal {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// ensure_can_delete_comment
///
/// A comment may be deleted by its author or by the owner of the post it sits
/// on. `parent` is `None` when the parent post no longer exists, in which case
/// only the author qualifies.
pub fn ensure_can_delete_comment(
    principal: AccountId,
    comment: &Comment,
    parent: Option<&Post>,
) -> Result<(), AppError> {
    let moderates = parent.is_some_and(|post| post.owner == principal);
    if comment.owner == principal || moderates {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
