use crate::models::{AccountId, Comment, Post};

/// Anything carrying a like set.
pub trait Likeable {
    fn likes_mut(&mut self) -> &mut Vec<AccountId>;
}

impl Likeable for Post {
    fn likes_mut(&mut self) -> &mut Vec<AccountId> {
        &mut self.likes
    }
}

impl Likeable for Comment {
    fn likes_mut(&mut self) -> &mut Vec<AccountId> {
        &mut self.likes
    }
}

/// toggle_like
///
/// Flips `principal`'s membership in the resource's like set: removes it if
/// present, adds it otherwise. Returns the number of likes afterwards.
///
/// The set is stored as a `Vec`, so removal drops every occurrence and an add
/// only happens when none is present. Calling this twice in a row restores the
/// original membership.
///
/// This is only safe under whatever makes the read-modify-write atomic for the
/// caller (a write lock, or a single-statement update in the database).
pub fn toggle_like<R: Likeable>(resource: &mut R, principal: AccountId) -> usize {
    let likes = resource.likes_mut();
    if likes.contains(&principal) {
        likes.retain(|id| *id != principal);
    } else {
        likes.push(principal);
    }
    likes.len()
}
