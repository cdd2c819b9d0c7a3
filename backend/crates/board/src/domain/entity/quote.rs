//! Quote Entity
//!
//! A short attributed quote submitted to the board.

use chrono::{DateTime, TimeDelta, Utc};
use kernel::id::{QuoteId, UserId};

use crate::domain::entity::user::User;

/// Quote entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quote {
    /// Random, collision-resistant identifier
    pub id: QuoteId,
    /// User who submitted the quote (immutable)
    pub submitter_id: UserId,
    /// Who said it
    pub quotee: String,
    /// Where or when it was said
    pub context: String,
    /// The quote itself
    pub text: String,
    /// Submission time
    pub created: DateTime<Utc>,
}

impl Quote {
    /// Whether `user` may edit or delete this quote at `now`
    ///
    /// Admins may always edit. Submitters may edit until `window` has
    /// elapsed since submission.
    pub fn editable(&self, user: &User, now: DateTime<Utc>, window: TimeDelta) -> bool {
        if user.is_admin() {
            return true;
        }

        !user.id.is_empty()
            && user.id == self.submitter_id
            && now.signed_duration_since(self.created) < window
    }
}
