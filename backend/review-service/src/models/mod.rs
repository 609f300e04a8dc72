//! Domain models shared by the store, service and handler layers.

pub mod audit;
pub mod catalog;
pub mod library;
pub mod pagination;
pub mod reply;
pub mod report;
pub mod review;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use catalog::{ContentKind, ContentSummary, Episode, MediaRef, UserSummary};
pub use library::{LibraryEntry, ListKind};
pub use pagination::{Page, PageRequest, Sort, SortDirection, SortField, SortKey};
pub use reply::{ParentFilter, ReplyFilter, ReplyParent, ReplySubtree, ReviewReply};
pub use report::{Report, ReportFilter, ReportStatus, ReportTarget, ReportType};
pub use review::{EpisodeReview, EpisodeReviewFilter, ModerationStatus, Review, ReviewFilter};

use uuid::Uuid;

/// Who is performing a mutation.
///
/// Admins bypass ownership checks; users may only touch what they authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(Uuid),
    Admin(Uuid),
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match self {
            Actor::User(id) | Actor::Admin(id) => *id,
        }
    }

    pub fn may_modify(&self, author_id: Uuid) -> bool {
        match self {
            Actor::Admin(_) => true,
            Actor::User(id) => *id == author_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_bypasses_ownership() {
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(Actor::User(author).may_modify(author));
        assert!(!Actor::User(stranger).may_modify(author));
        assert!(Actor::Admin(stranger).may_modify(author));
        assert_eq!(Actor::Admin(stranger).id(), stranger);
    }
}
