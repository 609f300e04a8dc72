/// Business logic layer for review-service
///
/// - Reviews and episode reviews, with the per-title rating aggregate
/// - Reply trees under either kind of review
/// - Reports, ban/unban and the author notifications they trigger
/// - Favorites and watchlist
///
/// Every mutating operation records exactly one audit entry through
/// [`AuditLogger`], whether it succeeds or not.
pub mod audit;
pub mod email;
pub mod episode_reviews;
pub mod library;
pub mod moderation;
pub mod replies;
pub mod reviews;

pub use audit::AuditLogger;
pub use email::{EmailSender, SmtpEmailSender};
pub use episode_reviews::EpisodeReviewService;
pub use library::LibraryService;
pub use moderation::ModerationService;
pub use replies::ReplyService;
pub use reviews::ReviewService;

use crate::db::Store;
use std::sync::Arc;

/// Every service, wired to one store
#[derive(Clone)]
pub struct Services {
    pub reviews: ReviewService,
    pub episode_reviews: EpisodeReviewService,
    pub replies: ReplyService,
    pub moderation: ModerationService,
    pub library: LibraryService,
}

impl Services {
    pub fn new(store: Store, email: Arc<dyn EmailSender>, app_base_url: &str) -> Self {
        let audit = AuditLogger::new(store.audit.clone());
        Self {
            reviews: ReviewService::new(&store, audit.clone()),
            episode_reviews: EpisodeReviewService::new(&store, audit.clone()),
            replies: ReplyService::new(&store, audit.clone()),
            moderation: ModerationService::new(&store, email, audit.clone(), app_base_url),
            library: LibraryService::new(&store, audit),
        }
    }
}
