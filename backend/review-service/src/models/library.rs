use super::audit::AuditAction;
use super::catalog::ContentSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The two per-user content lists; same shape, different tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Favorites,
    Watchlist,
}

impl ListKind {
    pub fn table(&self) -> &'static str {
        match self {
            ListKind::Favorites => "favorites",
            ListKind::Watchlist => "watchlist",
        }
    }

    pub fn add_action(&self) -> AuditAction {
        match self {
            ListKind::Favorites => AuditAction::AddFavorite,
            ListKind::Watchlist => AuditAction::AddToWatchlist,
        }
    }

    pub fn remove_action(&self) -> AuditAction {
        match self {
            ListKind::Favorites => AuditAction::RemoveFavorite,
            ListKind::Watchlist => AuditAction::RemoveFromWatchlist,
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItemView {
    #[serde(flatten)]
    pub entry: LibraryEntry,
    pub content: Option<ContentSummary>,
}
