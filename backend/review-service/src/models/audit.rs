use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Every mutation this service can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateReview,
    UpdateReview,
    DeleteReview,
    CreateEpisodeReview,
    UpdateEpisodeReview,
    DeleteEpisodeReview,
    CreateReply,
    UpdateReply,
    DeleteReply,
    CreateReport,
    ApproveReport,
    RejectReport,
    DeleteReport,
    BanContent,
    UnbanContent,
    AddFavorite,
    RemoveFavorite,
    AddToWatchlist,
    RemoveFromWatchlist,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateReview => "CREATE_REVIEW",
            AuditAction::UpdateReview => "UPDATE_REVIEW",
            AuditAction::DeleteReview => "DELETE_REVIEW",
            AuditAction::CreateEpisodeReview => "CREATE_EPISODE_REVIEW",
            AuditAction::UpdateEpisodeReview => "UPDATE_EPISODE_REVIEW",
            AuditAction::DeleteEpisodeReview => "DELETE_EPISODE_REVIEW",
            AuditAction::CreateReply => "CREATE_REPLY",
            AuditAction::UpdateReply => "UPDATE_REPLY",
            AuditAction::DeleteReply => "DELETE_REPLY",
            AuditAction::CreateReport => "CREATE_REPORT",
            AuditAction::ApproveReport => "APPROVE_REPORT",
            AuditAction::RejectReport => "REJECT_REPORT",
            AuditAction::DeleteReport => "DELETE_REPORT",
            AuditAction::BanContent => "BAN_CONTENT",
            AuditAction::UnbanContent => "UNBAN_CONTENT",
            AuditAction::AddFavorite => "ADD_FAVORITE",
            AuditAction::RemoveFavorite => "REMOVE_FAVORITE",
            AuditAction::AddToWatchlist => "ADD_TO_WATCHLIST",
            AuditAction::RemoveFromWatchlist => "REMOVE_FROM_WATCHLIST",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What gets handed to the audit sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub user_id: Uuid,
    pub description: String,
}

/// Persisted audit row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub action: String,
    pub user_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_match_serde() {
        for action in [
            AuditAction::CreateEpisodeReview,
            AuditAction::BanContent,
            AuditAction::RemoveFromWatchlist,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json.trim_matches('"'), action.as_str());
        }
    }
}
