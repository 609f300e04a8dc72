use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    Movie,
    TvSeries,
}

impl ContentKind {
    /// Wording used in audit descriptions and notification emails
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::TvSeries => "TV series",
        }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movies",
            ContentKind::TvSeries => "tv-series",
        }
    }
}

/// Catalog item as seen by this service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: Uuid,
    pub title: String,
    pub kind: ContentKind,
    pub avg_rating: f64,
    pub created_at: DateTime<Utc>,
}

impl ContentSummary {
    /// `movie "Heat"` / `TV series "The Wire"`
    pub fn describe(&self) -> String {
        format!("{} \"{}\"", self.kind.label(), self.title)
    }
}

/// Concrete movie or series row behind a content id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub kind: ContentKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: Uuid,
    pub content_id: Uuid,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: String,
}

impl Episode {
    /// `S02E05 "Ebb Tide"`
    pub fn code(&self) -> String {
        format!(
            "S{:02}E{:02} \"{}\"",
            self.season_number, self.episode_number, self.title
        )
    }
}

/// Public projection of a user; the email is only used server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        let content = ContentSummary {
            id: Uuid::new_v4(),
            title: "The Wire".into(),
            kind: ContentKind::TvSeries,
            avg_rating: 0.0,
            created_at: Utc::now(),
        };
        assert_eq!(content.describe(), "TV series \"The Wire\"");

        let episode = Episode {
            id: Uuid::new_v4(),
            content_id: content.id,
            season_number: 2,
            episode_number: 5,
            title: "Undertow".into(),
        };
        assert_eq!(episode.code(), "S02E05 \"Undertow\"");
    }

    #[test]
    fn test_user_email_not_serialized() {
        let user = UserSummary {
            id: Uuid::new_v4(),
            username: "mara".into(),
            email: Some("mara@nova.dev".into()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["username"], "mara");
    }
}
