//! Shared fixtures for review-service integration tests
//!
//! Fixtures run on the in-memory store; `postgres_test` brings its own database.

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use review_service::db::{MemoryStore, Store};
use review_service::error::Result;
use review_service::middleware::Claims;
use review_service::models::review::{CreateEpisodeReview, CreateReview};
use review_service::models::{EpisodeReview, Review};
use review_service::services::{EmailSender, Services};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-with-32-plus-bytes";
pub const APP_BASE_URL: &str = "https://app.nova.dev";

/// Email sender that keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub memory: Arc<MemoryStore>,
    pub services: Services,
    pub mailer: Arc<RecordingMailer>,
    pub alice: Uuid,
    pub bob: Uuid,
    pub admin: Uuid,
    pub movie: Uuid,
    pub series: Uuid,
    pub episode: Uuid,
}

impl Harness {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        let alice = memory.add_user("alice", Some("alice@nova.dev")).await;
        let bob = memory.add_user("bob", Some("bob@nova.dev")).await;
        let admin = memory.add_user("moderator", Some("mod@nova.dev")).await;
        let movie = memory.add_movie("Heat").await;
        let series = memory.add_series("The Wire").await;
        let episode = memory.add_episode(series, 1, 1, "The Target").await;

        let mailer = Arc::new(RecordingMailer::default());
        let services = Services::new(
            Store::memory(memory.clone()),
            mailer.clone(),
            APP_BASE_URL,
        );

        Self {
            memory,
            services,
            mailer,
            alice,
            bob,
            admin,
            movie,
            series,
            episode,
        }
    }

    pub async fn review(&self, user_id: Uuid, content_id: Uuid, rating: i32) -> Review {
        self.services
            .reviews
            .create_review(
                user_id,
                CreateReview {
                    content_id,
                    content_reviewed: format!("{} stars from me", rating),
                    rating,
                },
            )
            .await
            .unwrap()
            .review
    }

    pub async fn episode_review(&self, user_id: Uuid) -> EpisodeReview {
        self.services
            .episode_reviews
            .create_episode_review(
                user_id,
                CreateEpisodeReview {
                    episode_id: self.episode,
                    content_reviewed: "Strong opener".into(),
                    rating: 4,
                },
            )
            .await
            .unwrap()
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        self.memory
            .audit_log()
            .await
            .into_iter()
            .map(|entry| entry.action)
            .collect()
    }
}

/// Mint an access token the way identity-service does
pub fn token(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}
