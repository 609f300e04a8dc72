/// Review Service Library
///
/// Reviews, episode reviews, reply threads, user reports and their
/// moderation, plus per-user favorites and watchlists for the Nova media
/// catalog. Every mutation leaves one entry in the audit log.
///
/// # Modules
///
/// - `handlers`: HTTP endpoints under `/api/v1`
/// - `services`: Business logic, ownership checks and audit logging
/// - `db`: Persistence traits with PostgreSQL and in-memory backends
/// - `models`: Entities, filters, paging and sorting
/// - `middleware`: JWT authentication and caller extractors
/// - `error`: Error types and HTTP mapping
/// - `config`: Configuration management
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
