/// Configuration management for Review Service
///
/// All settings come from environment variables (a `.env` file is loaded by
/// `main` through dotenvy). Development defaults are provided for everything
/// except the values that must be explicit in production.
use serde::{Deserialize, Serialize};
use std::fmt;

const DEV_JWT_SECRET: &str = "dev-only-review-service-secret-change-me-0000";
const MIN_JWT_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// In-process store; tests and local experiments only
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database pool configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Timeout for the post-connect `SELECT 1` verification
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with identity-service
    pub jwt_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

/// SMTP settings for moderation notices
///
/// An empty `smtp_host` switches the sender into no-op mode.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
    /// Base URL used for links back to the reviewed title
    pub app_base_url: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .field("app_base_url", &self.app_base_url)
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = env_or("APP_ENV", "development");
        let is_production = app_env.eq_ignore_ascii_case("production");

        let store_backend = match env_or("STORE_BACKEND", "postgres").to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" if is_production => {
                return Err("STORE_BACKEND=memory is not allowed in production".to_string())
            }
            "memory" => StoreBackend::Memory,
            other => return Err(format!("Unknown STORE_BACKEND '{}'", other)),
        };

        let log_format = match env_or("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
            Ok(value) => value,
            Err(_) if is_production => {
                return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
            }
            Err(_) => "http://localhost:3000".to_string(),
        };
        if is_production && allowed_origins.trim() == "*" {
            return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
        }

        let jwt_secret = match env_non_empty("JWT_SECRET") {
            Some(secret) => secret,
            None if is_production => return Err("JWT_SECRET must be set in production".to_string()),
            None => DEV_JWT_SECRET.to_string(),
        };
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(format!(
                "JWT_SECRET must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            ));
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: env_or("REVIEW_SERVICE_HOST", "0.0.0.0"),
                port: env_parse("REVIEW_SERVICE_PORT", 8086),
                store_backend,
                log_format,
            },
            cors: CorsConfig { allowed_origins },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "postgresql://localhost/nova"),
                max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
                min_connections: env_parse("DB_MIN_CONNECTIONS", 2),
                connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS", 5),
                acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", 10),
                idle_timeout_secs: env_parse("DB_IDLE_TIMEOUT_SECS", 600),
                max_lifetime_secs: env_parse("DB_MAX_LIFETIME_SECS", 1800),
            },
            auth: AuthConfig { jwt_secret },
            email: EmailConfig {
                smtp_host: env_or("SMTP_HOST", ""),
                smtp_port: env_parse("SMTP_PORT", 587),
                smtp_username: env_non_empty("SMTP_USERNAME"),
                smtp_password: env_non_empty("SMTP_PASSWORD"),
                smtp_from: env_or("SMTP_FROM", "Nova <noreply@nova.dev>"),
                use_starttls: env_parse("SMTP_STARTTLS", true),
                app_base_url: env_or("APP_BASE_URL", "https://app.nova.dev"),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors
            .allowed_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "STORE_BACKEND",
        "CORS_ALLOWED_ORIGINS",
        "JWT_SECRET",
        "REVIEW_SERVICE_PORT",
        "DB_MAX_CONNECTIONS",
        "SMTP_HOST",
        "SMTP_USERNAME",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.port, 8086);
        assert_eq!(config.app.store_backend, StoreBackend::Postgres);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.email.smtp_host.is_empty());
        assert!(config.email.smtp_username.is_none());
        assert_eq!(config.allowed_origins(), vec!["http://localhost:3000"]);
    }

    #[test]
    #[serial]
    fn test_overrides_are_parsed() {
        clear_env();
        std::env::set_var("REVIEW_SERVICE_PORT", "9100");
        std::env::set_var("DB_MAX_CONNECTIONS", "not-a-number");
        std::env::set_var("STORE_BACKEND", "MEMORY");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://a.dev, https://b.dev,");

        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 9100);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.app.store_backend, StoreBackend::Memory);
        assert_eq!(config.allowed_origins(), vec!["https://a.dev", "https://b.dev"]);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_explicit_secrets() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://nova.dev");
        assert!(Config::from_env().unwrap_err().contains("JWT_SECRET"));

        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        std::env::set_var("JWT_SECRET", "x".repeat(40));
        assert!(Config::from_env().unwrap_err().contains("CORS_ALLOWED_ORIGINS"));

        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://nova.dev");
        std::env::set_var("STORE_BACKEND", "memory");
        assert!(Config::from_env().unwrap_err().contains("STORE_BACKEND"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_short_jwt_secret_rejected() {
        clear_env();
        std::env::set_var("JWT_SECRET", "short");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthConfig {
            jwt_secret: "super-secret".into(),
        };
        assert!(!format!("{:?}", auth).contains("super-secret"));
    }
}
