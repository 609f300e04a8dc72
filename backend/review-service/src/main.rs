use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use review_service::config::{LogFormat, StoreBackend};
use review_service::db::{self, MemoryStore, Store};
use review_service::handlers;
use review_service::middleware::JwtAuthMiddleware;
use review_service::services::{EmailSender, Services, SmtpEmailSender};
use review_service::Config;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

/// Review Service
///
/// Reviews, episode reviews, reply threads, reports and moderation,
/// favorites and watchlists.
///
/// # Routes
///
/// - `/api/v1/reviews/*`, `/api/v1/episode-reviews/*`
/// - `/api/v1/review-replies/*`
/// - `/api/v1/reports/*` (listing and moderation require the admin role)
/// - `/api/v1/favorites/*`, `/api/v1/watchlist/*`
/// - `/api/v1/health`
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    init_tracing(config.app.log_format);

    tracing::info!(
        env = %config.app.env,
        store = ?config.app.store_backend,
        "Starting review-service"
    );

    let (store, pool) = match config.app.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database)
                .await
                .context("Failed to create database pool")?;
            db::pool::migrate(&pool)
                .await
                .context("Failed to run database migrations")?;
            (Store::postgres(pool.clone()), Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            (Store::memory(Arc::new(MemoryStore::new())), None)
        }
    };

    let email: Arc<dyn EmailSender> = Arc::new(
        SmtpEmailSender::new(&config.email).context("Failed to configure email sender")?,
    );
    let services = web::Data::new(Services::new(store, email, &config.email.app_base_url));
    let pool_data = pool.map(web::Data::new);

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let allowed_origins = config.allowed_origins();
    let jwt_secret = config.auth.jwt_secret.clone();

    tracing::info!(address = %bind_address, "HTTP server listening");

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in &allowed_origins {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let mut app = App::new().app_data(services.clone());
        if let Some(pool) = &pool_data {
            app = app.app_data(pool.clone());
        }

        app.wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(jwt_secret.as_str()))
                    .configure(handlers::configure),
            )
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    let handle = server.handle();
    tokio::select! {
        result = server => {
            result.context("HTTP server error")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            handle.stop(true).await;
        }
    }

    tracing::info!("review-service stopped");
    Ok(())
}
