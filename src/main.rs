use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
use router::app_router;
use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};
mod ai;
mod auth;
mod config;
mod data;
mod error;
mod middleware;

use ai::advisor::{LegalAdvisor, MockAdvisor};
use auth::AuthService;
use config::Config;
use data::repository::{LegalQueryRepository, ProfileRepository, UserRepository};

pub struct AppState {
    pub auth: AuthService,
    pub user_repo: UserRepository,
    pub profile_repo: ProfileRepository,
    pub legal_repo: LegalQueryRepository,
    pub advisor: Arc<dyn LegalAdvisor>,
}

impl AppState {
    pub fn new(pool: Arc<SqlitePool>, config: &Config) -> Self {
        let user_repo = UserRepository { pool: pool.clone() };
        let advisor: Arc<dyn LegalAdvisor> =
            Arc::new(MockAdvisor::new(&config.model_path, config.advisor_seed));

        Self {
            auth: AuthService::new(user_repo.clone(), config),
            user_repo,
            profile_repo: ProfileRepository { pool: pool.clone() },
            legal_repo: LegalQueryRepository { pool },
            advisor,
        }
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    app_router(state).layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vakeel_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load();

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("invalid DATABASE_URL")
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .create_if_missing(true);

    // setup connection pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
        .expect("can't connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let state = Arc::new(AppState::new(Arc::new(pool), &config));
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        tracing::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
