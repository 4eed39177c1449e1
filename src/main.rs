use blog_backend::{
    AppState, create_router,
    config::{AppConfig, Env},
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{process::ExitCode, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "blog_backend=debug,tower_http=info,axum=trace";

/// init_tracing
///
/// Pretty, human-readable output locally; JSON lines in production for log
/// aggregation. `RUST_LOG` overrides the default filter.
fn init_tracing(env: Env) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    match env {
        Env::Local => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
        Env::Production => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// connect_repository
///
/// Postgres (with migrations applied) when `DATABASE_URL` is set, otherwise the
/// in-memory store. Production always has a URL; `AppConfig::load` enforces it.
async fn connect_repository(config: &AppConfig) -> Result<RepositoryState, Box<dyn std::error::Error>> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
        return Ok(Arc::new(InMemoryRepository::new()));
    };

    let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database connected and migrated");

    Ok(Arc::new(PostgresRepository::new(pool)))
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repo = connect_repository(&config).await?;
    let bind_addr = config.bind_addr;

    let app = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// main
///
/// Loads `.env`, reads the configuration (missing secrets are fatal), sets up
/// logging, connects storage and serves HTTP until the process is stopped.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            // The configured log format is unknown at this point.
            init_tracing(Env::Local);
            tracing::error!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.env);
    tracing::info!("Application starting in {:?} mode", config.env);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("server stopped: {err}");
            ExitCode::FAILURE
        }
    }
}
