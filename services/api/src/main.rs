use anyhow::Result;
use common::{
    database::{health_check, init_pool},
    error::DatabaseError,
};
use rental_api::{
    AppState, create_router,
    routes::cors_layer,
    settings::{Settings, StorageBackend},
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting rental API service");

    let settings = Settings::from_env()?;
    let jwt_config = settings.jwt_config()?;

    let state = match settings.storage_backend {
        StorageBackend::Postgres => {
            // Initialize database connection pool
            let pool = init_pool(&settings.database_config()).await?;

            // Check database connectivity
            if health_check(&pool).await {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            info!("Database migrations applied");

            AppState::postgres(pool, jwt_config, settings.hashing_cost())?
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data will not survive a restart");
            AppState::in_memory(jwt_config, settings.hashing_cost())?
        }
    };

    let app = create_router(state).layer(cors_layer(&settings.cors_origins()));

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API service stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
