use dotenvy::dotenv;
use idiot_index::{
    api::{self, AppState},
    config::{self, database},
    errors::Result,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load application configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database
    let db = database::init_database(&app_config.database.url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Serve the API until Ctrl-C
    let app = api::router(AppState::new(db, app_config.graph));
    let listener = TcpListener::bind(&app_config.server.bind_address)
        .await
        .inspect_err(|e| {
            error!(
                "Failed to bind {}: {}",
                app_config.server.bind_address, e
            );
        })?;
    info!("Listening on {}", app_config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the server keeps running until the process is killed
        error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
