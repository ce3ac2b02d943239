use anyhow::Context;
use api::{build_api_router, init_membership_service, init_tracing, AppState};
use config::{RegistrarConfig, SettingsStore};
use database::Database;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first to get logging settings
    let config = RegistrarConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    let database = Database::from_config(&config.database)
        .await
        .context("Failed to connect to database")?;
    database
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;

    let settings = SettingsStore::open(&config.registration.settings_path).with_context(|| {
        format!(
            "Failed to open settings file {}",
            config.registration.settings_path
        )
    })?;
    if settings.admin_channel_id().is_none() {
        info!("No admin channel registered; admin commands are disabled until one is");
    }

    let membership_service =
        init_membership_service(database.memberships.clone(), &config.registration);
    let app = build_api_router(AppState::new(membership_service, settings));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    info!(address = %bind_address, "Server started successfully");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
