use crate::{
    models::{AdminChannelRequest, GuildRequest, SettingsResponse},
    routes::{
        api::AppState,
        common::{ensure_platform_administrator, map_settings_error, ApiError},
    },
};
use axum::extract::{Json, State};
use config::SettingsStore;
use tracing::info;

fn settings_response(store: &SettingsStore) -> SettingsResponse {
    SettingsResponse {
        guild_id: store.guild_id(),
        admin_channel_id: store.admin_channel_id(),
    }
}

pub async fn get_settings(State(app_state): State<AppState>) -> Json<SettingsResponse> {
    Json(settings_response(&*app_state.settings.read().await))
}

/// Register the guild the registrar serves
pub async fn register_guild(
    State(app_state): State<AppState>,
    Json(request): Json<GuildRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    ensure_platform_administrator(&request.actor)?;

    let mut store = app_state.settings.write().await;
    store
        .register_guild(request.guild_id)
        .map_err(map_settings_error)?;
    info!(guild_id = request.guild_id, "Guild registered");

    Ok(Json(settings_response(&store)))
}

/// Forget the guild and its admin channel
pub async fn unregister_guild(
    State(app_state): State<AppState>,
    Json(request): Json<GuildRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    ensure_platform_administrator(&request.actor)?;

    let mut store = app_state.settings.write().await;
    store
        .unregister_guild(request.guild_id)
        .map_err(map_settings_error)?;
    info!(guild_id = request.guild_id, "Guild unregistered");

    Ok(Json(settings_response(&store)))
}

/// Bind the channel that accepts administrative commands
pub async fn register_admin_channel(
    State(app_state): State<AppState>,
    Json(request): Json<AdminChannelRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    ensure_platform_administrator(&request.actor)?;

    let mut store = app_state.settings.write().await;
    store
        .register_admin_channel(request.guild_id, request.channel_id)
        .map_err(map_settings_error)?;
    info!(
        guild_id = request.guild_id,
        channel_id = request.channel_id,
        "Admin channel registered"
    );

    Ok(Json(settings_response(&store)))
}
