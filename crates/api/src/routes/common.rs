use crate::{models::ErrorResponse, routes::api::AppState};
use axum::{http::StatusCode, Json};
use config::SettingsError;
use services::membership::MembershipError;
use services::permission::Actor;
use tracing::{error, warn};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>, error_type: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse::new(message.into(), error_type.to_string())),
    )
}

/// Map workflow errors to HTTP status codes
pub fn map_membership_error(err: MembershipError) -> ApiError {
    match err {
        MembershipError::OrganizationNotFound(_) => {
            api_error(StatusCode::NOT_FOUND, err.to_string(), "not_found")
        }
        MembershipError::PreconditionFailed { .. } => {
            api_error(StatusCode::CONFLICT, err.to_string(), "precondition_failed")
        }
        MembershipError::AuthorizationDenied { .. } | MembershipError::InsufficientRole { .. } => {
            api_error(StatusCode::FORBIDDEN, err.to_string(), "forbidden")
        }
        MembershipError::DuplicateMembership { .. } | MembershipError::OrganizationExists(_) => {
            api_error(StatusCode::CONFLICT, err.to_string(), "conflict")
        }
        MembershipError::InvalidOrganizationName(_) => {
            api_error(StatusCode::BAD_REQUEST, err.to_string(), "bad_request")
        }
        MembershipError::InvalidPermissionLevel(ref level) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_param(
                err.to_string(),
                "bad_request".to_string(),
                format!("level={level}"),
            )),
        ),
        MembershipError::Gateway(ref e) => {
            error!(error = %e, "Platform gateway failure");
            api_error(StatusCode::BAD_GATEWAY, err.to_string(), "gateway_error")
        }
        MembershipError::Storage(ref e) => {
            error!(error = %e, "Storage failure");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage failure",
                "internal_server_error",
            )
        }
    }
}

pub fn map_settings_error(err: SettingsError) -> ApiError {
    match err {
        SettingsError::GuildAlreadyRegistered(_) => {
            api_error(StatusCode::CONFLICT, err.to_string(), "conflict")
        }
        SettingsError::GuildNotRegistered | SettingsError::WrongGuild { .. } => {
            api_error(StatusCode::BAD_REQUEST, err.to_string(), "bad_request")
        }
        SettingsError::Io { .. } | SettingsError::Parse { .. } => {
            error!(error = %err, "Failed to persist settings");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist settings",
                "internal_server_error",
            )
        }
    }
}

/// Admin-channel commands are only accepted from the registered channel
pub async fn ensure_admin_channel(app_state: &AppState, channel_id: i64) -> Result<(), ApiError> {
    match app_state.admin_channel_id().await {
        Some(registered) if registered == channel_id => Ok(()),
        Some(_) => {
            warn!(channel_id, "Admin command issued outside the admin channel");
            Err(api_error(
                StatusCode::FORBIDDEN,
                "Command must be issued from the admin channel",
                "forbidden",
            ))
        }
        None => Err(api_error(
            StatusCode::FORBIDDEN,
            "No admin channel registered",
            "admin_channel_not_registered",
        )),
    }
}

/// Settings changes need the platform administrator permission
pub fn ensure_platform_administrator(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_administrator {
        return Ok(());
    }
    warn!(actor_id = %actor.id, "Settings change denied");
    Err(api_error(
        StatusCode::FORBIDDEN,
        "Administrator permission required",
        "forbidden",
    ))
}
