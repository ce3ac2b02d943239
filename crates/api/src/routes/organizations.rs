use crate::{
    models::{CreateOrganizationRequest, ListOrganizationsResponse, OrganizationResponse},
    routes::{
        api::AppState,
        common::{api_error, ensure_admin_channel, map_membership_error, ApiError},
    },
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use services::membership::OrganizationId;
use tracing::debug;

/// List the names applicants can choose from
pub async fn list_organizations(
    State(app_state): State<AppState>,
) -> Result<Json<ListOrganizationsResponse>, ApiError> {
    let organizations = app_state
        .membership_service
        .organization_names()
        .await
        .map_err(map_membership_error)?;

    Ok(Json(ListOrganizationsResponse { organizations }))
}

/// Look up an organization by the id of its platform role
pub async fn get_organization(
    State(app_state): State<AppState>,
    Path(org_id): Path<i64>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let name = app_state
        .membership_service
        .organization_name_for_role(OrganizationId(org_id))
        .await
        .map_err(map_membership_error)?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("Organization {org_id} not found"),
                "not_found",
            )
        })?;

    Ok(Json(OrganizationResponse { id: org_id, name }))
}

/// Register an organization backed by an existing platform role
pub async fn create_organization(
    State(app_state): State<AppState>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    ensure_admin_channel(&app_state, request.channel_id).await?;
    debug!(
        "Creating organization {} ({}) by user {}",
        request.name, request.id, request.actor.id
    );

    let organization = app_state
        .membership_service
        .add_organization(&request.actor, OrganizationId(request.id), &request.name)
        .await
        .map_err(map_membership_error)?;

    Ok(Json((&organization).into()))
}
