use crate::{
    gateway::EffectCollector,
    models::{
        CommandResponse, DirectMessageRequest, MembershipCommandRequest, MembershipResponse,
        OrganizationResponse, PermissionRequest, ReviewRequest, UserResponse,
    },
    routes::{
        api::AppState,
        common::{ensure_admin_channel, map_membership_error, ApiError},
    },
};
use axum::extract::{Json, Path, State};
use services::membership::{
    DirectMessageOutcome, MembershipError, OrganizationId, PermissionLevel, UserId,
};
use services::permission::AccessDecision;
use tracing::debug;

async fn collector(app_state: &AppState) -> EffectCollector {
    EffectCollector::new(app_state.admin_channel_id().await)
}

fn respond<T>(result: T, gateway: EffectCollector) -> Json<CommandResponse<T>> {
    Json(CommandResponse {
        result,
        effects: gateway.into_effects(),
    })
}

/// Current view of a member with its memberships
pub async fn get_member(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = app_state
        .membership_service
        .user(UserId(user_id))
        .await
        .map_err(map_membership_error)?;

    Ok(Json((&user).into()))
}

/// A user joined the guild: start the registration dialogue
pub async fn join(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<CommandResponse<UserResponse>>, ApiError> {
    let gateway = collector(&app_state).await;
    let service = &app_state.membership_service;

    service
        .onboard(UserId(user_id), &gateway)
        .await
        .map_err(map_membership_error)?;
    let user = service
        .user(UserId(user_id))
        .await
        .map_err(map_membership_error)?;

    Ok(respond((&user).into(), gateway))
}

/// A direct message from the user to the registrar
pub async fn direct_message(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<DirectMessageRequest>,
) -> Result<Json<CommandResponse<DirectMessageOutcome>>, ApiError> {
    let gateway = collector(&app_state).await;

    let outcome = app_state
        .membership_service
        .handle_direct_message(UserId(user_id), &request.content, &gateway)
        .await
        .map_err(map_membership_error)?;
    debug!(user_id, ?outcome, "Handled direct message");

    Ok(respond(outcome, gateway))
}

/// Throw away the registration and start over
pub async fn retry(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<CommandResponse<UserResponse>>, ApiError> {
    let gateway = collector(&app_state).await;
    let service = &app_state.membership_service;

    service
        .retry(UserId(user_id), &gateway)
        .await
        .map_err(map_membership_error)?;
    let user = service
        .user(UserId(user_id))
        .await
        .map_err(map_membership_error)?;

    Ok(respond((&user).into(), gateway))
}

/// Approve the member's pending organization request
pub async fn approve(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<CommandResponse<MembershipResponse>>, ApiError> {
    ensure_admin_channel(&app_state, request.channel_id).await?;
    let gateway = collector(&app_state).await;

    let membership = app_state
        .membership_service
        .approve(&request.actor, UserId(user_id), &gateway)
        .await
        .map_err(map_membership_error)?;

    Ok(respond((&membership).into(), gateway))
}

/// Reject the member's pending request and remove the member
pub async fn reject(
    State(app_state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<CommandResponse<OrganizationResponse>>, ApiError> {
    ensure_admin_channel(&app_state, request.channel_id).await?;
    let gateway = collector(&app_state).await;

    let organization = app_state
        .membership_service
        .reject(&request.actor, UserId(user_id), &gateway)
        .await
        .map_err(map_membership_error)?;

    Ok(respond((&organization).into(), gateway))
}

/// Add the member to an organization without approval
pub async fn add_member(
    State(app_state): State<AppState>,
    Path((user_id, org_id)): Path<(i64, i64)>,
    Json(request): Json<MembershipCommandRequest>,
) -> Result<Json<CommandResponse<MembershipResponse>>, ApiError> {
    let gateway = collector(&app_state).await;

    let membership = app_state
        .membership_service
        .add_member(
            &request.actor,
            UserId(user_id),
            OrganizationId(org_id),
            &gateway,
        )
        .await
        .map_err(map_membership_error)?;

    Ok(respond((&membership).into(), gateway))
}

/// Remove the member from an organization
pub async fn remove_member(
    State(app_state): State<AppState>,
    Path((user_id, org_id)): Path<(i64, i64)>,
    Json(request): Json<MembershipCommandRequest>,
) -> Result<Json<CommandResponse<MembershipResponse>>, ApiError> {
    let gateway = collector(&app_state).await;

    let membership = app_state
        .membership_service
        .remove_member(
            &request.actor,
            UserId(user_id),
            OrganizationId(org_id),
            &gateway,
        )
        .await
        .map_err(map_membership_error)?;

    Ok(respond((&membership).into(), gateway))
}

/// Set the member's permission level within an organization
pub async fn grant_permission(
    State(app_state): State<AppState>,
    Path((user_id, org_id)): Path<(i64, i64)>,
    Json(request): Json<PermissionRequest>,
) -> Result<Json<CommandResponse<AccessDecision>>, ApiError> {
    ensure_admin_channel(&app_state, request.channel_id).await?;
    let level: PermissionLevel = request
        .level
        .parse()
        .map_err(|e: services::membership::InvalidPermissionLevel| {
            map_membership_error(MembershipError::InvalidPermissionLevel(e.0))
        })?;
    let gateway = collector(&app_state).await;

    let decision = app_state
        .membership_service
        .grant_permission(
            &request.actor,
            UserId(user_id),
            OrganizationId(org_id),
            level,
            &gateway,
        )
        .await
        .map_err(map_membership_error)?;

    Ok(respond(decision, gateway))
}
