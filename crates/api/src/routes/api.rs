use crate::routes::{health::health_check, members::*, organizations::*, settings::*};
use axum::{
    routing::{get, post, put},
    Router,
};
use config::SettingsStore;
use services::MembershipService;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub membership_service: Arc<MembershipService>,
    pub settings: Arc<RwLock<SettingsStore>>,
}

impl AppState {
    pub fn new(membership_service: Arc<MembershipService>, settings: SettingsStore) -> Self {
        Self {
            membership_service,
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    pub async fn admin_channel_id(&self) -> Option<i64> {
        self.settings.read().await.admin_channel_id()
    }
}

/// Build the registrar router
pub fn build_api_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/settings", get(get_settings))
        .route(
            "/v1/settings/guild",
            put(register_guild).delete(unregister_guild),
        )
        .route("/v1/settings/admin-channel", put(register_admin_channel))
        .route(
            "/v1/organizations",
            get(list_organizations).post(create_organization),
        )
        .route("/v1/organizations/{org_id}", get(get_organization))
        .route("/v1/members/{user_id}", get(get_member))
        .route("/v1/members/{user_id}/join", post(join))
        .route("/v1/members/{user_id}/messages", post(direct_message))
        .route("/v1/members/{user_id}/retry", post(retry))
        .route("/v1/members/{user_id}/approve", post(approve))
        .route("/v1/members/{user_id}/reject", post(reject))
        .route(
            "/v1/members/{user_id}/organizations/{org_id}",
            put(add_member).delete(remove_member),
        )
        .route(
            "/v1/members/{user_id}/organizations/{org_id}/permissions",
            put(grant_permission),
        )
        .with_state(app_state)
}
