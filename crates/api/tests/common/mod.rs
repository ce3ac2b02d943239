#![allow(dead_code)]

use api::{build_api_router, init_membership_service, AppState};
use axum_test::TestServer;
use config::{RegistrationConfig, SettingsStore};
use serde_json::{json, Value};
use services::membership::PermissionLevel;
use services::test_utils::InMemoryMembershipRepository;
use std::sync::Arc;
use tempfile::TempDir;

pub const GUILD_ID: i64 = 100;
pub const ADMIN_CHANNEL_ID: i64 = 200;
pub const ALPHA: i64 = 1;
pub const BETA: i64 = 2;

pub struct TestContext {
    pub server: TestServer,
    pub repo: Arc<InMemoryMembershipRepository>,
    _settings_dir: TempDir,
}

/// Server over an in-memory repository seeded with Alpha and Beta.
///
/// With `register_channel` the guild and admin channel are registered.
pub fn setup_test_server(register_channel: bool) -> TestContext {
    let settings_dir = tempfile::tempdir().unwrap();
    let mut settings = SettingsStore::open(settings_dir.path().join("settings.json")).unwrap();
    if register_channel {
        settings.register_guild(GUILD_ID).unwrap();
        settings
            .register_admin_channel(GUILD_ID, ADMIN_CHANNEL_ID)
            .unwrap();
    }

    let repo = Arc::new(InMemoryMembershipRepository::with_orgs(&[
        (ALPHA, "Alpha"),
        (BETA, "Beta"),
    ]));
    let registration = RegistrationConfig {
        community_name: "Test Guild".to_string(),
        ..RegistrationConfig::default()
    };
    let service = init_membership_service(repo.clone(), &registration);
    let app = build_api_router(AppState::new(service, settings));

    TestContext {
        server: TestServer::new(app).unwrap(),
        repo,
        _settings_dir: settings_dir,
    }
}

impl TestContext {
    pub fn seed_user(&self, id: i64, memberships: &[(i64, PermissionLevel)]) {
        self.repo
            .seed_user(id, Some(&format!("user-{id}")), memberships);
    }

    /// Walk a new user through the dialogue up to a pending request
    pub async fn register_applicant(&self, user_id: i64, nickname: &str, org_name: &str) {
        self.server
            .post(&format!("/v1/members/{user_id}/join"))
            .await
            .assert_status_ok();
        self.server
            .post(&format!("/v1/members/{user_id}/messages"))
            .json(&json!({ "content": nickname }))
            .await
            .assert_status_ok();
        self.server
            .post(&format!("/v1/members/{user_id}/messages"))
            .json(&json!({ "content": org_name }))
            .await
            .assert_status_ok();
    }
}

pub fn actor(id: i64) -> Value {
    json!({ "id": id, "is_administrator": false })
}

pub fn platform_admin() -> Value {
    json!({ "id": 1, "is_administrator": true })
}

pub fn effects_of_kind<'a>(body: &'a Value, kind: &str) -> Vec<&'a Value> {
    body["effects"]
        .as_array()
        .map(|effects| effects.iter().filter(|e| e["kind"] == kind).collect())
        .unwrap_or_default()
}
