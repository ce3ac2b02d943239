use crate::models::Effect;
use async_trait::async_trait;
use services::membership::{GatewayError, OrganizationId, PlatformGateway, UserId};
use services::permission::ChannelAccess;
use tokio::sync::Mutex;

/// Gateway that records requested platform actions for the HTTP response.
///
/// One collector is created per request; the platform bot consuming the API
/// performs the collected effects.
pub struct EffectCollector {
    admin_channel_id: Option<i64>,
    effects: Mutex<Vec<Effect>>,
}

impl EffectCollector {
    pub fn new(admin_channel_id: Option<i64>) -> Self {
        Self {
            admin_channel_id,
            effects: Mutex::new(Vec::new()),
        }
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects.into_inner()
    }

    async fn push(&self, effect: Effect) -> Result<(), GatewayError> {
        self.effects.lock().await.push(effect);
        Ok(())
    }
}

#[async_trait]
impl PlatformGateway for EffectCollector {
    async fn notify_admins(&self, text: &str) -> Result<(), GatewayError> {
        self.push(Effect::NotifyAdmins {
            channel_id: self.admin_channel_id,
            text: text.to_string(),
        })
        .await
    }

    async fn direct_message(&self, user_id: UserId, text: &str) -> Result<(), GatewayError> {
        self.push(Effect::DirectMessage {
            user_id: user_id.0,
            text: text.to_string(),
        })
        .await
    }

    async fn grant_role(
        &self,
        user_id: UserId,
        org_id: OrganizationId,
    ) -> Result<(), GatewayError> {
        self.push(Effect::GrantRole {
            user_id: user_id.0,
            role_id: org_id.0,
        })
        .await
    }

    async fn revoke_role(
        &self,
        user_id: UserId,
        org_id: OrganizationId,
    ) -> Result<(), GatewayError> {
        self.push(Effect::RevokeRole {
            user_id: user_id.0,
            role_id: org_id.0,
        })
        .await
    }

    async fn set_nickname(&self, user_id: UserId, name: &str) -> Result<(), GatewayError> {
        self.push(Effect::SetNickname {
            user_id: user_id.0,
            nickname: name.to_string(),
        })
        .await
    }

    async fn set_channel_access(
        &self,
        user_id: UserId,
        access: ChannelAccess,
    ) -> Result<(), GatewayError> {
        self.push(Effect::SetChannelAccess {
            user_id: user_id.0,
            channel_id: self.admin_channel_id,
            access,
        })
        .await
    }
}
