use serde::{Deserialize, Serialize};
use services::membership::{Membership, Organization, PermissionLevel, User};
use services::permission::{Actor, ChannelAccess};

// ============================================
// Side effects
// ============================================

/// A platform action requested while handling a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    NotifyAdmins {
        channel_id: Option<i64>,
        text: String,
    },
    DirectMessage {
        user_id: i64,
        text: String,
    },
    GrantRole {
        user_id: i64,
        role_id: i64,
    },
    RevokeRole {
        user_id: i64,
        role_id: i64,
    },
    SetNickname {
        user_id: i64,
        nickname: String,
    },
    SetChannelAccess {
        user_id: i64,
        channel_id: Option<i64>,
        access: ChannelAccess,
    },
}

/// Command result together with the side effects it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub result: T,
    pub effects: Vec<Effect>,
}

// ============================================
// Requests
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessageRequest {
    pub content: String,
}

/// Approve or reject, issued from the admin channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub actor: Actor,
    pub channel_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipCommandRequest {
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub actor: Actor,
    pub channel_id: i64,
    /// `1`..`3` or `user`, `moderator`, `admin`
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub actor: Actor,
    pub channel_id: i64,
    /// Id of the platform role backing the organization
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRequest {
    pub actor: Actor,
    pub guild_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminChannelRequest {
    pub actor: Actor,
    pub guild_id: i64,
    pub channel_id: i64,
}

// ============================================
// Responses
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationResponse {
    pub id: i64,
    pub name: String,
}

impl From<&Organization> for OrganizationResponse {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id().0,
            name: org.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrganizationsResponse {
    pub organizations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipResponse {
    pub organization: OrganizationResponse,
    pub permission_level: PermissionLevel,
}

impl From<&Membership> for MembershipResponse {
    fn from(membership: &Membership) -> Self {
        Self {
            organization: membership.organization().into(),
            permission_level: membership.permission_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub nickname: Option<String>,
    pub memberships: Vec<MembershipResponse>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().0,
            nickname: user.nickname().map(str::to_string),
            memberships: user.memberships().iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsResponse {
    pub guild_id: Option<i64>,
    pub admin_channel_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: None,
                code: None,
            },
        }
    }

    pub fn with_param(message: String, error_type: String, param: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: Some(param),
                code: None,
            },
        }
    }
}
