use super::models::{Membership, Organization, OrganizationId, User, UserId};
use crate::common::RepositoryError;
use crate::permission::{ChannelAccess, CommandGate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// Why a workflow step could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The user has no membership awaiting approval
    NoPendingRequest,
    /// The user's memberships are all active already
    AlreadyApproved,
    /// The user holds no membership in the organization
    NotAMember(OrganizationId),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::NoPendingRequest => write!(f, "no pending organization request"),
            Precondition::AlreadyApproved => write!(f, "request already approved"),
            Precondition::NotAMember(org_id) => {
                write!(f, "not a member of organization {org_id}")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("Precondition failed for user {user_id}: {reason}")]
    PreconditionFailed {
        user_id: UserId,
        reason: Precondition,
    },

    #[error("User {actor_id} may not review user {user_id} for organization {org_id}")]
    AuthorizationDenied {
        user_id: UserId,
        org_id: OrganizationId,
        actor_id: UserId,
    },

    #[error("User {actor_id} needs the {required} role for this command")]
    InsufficientRole {
        actor_id: UserId,
        required: CommandGate,
    },

    #[error("User {user_id} already has a membership in organization {org_id}")]
    DuplicateMembership {
        user_id: UserId,
        org_id: OrganizationId,
    },

    #[error("Organization '{0}' already exists")]
    OrganizationExists(String),

    #[error("Invalid organization name: '{0}'")]
    InvalidOrganizationName(String),

    #[error("Invalid permission level: {0}")]
    InvalidPermissionLevel(String),

    #[error("Failed to deliver platform side effect: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<super::models::DuplicateMembership> for MembershipError {
    fn from(err: super::models::DuplicateMembership) -> Self {
        MembershipError::DuplicateMembership {
            user_id: err.user_id,
            org_id: err.organization_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Platform rejected the request: {0}")]
    Rejected(String),

    #[error("Platform unreachable: {0}")]
    Unavailable(String),
}

/// Persistent storage of organizations, users and memberships.
///
/// Writes are derived from the mutation state carried by the entities, so a
/// caller only ever hands back the objects it loaded.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert a blank user. Does nothing if the user exists.
    async fn add_user(&self, id: UserId) -> Result<(), RepositoryError>;

    /// Load a user with its memberships, creating a blank user when absent
    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError>;

    /// Persist the changes tracked on `user` in one transaction.
    ///
    /// Returns the number of statements written; the user is marked
    /// persisted afterwards.
    async fn update_user(&self, user: &mut User) -> Result<usize, RepositoryError>;

    /// Delete the user row. Memberships are removed by cascade.
    async fn delete_user(&self, user: &User) -> Result<(), RepositoryError>;

    async fn get_org_names(&self) -> Result<Vec<String>, RepositoryError>;

    async fn org_exists(&self, name: &str) -> Result<bool, RepositoryError>;

    /// Insert an organization. Fails if the id or the name is taken.
    async fn add_org(&self, org: &Organization) -> Result<(), RepositoryError>;

    async fn get_org_by_id(&self, id: OrganizationId)
        -> Result<Option<Organization>, RepositoryError>;

    async fn get_org_by_name(&self, name: &str) -> Result<Option<Organization>, RepositoryError>;

    async fn delete_user_org(
        &self,
        membership: &Membership,
        user_id: UserId,
    ) -> Result<(), RepositoryError>;
}

/// Side effects the workflow requests from the chat platform
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Post to the administrative channel
    async fn notify_admins(&self, text: &str) -> Result<(), GatewayError>;

    async fn direct_message(&self, user_id: UserId, text: &str) -> Result<(), GatewayError>;

    async fn grant_role(&self, user_id: UserId, org_id: OrganizationId)
        -> Result<(), GatewayError>;

    async fn revoke_role(
        &self,
        user_id: UserId,
        org_id: OrganizationId,
    ) -> Result<(), GatewayError>;

    async fn set_nickname(&self, user_id: UserId, name: &str) -> Result<(), GatewayError>;

    async fn set_channel_access(
        &self,
        user_id: UserId,
        access: ChannelAccess,
    ) -> Result<(), GatewayError>;
}

/// Result of handling a free-text direct message from a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DirectMessageOutcome {
    NicknameCaptured { nickname: String },
    RequestSubmitted { organization: Organization },
    UnknownOrganization { name: String },
    /// Nothing to do for this user in its current state
    Ignored,
}
