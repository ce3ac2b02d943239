//! Access decisions derived from membership levels.
//!
//! Everything here is pure: callers load the users involved and pass them in.

use crate::membership::models::{OrganizationId, PermissionLevel, User, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The user on whose behalf a command runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    /// Holds the platform-wide administrator permission
    #[serde(default)]
    pub is_administrator: bool,
}

impl Actor {
    pub fn new(id: UserId, is_administrator: bool) -> Self {
        Self {
            id,
            is_administrator,
        }
    }
}

/// Explicit grant applied to the gated administrative channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelAccess {
    ReadWrite,
    /// No explicit grant; channel defaults apply
    Default,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessDecision {
    pub effective_level: PermissionLevel,
    pub channel_access: ChannelAccess,
}

/// Effective access after assigning `new_level` in one organization while the
/// user keeps `other_levels` elsewhere.
pub fn resolve(new_level: PermissionLevel, other_levels: &[PermissionLevel]) -> AccessDecision {
    let effective_level = other_levels
        .iter()
        .copied()
        .fold(new_level, PermissionLevel::max);

    let channel_access = if effective_level >= PermissionLevel::Moderator {
        ChannelAccess::ReadWrite
    } else {
        ChannelAccess::Default
    };

    AccessDecision {
        effective_level,
        channel_access,
    }
}

/// Coarse role check applied before a command runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandGate {
    /// Level 2 or above in any organization
    Moderator,
    /// Level 3 in any organization
    Administrator,
}

impl CommandGate {
    pub fn allows(self, actor: &Actor, actor_user: &User) -> bool {
        if actor.is_administrator {
            return true;
        }
        let required = match self {
            CommandGate::Moderator => PermissionLevel::Moderator,
            CommandGate::Administrator => PermissionLevel::Admin,
        };
        actor_user
            .highest_level()
            .is_some_and(|level| level >= required)
    }
}

impl fmt::Display for CommandGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandGate::Moderator => write!(f, "moderator"),
            CommandGate::Administrator => write!(f, "administrator"),
        }
    }
}

/// Whether `actor` may approve or reject requests for `organization_id`
pub fn ensure_author_permissions(
    actor: &Actor,
    actor_user: &User,
    organization_id: OrganizationId,
) -> bool {
    if actor.is_administrator {
        return true;
    }
    actor_user
        .membership_for(organization_id)
        .is_some_and(|m| m.permission_level() >= PermissionLevel::Moderator)
}
