//! Entity model for organizations, users and their memberships.
//!
//! Mutable fields are private and every setter updates the owning record's
//! [`MutationState`]. The persistence layer reads that state to decide which
//! rows to write and calls `mark_persisted` once the writes are committed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Organization id. Equal to the id of the platform role backing the organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrganizationId(pub i64);

impl From<i64> for OrganizationId {
    fn from(id: i64) -> Self {
        OrganizationId(id)
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence status of an in-memory record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Not yet stored
    New,
    /// Stored, modified since it was loaded
    Changed,
    /// Matches the stored row
    Unchanged,
}

impl MutationState {
    fn touched(self) -> Self {
        match self {
            MutationState::New => MutationState::New,
            MutationState::Changed | MutationState::Unchanged => MutationState::Changed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    id: OrganizationId,
    name: String,
}

impl Organization {
    pub fn new(id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> OrganizationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Access tier a user holds within one organization
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(into = "i32", try_from = "i32")]
pub enum PermissionLevel {
    /// Requested, awaiting approval
    #[default]
    Pending,
    Member,
    Moderator,
    Admin,
}

impl PermissionLevel {
    pub fn as_i32(self) -> i32 {
        match self {
            PermissionLevel::Pending => 0,
            PermissionLevel::Member => 1,
            PermissionLevel::Moderator => 2,
            PermissionLevel::Admin => 3,
        }
    }

    pub fn is_active(self) -> bool {
        self != PermissionLevel::Pending
    }
}

impl From<PermissionLevel> for i32 {
    fn from(level: PermissionLevel) -> Self {
        level.as_i32()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission level '{0}'")]
pub struct InvalidPermissionLevel(pub String);

impl TryFrom<i32> for PermissionLevel {
    type Error = InvalidPermissionLevel;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PermissionLevel::Pending),
            1 => Ok(PermissionLevel::Member),
            2 => Ok(PermissionLevel::Moderator),
            3 => Ok(PermissionLevel::Admin),
            other => Err(InvalidPermissionLevel(other.to_string())),
        }
    }
}

/// Parses a grantable level: `1`..`3` or `user`, `moderator`, `admin` in any case.
impl FromStr for PermissionLevel {
    type Err = InvalidPermissionLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let level = match trimmed.parse::<i32>() {
            Ok(numeric) => PermissionLevel::try_from(numeric)
                .map_err(|_| InvalidPermissionLevel(trimmed.to_string()))?,
            Err(_) => match trimmed.to_lowercase().as_str() {
                "user" => PermissionLevel::Member,
                "moderator" => PermissionLevel::Moderator,
                "admin" => PermissionLevel::Admin,
                _ => return Err(InvalidPermissionLevel(trimmed.to_string())),
            },
        };

        if level == PermissionLevel::Pending {
            return Err(InvalidPermissionLevel(trimmed.to_string()));
        }
        Ok(level)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Pending => write!(f, "pending"),
            PermissionLevel::Member => write!(f, "user"),
            PermissionLevel::Moderator => write!(f, "moderator"),
            PermissionLevel::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    organization: Organization,
    permission_level: PermissionLevel,
    state: MutationState,
}

impl Membership {
    /// A join request: pending and not yet stored
    pub fn request(organization: Organization) -> Self {
        Self::with_level(organization, PermissionLevel::Pending)
    }

    pub fn with_level(organization: Organization, permission_level: PermissionLevel) -> Self {
        Self {
            organization,
            permission_level,
            state: MutationState::New,
        }
    }

    pub fn from_storage(organization: Organization, permission_level: PermissionLevel) -> Self {
        Self {
            organization,
            permission_level,
            state: MutationState::Unchanged,
        }
    }

    pub fn organization(&self) -> &Organization {
        &self.organization
    }

    pub fn permission_level(&self) -> PermissionLevel {
        self.permission_level
    }

    pub fn set_permission_level(&mut self, permission_level: PermissionLevel) {
        self.permission_level = permission_level;
        self.state = self.state.touched();
    }

    pub fn is_pending(&self) -> bool {
        self.permission_level == PermissionLevel::Pending
    }

    /// Read by the persistence layer only
    pub fn mutation_state(&self) -> MutationState {
        self.state
    }

    pub fn mark_persisted(&mut self) {
        self.state = MutationState::Unchanged;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user {user_id} already has a membership in organization {organization_id}")]
pub struct DuplicateMembership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    nickname: Option<String>,
    memberships: Vec<Membership>,
    state: MutationState,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            nickname: None,
            memberships: Vec::new(),
            state: MutationState::New,
        }
    }

    pub fn from_storage(id: UserId, nickname: Option<String>, memberships: Vec<Membership>) -> Self {
        Self {
            id,
            nickname,
            memberships,
            state: MutationState::Unchanged,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = Some(nickname.into());
        self.state = self.state.touched();
    }

    pub fn is_awaiting_nickname(&self) -> bool {
        self.nickname.is_none()
    }

    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }

    pub fn has_memberships(&self) -> bool {
        !self.memberships.is_empty()
    }

    pub fn membership_for(&self, organization_id: OrganizationId) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.organization.id == organization_id)
    }

    pub fn membership_for_mut(&mut self, organization_id: OrganizationId) -> Option<&mut Membership> {
        self.memberships
            .iter_mut()
            .find(|m| m.organization.id == organization_id)
    }

    pub fn pending_membership(&self) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.is_pending())
    }

    pub fn pending_membership_mut(&mut self) -> Option<&mut Membership> {
        self.memberships.iter_mut().find(|m| m.is_pending())
    }

    /// Attach a membership. At most one membership per organization.
    pub fn add_membership(&mut self, membership: Membership) -> Result<(), DuplicateMembership> {
        let organization_id = membership.organization.id;
        if self.membership_for(organization_id).is_some() {
            return Err(DuplicateMembership {
                user_id: self.id,
                organization_id,
            });
        }
        self.memberships.push(membership);
        Ok(())
    }

    /// Detach a membership from this view. The stored row is removed separately.
    pub fn remove_membership(&mut self, organization_id: OrganizationId) -> Option<Membership> {
        let index = self
            .memberships
            .iter()
            .position(|m| m.organization.id == organization_id)?;
        Some(self.memberships.remove(index))
    }

    pub fn highest_level(&self) -> Option<PermissionLevel> {
        self.memberships.iter().map(|m| m.permission_level).max()
    }

    /// Read by the persistence layer only
    pub fn mutation_state(&self) -> MutationState {
        self.state
    }

    /// Reset the user and all of its memberships to `Unchanged`
    pub fn mark_persisted(&mut self) {
        self.state = MutationState::Unchanged;
        for membership in &mut self.memberships {
            membership.mark_persisted();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(id: i64, name: &str) -> Organization {
        Organization::new(OrganizationId(id), name)
    }

    #[test]
    fn test_requested_membership_starts_pending_and_new() {
        let membership = Membership::request(org(1, "Alpha"));
        assert_eq!(membership.permission_level(), PermissionLevel::Pending);
        assert_eq!(membership.mutation_state(), MutationState::New);
    }

    #[test]
    fn test_setter_keeps_new_records_new() {
        let mut membership = Membership::request(org(1, "Alpha"));
        membership.set_permission_level(PermissionLevel::Member);
        assert_eq!(membership.mutation_state(), MutationState::New);

        let mut user = User::new(UserId(5));
        user.set_nickname("Ada");
        assert_eq!(user.mutation_state(), MutationState::New);
    }

    #[test]
    fn test_setter_marks_stored_records_changed() {
        let mut membership = Membership::from_storage(org(1, "Alpha"), PermissionLevel::Pending);
        membership.set_permission_level(PermissionLevel::Member);
        assert_eq!(membership.mutation_state(), MutationState::Changed);

        let mut user = User::from_storage(UserId(5), None, vec![]);
        user.set_nickname("Ada");
        assert_eq!(user.mutation_state(), MutationState::Changed);
        assert_eq!(user.nickname(), Some("Ada"));
    }

    #[test]
    fn test_mark_persisted_resets_whole_graph() {
        let mut user = User::from_storage(UserId(5), None, vec![]);
        user.set_nickname("Ada");
        user.add_membership(Membership::request(org(1, "Alpha")))
            .unwrap();

        user.mark_persisted();
        assert_eq!(user.mutation_state(), MutationState::Unchanged);
        assert!(user
            .memberships()
            .iter()
            .all(|m| m.mutation_state() == MutationState::Unchanged));
    }

    #[test]
    fn test_add_membership_rejects_duplicate_organization() {
        let mut user = User::from_storage(UserId(5), Some("Ada".into()), vec![]);
        user.add_membership(Membership::request(org(1, "Alpha")))
            .unwrap();

        let result = user.add_membership(Membership::with_level(
            org(1, "Alpha"),
            PermissionLevel::Member,
        ));
        assert_eq!(
            result,
            Err(DuplicateMembership {
                user_id: UserId(5),
                organization_id: OrganizationId(1),
            })
        );
        assert_eq!(user.memberships().len(), 1);
    }

    #[test]
    fn test_membership_queries() {
        let user = User::from_storage(
            UserId(5),
            Some("Ada".into()),
            vec![
                Membership::from_storage(org(1, "Alpha"), PermissionLevel::Moderator),
                Membership::from_storage(org(2, "Beta"), PermissionLevel::Pending),
            ],
        );

        assert_eq!(
            user.pending_membership().map(|m| m.organization().id()),
            Some(OrganizationId(2))
        );
        assert_eq!(user.highest_level(), Some(PermissionLevel::Moderator));
        assert!(user.membership_for(OrganizationId(3)).is_none());
    }

    #[test]
    fn test_remove_membership_by_organization() {
        let mut user = User::from_storage(
            UserId(5),
            Some("Ada".into()),
            vec![
                Membership::from_storage(org(1, "Alpha"), PermissionLevel::Member),
                Membership::from_storage(org(2, "Beta"), PermissionLevel::Member),
            ],
        );

        let removed = user.remove_membership(OrganizationId(2)).unwrap();
        assert_eq!(removed.organization().name(), "Beta");
        assert_eq!(user.memberships().len(), 1);
        assert!(user.remove_membership(OrganizationId(2)).is_none());
    }

    #[test]
    fn test_parse_permission_level() {
        assert_eq!("2".parse::<PermissionLevel>(), Ok(PermissionLevel::Moderator));
        assert_eq!("ADMIN".parse::<PermissionLevel>(), Ok(PermissionLevel::Admin));
        assert_eq!(" user ".parse::<PermissionLevel>(), Ok(PermissionLevel::Member));
        assert!("0".parse::<PermissionLevel>().is_err());
        assert!("4".parse::<PermissionLevel>().is_err());
        assert!("owner".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn test_permission_level_serializes_as_integer() {
        let json = serde_json::to_string(&PermissionLevel::Moderator).unwrap();
        assert_eq!(json, "2");
        let level: PermissionLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, PermissionLevel::Admin);
        assert!(serde_json::from_str::<PermissionLevel>("7").is_err());
    }
}
