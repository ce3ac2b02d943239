// In-memory doubles for the membership ports
#![cfg(any(test, feature = "test-mocks"))]

use crate::{
    common::RepositoryError,
    membership::{
        GatewayError, Membership, MembershipRepository, MutationState, Organization,
        OrganizationId, PermissionLevel, PlatformGateway, User, UserId,
    },
    permission::ChannelAccess,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    orgs: BTreeMap<OrganizationId, String>,
    users: BTreeMap<UserId, Option<String>>,
    memberships: BTreeMap<(UserId, OrganizationId), PermissionLevel>,
}

/// Repository keeping rows in ordered maps, with a write counter and
/// switchable failure for error-path tests
#[derive(Default)]
pub struct InMemoryMembershipRepository {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orgs(orgs: &[(i64, &str)]) -> Self {
        let repo = Self::new();
        {
            let mut tables = repo.tables.lock().unwrap();
            for (id, name) in orgs {
                tables.orgs.insert(OrganizationId(*id), name.to_string());
            }
        }
        repo
    }

    /// Seed a stored user holding the given memberships
    pub fn seed_user(&self, id: i64, nickname: Option<&str>, memberships: &[(i64, PermissionLevel)]) {
        let mut tables = self.tables.lock().unwrap();
        tables
            .users
            .insert(UserId(id), nickname.map(str::to_string));
        for (org_id, level) in memberships {
            tables
                .memberships
                .insert((UserId(id), OrganizationId(*org_id)), *level);
        }
    }

    /// Total statements written by `update_user`, `add_org` and the deletes
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains_user(&self, id: i64) -> bool {
        self.tables.lock().unwrap().users.contains_key(&UserId(id))
    }

    pub fn stored_nickname(&self, id: i64) -> Option<String> {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&UserId(id))
            .cloned()
            .flatten()
    }

    pub fn stored_level(&self, user_id: i64, org_id: i64) -> Option<PermissionLevel> {
        self.tables
            .lock()
            .unwrap()
            .memberships
            .get(&(UserId(user_id), OrganizationId(org_id)))
            .copied()
    }

    /// Make every subsequent call fail with a connection error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed(
                "in-memory repository offline".to_string(),
            ));
        }
        Ok(())
    }

    fn load(tables: &Tables, id: UserId) -> User {
        let nickname = tables.users.get(&id).cloned().flatten();
        let memberships = tables
            .memberships
            .range((id, OrganizationId(i64::MIN))..=(id, OrganizationId(i64::MAX)))
            .filter_map(|((_, org_id), level)| {
                let name = tables.orgs.get(org_id)?;
                Some(Membership::from_storage(
                    Organization::new(*org_id, name.clone()),
                    *level,
                ))
            })
            .collect();
        User::from_storage(id, nickname, memberships)
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn add_user(&self, id: UserId) -> Result<(), RepositoryError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.users.contains_key(&id) {
            tables.users.insert(id, None);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.users.contains_key(&id) {
            tables.users.insert(id, None);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Self::load(&tables, id))
    }

    async fn update_user(&self, user: &mut User) -> Result<usize, RepositoryError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();

        for membership in user.memberships() {
            let org_id = membership.organization().id();
            if membership.mutation_state() != MutationState::Unchanged
                && !tables.orgs.contains_key(&org_id)
            {
                return Err(RepositoryError::ForeignKeyViolation(format!(
                    "organization {org_id}"
                )));
            }
            if membership.mutation_state() == MutationState::New
                && tables.memberships.contains_key(&(user.id(), org_id))
            {
                return Err(RepositoryError::AlreadyExists);
            }
        }

        let mut written = 0;
        if user.mutation_state() != MutationState::Unchanged {
            tables
                .users
                .insert(user.id(), user.nickname().map(str::to_string));
            written += 1;
        }
        for membership in user.memberships() {
            if membership.mutation_state() != MutationState::Unchanged {
                tables.memberships.insert(
                    (user.id(), membership.organization().id()),
                    membership.permission_level(),
                );
                written += 1;
            }
        }

        self.writes.fetch_add(written, Ordering::SeqCst);
        user.mark_persisted();
        Ok(written)
    }

    async fn delete_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        tables.users.remove(&user.id());
        tables
            .memberships
            .retain(|(user_id, _), _| *user_id != user.id());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_org_names(&self) -> Result<Vec<String>, RepositoryError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut names: Vec<String> = tables.orgs.values().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn org_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.orgs.values().any(|n| n == name))
    }

    async fn add_org(&self, org: &Organization) -> Result<(), RepositoryError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.orgs.contains_key(&org.id()) || tables.orgs.values().any(|n| n == org.name()) {
            return Err(RepositoryError::AlreadyExists);
        }
        tables.orgs.insert(org.id(), org.name().to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_org_by_id(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orgs
            .get(&id)
            .map(|name| Organization::new(id, name.clone())))
    }

    async fn get_org_by_name(&self, name: &str) -> Result<Option<Organization>, RepositoryError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orgs
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, n)| Organization::new(*id, n.clone())))
    }

    async fn delete_user_org(
        &self,
        membership: &Membership,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        tables
            .memberships
            .remove(&(user_id, membership.organization().id()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    NotifyAdmins(String),
    DirectMessage(UserId, String),
    GrantRole(UserId, OrganizationId),
    RevokeRole(UserId, OrganizationId),
    SetNickname(UserId, String),
    SetChannelAccess(UserId, ChannelAccess),
}

/// A gateway that records every requested side effect
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn role_grants(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::GrantRole(..)))
    }

    pub fn admin_notifications(&self) -> usize {
        self.count(|c| matches!(c, GatewayCall::NotifyAdmins(_)))
    }

    pub fn direct_messages_to(&self, user_id: UserId) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                GatewayCall::DirectMessage(id, text) if *id == user_id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl PlatformGateway for RecordingGateway {
    async fn notify_admins(&self, text: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::NotifyAdmins(text.to_string()))
    }

    async fn direct_message(&self, user_id: UserId, text: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::DirectMessage(user_id, text.to_string()))
    }

    async fn grant_role(
        &self,
        user_id: UserId,
        org_id: OrganizationId,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::GrantRole(user_id, org_id))
    }

    async fn revoke_role(
        &self,
        user_id: UserId,
        org_id: OrganizationId,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::RevokeRole(user_id, org_id))
    }

    async fn set_nickname(&self, user_id: UserId, name: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::SetNickname(user_id, name.to_string()))
    }

    async fn set_channel_access(
        &self,
        user_id: UserId,
        access: ChannelAccess,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::SetChannelAccess(user_id, access))
    }
}
