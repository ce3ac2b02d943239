pub mod locks;
pub mod messages;
pub mod models;
pub mod ports;
#[cfg(test)]
mod tests;

use crate::permission::{self, AccessDecision, Actor, CommandGate};
use locks::UserLocks;
pub use messages::Messages;
pub use models::*;
pub use ports::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registration and approval workflow for organization memberships
pub struct MembershipService {
    repository: Arc<dyn MembershipRepository>,
    messages: Messages,
    locks: UserLocks,
}

impl MembershipService {
    pub fn new(repository: Arc<dyn MembershipRepository>, messages: Messages) -> Self {
        Self {
            repository,
            messages,
            locks: UserLocks::new(),
        }
    }

    /// First contact: create the user and ask for a display name
    pub async fn onboard(
        &self,
        user_id: UserId,
        gateway: &dyn PlatformGateway,
    ) -> Result<(), MembershipError> {
        let _guard = self.locks.lock(user_id).await;
        self.repository.add_user(user_id).await?;
        info!(user_id = %user_id, "User onboarded");

        gateway
            .direct_message(user_id, &self.messages.name_query())
            .await?;
        Ok(())
    }

    /// Free-text reply from a user: captures the nickname first, then the organization
    pub async fn handle_direct_message(
        &self,
        user_id: UserId,
        content: &str,
        gateway: &dyn PlatformGateway,
    ) -> Result<DirectMessageOutcome, MembershipError> {
        let _guard = self.locks.lock(user_id).await;
        let mut user = self.repository.get_user(user_id).await?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(DirectMessageOutcome::Ignored);
        }
        if self.messages.is_command(content) {
            debug!(user_id = %user_id, "Ignoring command sent as direct message");
            return Ok(DirectMessageOutcome::Ignored);
        }

        if user.is_awaiting_nickname() {
            user.set_nickname(content);
            self.repository.update_user(&mut user).await?;
            info!(user_id = %user_id, "Nickname captured");

            let names = self.repository.get_org_names().await?;
            gateway
                .direct_message(user_id, &self.messages.organization_query(&names))
                .await?;
            return Ok(DirectMessageOutcome::NicknameCaptured {
                nickname: content.to_string(),
            });
        }

        if user.has_memberships() {
            debug!(user_id = %user_id, "Ignoring message from user with memberships");
            return Ok(DirectMessageOutcome::Ignored);
        }

        let Some(organization) = self.repository.get_org_by_name(content).await? else {
            debug!(user_id = %user_id, name = content, "Unknown organization selected");
            let names = self.repository.get_org_names().await?;
            gateway
                .direct_message(user_id, &self.messages.unknown_organization(content))
                .await?;
            gateway
                .direct_message(user_id, &self.messages.organization_query(&names))
                .await?;
            return Ok(DirectMessageOutcome::UnknownOrganization {
                name: content.to_string(),
            });
        };

        user.add_membership(Membership::request(organization.clone()))?;
        self.repository.update_user(&mut user).await?;
        info!(
            user_id = %user_id,
            org_id = %organization.id(),
            "Membership requested"
        );

        let nickname = user.nickname().unwrap_or_default();
        gateway
            .notify_admins(&self.messages.pending_registration(
                user_id,
                nickname,
                organization.id(),
            ))
            .await?;
        gateway
            .direct_message(
                user_id,
                &self
                    .messages
                    .awaiting_approval(nickname, organization.name()),
            )
            .await?;

        Ok(DirectMessageOutcome::RequestSubmitted { organization })
    }

    /// Activate the user's pending membership
    pub async fn approve(
        &self,
        actor: &Actor,
        user_id: UserId,
        gateway: &dyn PlatformGateway,
    ) -> Result<Membership, MembershipError> {
        self.ensure_command_gate(actor, CommandGate::Moderator).await?;

        let _guard = self.locks.lock(user_id).await;
        let mut user = self.repository.get_user(user_id).await?;
        let organization = Self::pending_organization(&user)?;
        self.ensure_author_permissions(actor, user_id, organization.id())
            .await?;

        let membership = user
            .pending_membership_mut()
            .ok_or(MembershipError::PreconditionFailed {
                user_id,
                reason: Precondition::NoPendingRequest,
            })?;
        membership.set_permission_level(PermissionLevel::Member);
        let approved = membership.clone();
        self.repository.update_user(&mut user).await?;
        info!(
            user_id = %user_id,
            org_id = %organization.id(),
            actor_id = %actor.id,
            "Membership approved"
        );

        if let Some(nickname) = user.nickname() {
            gateway.set_nickname(user_id, nickname).await?;
        }
        gateway.grant_role(user_id, organization.id()).await?;
        gateway
            .notify_admins(&self.messages.user_approved(user_id, organization.id()))
            .await?;
        gateway
            .direct_message(user_id, &self.messages.approved_dm(organization.name()))
            .await?;

        Ok(approved)
    }

    /// Discard the applicant entirely, including any other memberships it holds
    pub async fn reject(
        &self,
        actor: &Actor,
        user_id: UserId,
        gateway: &dyn PlatformGateway,
    ) -> Result<Organization, MembershipError> {
        self.ensure_command_gate(actor, CommandGate::Moderator).await?;

        let _guard = self.locks.lock(user_id).await;
        let user = self.repository.get_user(user_id).await?;
        let organization = Self::pending_organization(&user)?;
        self.ensure_author_permissions(actor, user_id, organization.id())
            .await?;

        self.repository.delete_user(&user).await?;
        info!(
            user_id = %user_id,
            org_id = %organization.id(),
            actor_id = %actor.id,
            "Membership request rejected, user removed"
        );

        gateway
            .notify_admins(&self.messages.user_rejected(user_id, organization.id()))
            .await?;
        gateway
            .direct_message(user_id, &self.messages.rejected_dm(organization.name()))
            .await?;

        Ok(organization)
    }

    /// Start registration over from a blank user
    pub async fn retry(
        &self,
        user_id: UserId,
        gateway: &dyn PlatformGateway,
    ) -> Result<(), MembershipError> {
        let _guard = self.locks.lock(user_id).await;
        let user = self.repository.get_user(user_id).await?;
        self.repository.delete_user(&user).await?;
        self.repository.add_user(user_id).await?;
        info!(user_id = %user_id, "Registration reset");

        gateway
            .direct_message(user_id, &self.messages.name_query())
            .await?;
        Ok(())
    }

    /// Add an active membership directly, skipping approval
    pub async fn add_member(
        &self,
        actor: &Actor,
        user_id: UserId,
        org_id: OrganizationId,
        gateway: &dyn PlatformGateway,
    ) -> Result<Membership, MembershipError> {
        self.ensure_command_gate(actor, CommandGate::Administrator)
            .await?;
        let organization = self.organization_by_id(org_id).await?;

        let _guard = self.locks.lock(user_id).await;
        let mut user = self.repository.get_user(user_id).await?;
        let membership = Membership::with_level(organization, PermissionLevel::Member);
        user.add_membership(membership.clone())?;
        self.repository.update_user(&mut user).await?;
        info!(user_id = %user_id, org_id = %org_id, actor_id = %actor.id, "Member added");

        gateway.grant_role(user_id, org_id).await?;
        Ok(membership)
    }

    /// Remove the user's membership in `org_id`
    pub async fn remove_member(
        &self,
        actor: &Actor,
        user_id: UserId,
        org_id: OrganizationId,
        gateway: &dyn PlatformGateway,
    ) -> Result<Membership, MembershipError> {
        self.ensure_command_gate(actor, CommandGate::Administrator)
            .await?;
        self.organization_by_id(org_id).await?;

        let _guard = self.locks.lock(user_id).await;
        let mut user = self.repository.get_user(user_id).await?;
        let membership =
            user.remove_membership(org_id)
                .ok_or(MembershipError::PreconditionFailed {
                    user_id,
                    reason: Precondition::NotAMember(org_id),
                })?;
        self.repository.delete_user_org(&membership, user_id).await?;
        info!(user_id = %user_id, org_id = %org_id, actor_id = %actor.id, "Member removed");

        gateway.revoke_role(user_id, org_id).await?;
        Ok(membership)
    }

    /// Set the level of an existing membership and update channel access
    pub async fn grant_permission(
        &self,
        actor: &Actor,
        user_id: UserId,
        org_id: OrganizationId,
        level: PermissionLevel,
        gateway: &dyn PlatformGateway,
    ) -> Result<AccessDecision, MembershipError> {
        self.ensure_command_gate(actor, CommandGate::Administrator)
            .await?;
        if !level.is_active() {
            return Err(MembershipError::InvalidPermissionLevel(level.to_string()));
        }
        self.organization_by_id(org_id).await?;

        let _guard = self.locks.lock(user_id).await;
        let mut user = self.repository.get_user(user_id).await?;
        let other_levels: Vec<PermissionLevel> = user
            .memberships()
            .iter()
            .filter(|m| m.organization().id() != org_id)
            .map(|m| m.permission_level())
            .collect();

        let membership =
            user.membership_for_mut(org_id)
                .ok_or(MembershipError::PreconditionFailed {
                    user_id,
                    reason: Precondition::NotAMember(org_id),
                })?;
        membership.set_permission_level(level);
        self.repository.update_user(&mut user).await?;

        let decision = permission::resolve(level, &other_levels);
        info!(
            user_id = %user_id,
            org_id = %org_id,
            level = %level,
            effective_level = %decision.effective_level,
            "Permission level updated"
        );

        gateway
            .set_channel_access(user_id, decision.channel_access)
            .await?;
        Ok(decision)
    }

    /// Register an organization whose platform role already exists
    pub async fn add_organization(
        &self,
        actor: &Actor,
        org_id: OrganizationId,
        name: &str,
    ) -> Result<Organization, MembershipError> {
        self.ensure_command_gate(actor, CommandGate::Administrator)
            .await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(MembershipError::InvalidOrganizationName(name.to_string()));
        }
        if self.repository.org_exists(name).await? {
            return Err(MembershipError::OrganizationExists(name.to_string()));
        }
        if let Some(existing) = self.repository.get_org_by_id(org_id).await? {
            warn!(org_id = %org_id, existing = existing.name(), "Organization role already in use");
            return Err(MembershipError::OrganizationExists(existing.name().to_string()));
        }

        let organization = Organization::new(org_id, name);
        self.repository.add_org(&organization).await?;
        info!(org_id = %org_id, name, actor_id = %actor.id, "Organization added");
        Ok(organization)
    }

    pub async fn organization_names(&self) -> Result<Vec<String>, MembershipError> {
        Ok(self.repository.get_org_names().await?)
    }

    /// Name of the organization backed by the platform role `role_id`
    pub async fn organization_name_for_role(
        &self,
        role_id: OrganizationId,
    ) -> Result<Option<String>, MembershipError> {
        Ok(self
            .repository
            .get_org_by_id(role_id)
            .await?
            .map(|org| org.name().to_string()))
    }

    /// Current view of a user. Like the repository lookup, this creates unknown users.
    pub async fn user(&self, user_id: UserId) -> Result<User, MembershipError> {
        Ok(self.repository.get_user(user_id).await?)
    }

    async fn organization_by_id(
        &self,
        org_id: OrganizationId,
    ) -> Result<Organization, MembershipError> {
        self.repository
            .get_org_by_id(org_id)
            .await?
            .ok_or_else(|| MembershipError::OrganizationNotFound(org_id.to_string()))
    }

    fn pending_organization(user: &User) -> Result<Organization, MembershipError> {
        match user.pending_membership() {
            Some(membership) => Ok(membership.organization().clone()),
            None => Err(MembershipError::PreconditionFailed {
                user_id: user.id(),
                reason: if user.has_memberships() {
                    Precondition::AlreadyApproved
                } else {
                    Precondition::NoPendingRequest
                },
            }),
        }
    }

    async fn ensure_command_gate(
        &self,
        actor: &Actor,
        gate: CommandGate,
    ) -> Result<(), MembershipError> {
        if actor.is_administrator {
            return Ok(());
        }
        let actor_user = self.repository.get_user(actor.id).await?;
        if gate.allows(actor, &actor_user) {
            return Ok(());
        }
        warn!(actor_id = %actor.id, required = %gate, "Command gate denied");
        Err(MembershipError::InsufficientRole {
            actor_id: actor.id,
            required: gate,
        })
    }

    async fn ensure_author_permissions(
        &self,
        actor: &Actor,
        user_id: UserId,
        org_id: OrganizationId,
    ) -> Result<(), MembershipError> {
        if actor.is_administrator {
            return Ok(());
        }
        let actor_user = self.repository.get_user(actor.id).await?;
        if permission::ensure_author_permissions(actor, &actor_user, org_id) {
            return Ok(());
        }
        warn!(
            user_id = %user_id,
            org_id = %org_id,
            actor_id = %actor.id,
            "Review denied"
        );
        Err(MembershipError::AuthorizationDenied {
            user_id,
            org_id,
            actor_id: actor.id,
        })
    }
}
