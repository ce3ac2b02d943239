//! Unit tests for MembershipService

use super::*;
use crate::common::RepositoryError;
use crate::permission::ChannelAccess;
use crate::test_utils::{GatewayCall, InMemoryMembershipRepository, RecordingGateway};
use PermissionLevel::*;

const ALPHA: OrganizationId = OrganizationId(1);
const BETA: OrganizationId = OrganizationId(2);
const APPLICANT: UserId = UserId(20);

fn setup() -> (Arc<InMemoryMembershipRepository>, MembershipService) {
    let repo = Arc::new(InMemoryMembershipRepository::with_orgs(&[
        (1, "Alpha"),
        (2, "Beta"),
    ]));
    let service = MembershipService::new(repo.clone(), Messages::new("Guild", ";;"));
    (repo, service)
}

fn actor(id: i64) -> Actor {
    Actor::new(UserId(id), false)
}

fn global_admin() -> Actor {
    Actor::new(UserId(1), true)
}

#[tokio::test]
async fn test_registration_dialogue() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();

    service.onboard(APPLICANT, &gateway).await.unwrap();
    assert!(repo.contains_user(20));
    assert_eq!(
        gateway.direct_messages_to(APPLICANT),
        vec![Messages::new("Guild", ";;").name_query()]
    );

    let outcome = service
        .handle_direct_message(APPLICANT, "  Ada ", &gateway)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DirectMessageOutcome::NicknameCaptured {
            nickname: "Ada".to_string()
        }
    );
    assert_eq!(repo.stored_nickname(20), Some("Ada".to_string()));
    assert!(gateway.direct_messages_to(APPLICANT)[1].ends_with("Alpha\nBeta"));

    let outcome = service
        .handle_direct_message(APPLICANT, "Gamma", &gateway)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DirectMessageOutcome::UnknownOrganization {
            name: "Gamma".to_string()
        }
    );
    assert_eq!(gateway.direct_messages_to(APPLICANT).len(), 4);
    assert_eq!(gateway.admin_notifications(), 0);

    let outcome = service
        .handle_direct_message(APPLICANT, "Beta", &gateway)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DirectMessageOutcome::RequestSubmitted {
            organization: Organization::new(BETA, "Beta")
        }
    );
    assert_eq!(repo.stored_level(20, 2), Some(Pending));
    assert_eq!(gateway.admin_notifications(), 1);

    let outcome = service
        .handle_direct_message(APPLICANT, "Alpha", &gateway)
        .await
        .unwrap();
    assert_eq!(outcome, DirectMessageOutcome::Ignored);
    assert_eq!(repo.stored_level(20, 1), None);
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();

    let outcome = service
        .handle_direct_message(APPLICANT, "   ", &gateway)
        .await
        .unwrap();
    assert_eq!(outcome, DirectMessageOutcome::Ignored);
    assert_eq!(repo.stored_nickname(20), None);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_prefixed_message_is_not_dialogue_input() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    service.onboard(APPLICANT, &gateway).await.unwrap();

    let outcome = service
        .handle_direct_message(APPLICANT, ";;retry", &gateway)
        .await
        .unwrap();
    assert_eq!(outcome, DirectMessageOutcome::Ignored);
    assert_eq!(repo.stored_nickname(20), None);
    assert_eq!(gateway.direct_messages_to(APPLICANT).len(), 1);
}

#[tokio::test]
async fn test_approve_requires_moderator_role() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(10, Some("Mem"), &[(1, Member)]);
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);

    let result = service.approve(&actor(10), APPLICANT, &gateway).await;
    assert!(matches!(
        result,
        Err(MembershipError::InsufficientRole {
            actor_id: UserId(10),
            required: CommandGate::Moderator,
        })
    ));
    assert_eq!(repo.stored_level(20, 1), Some(Pending));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_moderator_approves_request_in_own_organization() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(10, Some("Mod"), &[(1, Moderator)]);
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);

    let membership = service.approve(&actor(10), APPLICANT, &gateway).await.unwrap();

    assert_eq!(membership.permission_level(), Member);
    assert_eq!(membership.organization().id(), ALPHA);
    assert_eq!(repo.stored_level(20, 1), Some(Member));
    assert_eq!(gateway.role_grants(), 1);
    assert_eq!(gateway.admin_notifications(), 1);
    assert!(gateway
        .calls()
        .contains(&GatewayCall::GrantRole(APPLICANT, ALPHA)));
    assert!(gateway
        .calls()
        .contains(&GatewayCall::SetNickname(APPLICANT, "Ada".to_string())));
    assert_eq!(gateway.direct_messages_to(APPLICANT).len(), 1);
}

#[tokio::test]
async fn test_moderator_of_other_organization_cannot_approve() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(10, Some("Mod"), &[(2, Admin)]);
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);

    let result = service.approve(&actor(10), APPLICANT, &gateway).await;
    assert!(matches!(
        result,
        Err(MembershipError::AuthorizationDenied {
            user_id: APPLICANT,
            org_id: ALPHA,
            actor_id: UserId(10),
        })
    ));
    assert_eq!(repo.stored_level(20, 1), Some(Pending));
    assert_eq!(gateway.role_grants(), 0);
}

#[tokio::test]
async fn test_approve_preconditions() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(20, Some("Ada"), &[]);
    repo.seed_user(21, Some("Bob"), &[(1, Member)]);

    let result = service.approve(&global_admin(), APPLICANT, &gateway).await;
    assert!(matches!(
        result,
        Err(MembershipError::PreconditionFailed {
            reason: Precondition::NoPendingRequest,
            ..
        })
    ));

    let result = service.approve(&global_admin(), UserId(21), &gateway).await;
    assert!(matches!(
        result,
        Err(MembershipError::PreconditionFailed {
            reason: Precondition::AlreadyApproved,
            ..
        })
    ));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_reject_removes_user() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);

    let organization = service
        .reject(&global_admin(), APPLICANT, &gateway)
        .await
        .unwrap();

    assert_eq!(organization.name(), "Alpha");
    assert!(!repo.contains_user(20));
    assert_eq!(repo.stored_level(20, 1), None);
    assert_eq!(gateway.admin_notifications(), 1);
    assert_eq!(gateway.role_grants(), 0);
    assert!(gateway.direct_messages_to(APPLICANT)[0].contains("`;;retry`"));
}

#[tokio::test]
async fn test_retry_starts_over() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);

    service.retry(APPLICANT, &gateway).await.unwrap();

    assert!(repo.contains_user(20));
    assert_eq!(repo.stored_nickname(20), None);
    assert_eq!(repo.stored_level(20, 1), None);
    assert_eq!(gateway.direct_messages_to(APPLICANT).len(), 1);
}

#[tokio::test]
async fn test_add_member() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(20, Some("Ada"), &[(1, Member)]);

    let result = service
        .add_member(&global_admin(), APPLICANT, OrganizationId(9), &gateway)
        .await;
    assert!(matches!(result, Err(MembershipError::OrganizationNotFound(_))));

    let result = service
        .add_member(&global_admin(), APPLICANT, ALPHA, &gateway)
        .await;
    assert!(matches!(
        result,
        Err(MembershipError::DuplicateMembership {
            user_id: APPLICANT,
            org_id: ALPHA,
        })
    ));

    let membership = service
        .add_member(&global_admin(), APPLICANT, BETA, &gateway)
        .await
        .unwrap();
    assert_eq!(membership.permission_level(), Member);
    assert_eq!(repo.stored_level(20, 2), Some(Member));
    assert_eq!(gateway.calls(), vec![GatewayCall::GrantRole(APPLICANT, BETA)]);
}

#[tokio::test]
async fn test_membership_commands_require_administrator() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(10, Some("Mod"), &[(1, Moderator)]);

    let result = service
        .add_member(&actor(10), APPLICANT, ALPHA, &gateway)
        .await;
    assert!(matches!(
        result,
        Err(MembershipError::InsufficientRole {
            required: CommandGate::Administrator,
            ..
        })
    ));

    let result = service
        .grant_permission(&actor(10), APPLICANT, ALPHA, Admin, &gateway)
        .await;
    assert!(matches!(result, Err(MembershipError::InsufficientRole { .. })));

    let result = service
        .add_organization(&actor(10), OrganizationId(3), "Gamma")
        .await;
    assert!(matches!(result, Err(MembershipError::InsufficientRole { .. })));
}

#[tokio::test]
async fn test_remove_member_targets_matching_organization() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(10, Some("Boss"), &[(1, Admin)]);
    repo.seed_user(20, Some("Ada"), &[(1, Member), (2, Member)]);

    let removed = service
        .remove_member(&actor(10), APPLICANT, BETA, &gateway)
        .await
        .unwrap();

    assert_eq!(removed.organization().id(), BETA);
    assert_eq!(repo.stored_level(20, 1), Some(Member));
    assert_eq!(repo.stored_level(20, 2), None);
    assert_eq!(gateway.calls(), vec![GatewayCall::RevokeRole(APPLICANT, BETA)]);

    let result = service
        .remove_member(&actor(10), APPLICANT, BETA, &gateway)
        .await;
    assert!(matches!(
        result,
        Err(MembershipError::PreconditionFailed {
            reason: Precondition::NotAMember(BETA),
            ..
        })
    ));
}

#[tokio::test]
async fn test_grant_permission_resolves_channel_access() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(20, Some("Ada"), &[(1, Member), (2, Moderator)]);

    let decision = service
        .grant_permission(&global_admin(), APPLICANT, ALPHA, Member, &gateway)
        .await
        .unwrap();
    assert_eq!(decision.effective_level, Moderator);
    assert_eq!(decision.channel_access, ChannelAccess::ReadWrite);

    let decision = service
        .grant_permission(&global_admin(), APPLICANT, BETA, Member, &gateway)
        .await
        .unwrap();
    assert_eq!(decision.effective_level, Member);
    assert_eq!(decision.channel_access, ChannelAccess::Default);
    assert_eq!(repo.stored_level(20, 2), Some(Member));

    let result = service
        .grant_permission(&global_admin(), APPLICANT, ALPHA, Pending, &gateway)
        .await;
    assert!(matches!(result, Err(MembershipError::InvalidPermissionLevel(_))));

    assert_eq!(
        gateway.calls(),
        vec![
            GatewayCall::SetChannelAccess(APPLICANT, ChannelAccess::ReadWrite),
            GatewayCall::SetChannelAccess(APPLICANT, ChannelAccess::Default),
        ]
    );
}

#[tokio::test]
async fn test_add_organization() {
    let (_repo, service) = setup();

    let organization = service
        .add_organization(&global_admin(), OrganizationId(3), " Gamma ")
        .await
        .unwrap();
    assert_eq!(organization.name(), "Gamma");
    assert_eq!(
        service.organization_names().await.unwrap(),
        vec!["Alpha", "Beta", "Gamma"]
    );
    assert_eq!(
        service
            .organization_name_for_role(OrganizationId(3))
            .await
            .unwrap(),
        Some("Gamma".to_string())
    );

    let result = service
        .add_organization(&global_admin(), OrganizationId(4), "Alpha")
        .await;
    assert!(matches!(result, Err(MembershipError::OrganizationExists(name)) if name == "Alpha"));

    let result = service
        .add_organization(&global_admin(), ALPHA, "Delta")
        .await;
    assert!(matches!(result, Err(MembershipError::OrganizationExists(name)) if name == "Alpha"));
    assert!(!service.organization_names().await.unwrap().contains(&"Delta".to_string()));
}

#[tokio::test]
async fn test_update_without_changes_writes_nothing() {
    let (repo, _service) = setup();
    repo.seed_user(20, Some("Ada"), &[(1, Member)]);

    let mut user = repo.get_user(APPLICANT).await.unwrap();
    assert_eq!(repo.update_user(&mut user).await.unwrap(), 0);

    user.set_nickname("Ada L.");
    assert_eq!(repo.update_user(&mut user).await.unwrap(), 1);
    assert_eq!(repo.update_user(&mut user).await.unwrap(), 0);
}

#[tokio::test]
async fn test_storage_failure_propagates() {
    let (repo, service) = setup();
    let gateway = RecordingGateway::new();
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);
    repo.set_failing(true);

    let result = service.approve(&global_admin(), APPLICANT, &gateway).await;
    assert!(matches!(
        result,
        Err(MembershipError::Storage(RepositoryError::ConnectionFailed(_)))
    ));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_failed_write_skips_side_effects() {
    let mut repo = MockMembershipRepository::new();
    repo.expect_get_user().returning(|id| {
        Ok(User::from_storage(
            id,
            Some("Ada".to_string()),
            vec![Membership::from_storage(
                Organization::new(ALPHA, "Alpha"),
                Pending,
            )],
        ))
    });
    repo.expect_update_user()
        .times(1)
        .returning(|_| Err(RepositoryError::TransactionConflict));

    let mut gateway = MockPlatformGateway::new();
    gateway.expect_grant_role().never();
    gateway.expect_notify_admins().never();

    let service = MembershipService::new(Arc::new(repo), Messages::new("Guild", ";;"));
    let result = service.approve(&global_admin(), APPLICANT, &gateway).await;
    assert!(matches!(
        result,
        Err(MembershipError::Storage(RepositoryError::TransactionConflict))
    ));
}

#[tokio::test]
async fn test_gateway_failure_is_reported_after_commit() {
    let (repo, service) = setup();
    repo.seed_user(20, Some("Ada"), &[(1, Pending)]);

    let mut gateway = MockPlatformGateway::new();
    gateway.expect_set_nickname().returning(|_, _| Ok(()));
    gateway
        .expect_grant_role()
        .times(1)
        .returning(|_, _| Err(GatewayError::Unavailable("timeout".to_string())));

    let result = service.approve(&global_admin(), APPLICANT, &gateway).await;
    assert!(matches!(result, Err(MembershipError::Gateway(_))));
    assert_eq!(repo.stored_level(20, 1), Some(Member));
}
