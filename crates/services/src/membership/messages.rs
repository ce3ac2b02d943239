use super::models::{OrganizationId, UserId};

/// Text sent to applicants and to the administrative channel
#[derive(Debug, Clone)]
pub struct Messages {
    community_name: String,
    command_prefix: String,
}

impl Messages {
    pub fn new(community_name: impl Into<String>, command_prefix: impl Into<String>) -> Self {
        Self {
            community_name: community_name.into(),
            command_prefix: command_prefix.into(),
        }
    }

    /// Whether `content` is a bot command rather than dialogue input
    pub fn is_command(&self, content: &str) -> bool {
        !self.command_prefix.is_empty() && content.starts_with(&self.command_prefix)
    }

    pub fn name_query(&self) -> String {
        format!(
            "Welcome to {}! Please reply with the name you want to be known by.",
            self.community_name
        )
    }

    pub fn organization_query(&self, names: &[String]) -> String {
        format!(
            "Which organization do you belong to? Reply with one of:\n{}",
            names.join("\n")
        )
    }

    pub fn unknown_organization(&self, name: &str) -> String {
        format!("There is no organization called '{name}'.")
    }

    pub fn pending_registration(
        &self,
        user_id: UserId,
        nickname: &str,
        org_id: OrganizationId,
    ) -> String {
        format!(
            "User {user_id} ({nickname}) wants to join organization {org_id}. \
             Use `{prefix}approve` or `{prefix}reject` to decide.",
            prefix = self.command_prefix
        )
    }

    pub fn awaiting_approval(&self, nickname: &str, org_name: &str) -> String {
        format!(
            "Thanks {nickname}! Your request to join {org_name} in {} is waiting for approval.\n\
             Made a mistake? Send `{}retry` to start over.",
            self.community_name, self.command_prefix
        )
    }

    pub fn user_approved(&self, user_id: UserId, org_id: OrganizationId) -> String {
        format!("User {user_id} approved to organization {org_id}.")
    }

    pub fn approved_dm(&self, org_name: &str) -> String {
        format!(
            "Your membership in {org_name} has been approved. Welcome to {}!",
            self.community_name
        )
    }

    pub fn user_rejected(&self, user_id: UserId, org_id: OrganizationId) -> String {
        format!("User {user_id} rejected from organization {org_id}.")
    }

    pub fn rejected_dm(&self, org_name: &str) -> String {
        format!(
            "Your request to join {org_name} in {} was rejected. Send `{}retry` to try again.",
            self.community_name, self.command_prefix
        )
    }
}
