pub mod gateway;
pub mod models;
pub mod routes;

pub use routes::api::{build_api_router, AppState};

use config::{LoggingConfig, RegistrationConfig};
use services::membership::{MembershipRepository, MembershipService, Messages};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Build the membership workflow on top of a repository
pub fn init_membership_service(
    repository: Arc<dyn MembershipRepository>,
    registration: &RegistrationConfig,
) -> Arc<MembershipService> {
    let messages = Messages::new(
        registration.community_name.clone(),
        registration.command_prefix.clone(),
    );
    Arc::new(MembershipService::new(repository, messages))
}

/// Install the global tracing subscriber described by `logging_config`
pub fn init_tracing(logging_config: &LoggingConfig) {
    let filter = EnvFilter::try_new(logging_config.filter_directive())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
