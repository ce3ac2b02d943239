pub mod membership;
pub mod utils;

pub use membership::PgMembershipRepository;
