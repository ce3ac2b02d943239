pub mod common;
pub mod membership;
pub mod permission;

pub use membership::{MembershipError, MembershipService, UserId};

#[cfg(any(test, feature = "test-mocks"))]
pub mod test_utils;
