pub mod api;
pub mod common;
pub mod health;
pub mod members;
pub mod organizations;
pub mod settings;
