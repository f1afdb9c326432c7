pub mod activities;
pub mod analytics;
pub mod connections;
pub mod deployed_iaps;
pub mod health;
pub mod iaps;
pub mod progress;
pub mod users;
