pub mod activities;
pub mod activity_connections;
pub mod analytics;
pub mod deployed_iap_activities;
pub mod deployed_iaps;
pub mod iap_ownership;
pub mod iaps;
pub mod objective_analytics;
pub mod objectives;
pub mod scores;
pub mod user_sessions;
pub mod users;
pub mod users_activities;
