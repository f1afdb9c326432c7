pub mod activity_connection_service;
pub mod activity_service;
pub mod analytics_service;
pub mod auth_service;
pub mod authorization;
pub mod deployed_iap_service;
pub mod iap_service;
pub mod progress_service;
pub mod user_service;
pub mod validation;

pub use activity_connection_service::ActivityConnectionService;
pub use activity_service::{ActivityFilter, ActivityInput, ActivityService};
pub use analytics_service::{ActivityAnalytics, AnalyticsService, IapAnalytics};
pub use auth_service::AuthService;
pub use authorization::AuthorizationService;
pub use deployed_iap_service::{DeployedIapService, DeployedIapView, UserStatistics};
pub use iap_service::{DeployRequest, IapFilter, IapInput, IapService, ObjectiveInput};
pub use progress_service::{ActivityScore, ObjectiveProgress, ProgressAck, ProgressService};
pub use user_service::{UserService, UserUpdate};
pub use validation::ValidationService;
