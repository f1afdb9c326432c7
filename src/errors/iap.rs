//! Plan, deployment and ownership error types
//!
//! # Examples
//!
//! ```rust
//! use invenira::errors::IapError;
//!
//! let err = IapError::InvalidEdges(vec![(1, 9)]);
//! assert_eq!(err.http_status_code(), 400);
//! assert_eq!(err.error_code(), "INVALID_EDGES");
//! ```

use thiserror::Error;

use super::{CoreError, CoreErrorKind};

/// Errors raised by the IAP, activity and deployment services
#[derive(Error, Debug)]
pub enum IapError {
    /// Edges whose source or target is not a node of the plan
    #[error("Edges reference non-existent nodes")]
    InvalidEdges(Vec<(i32, i32)>),

    /// Node list or edge list could not be parsed
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Caller does not own the plan
    #[error("Unauthorized: Not the IAP owner")]
    NotIapOwner,

    /// Caller does not own the activity
    #[error("Unauthorized: Not the activity owner")]
    NotActivityOwner,

    /// Caller has no link to the plan
    #[error("User doesn't have access to this IAP")]
    NoIapAccess,

    /// Caller has no link to the activity
    #[error("User doesn't have access to this activity")]
    NoActivityAccess,

    /// Plan was already deployed
    #[error("IAP is already deployed")]
    IapAlreadyDeployed,

    /// Activity was already deployed
    #[error("Activity is already deployed")]
    ActivityAlreadyDeployed,

    /// Caller already owns what they try to add
    #[error("User is already the owner of this {0}")]
    AlreadyOwner(&'static str),

    /// Caller already linked what they try to add
    #[error("{0} already added to user")]
    AlreadyAdded(&'static str),

    /// Score outside 0..=100
    #[error("Score must be between 0 and 100")]
    ScoreOutOfRange(i32),

    /// Analytics name already used on the activity
    #[error("Analytics '{0}' already exists on this activity")]
    DuplicateAnalytics(String),

    /// Deployment request rejected
    #[error("Invalid deployment: {0}")]
    InvalidDeployment(String),

    /// Activity is not part of the deployment
    #[error("Activity {activity_id} is not part of deployed IAP {deployed_iap_id}")]
    ActivityNotInDeployment {
        /// Deployed IAP identifier
        deployed_iap_id: i32,
        /// Activity identifier
        activity_id: i32,
    },
}

impl IapError {
    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            IapError::NotIapOwner
            | IapError::NotActivityOwner
            | IapError::NoIapAccess
            | IapError::NoActivityAccess => 403,
            _ => 400,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            IapError::InvalidEdges(_) => "INVALID_EDGES",
            IapError::InvalidGraph(_) => "INVALID_GRAPH",
            IapError::NotIapOwner => "NOT_IAP_OWNER",
            IapError::NotActivityOwner => "NOT_ACTIVITY_OWNER",
            IapError::NoIapAccess => "NO_IAP_ACCESS",
            IapError::NoActivityAccess => "NO_ACTIVITY_ACCESS",
            IapError::IapAlreadyDeployed => "IAP_ALREADY_DEPLOYED",
            IapError::ActivityAlreadyDeployed => "ACTIVITY_ALREADY_DEPLOYED",
            IapError::AlreadyOwner(_) => "ALREADY_OWNER",
            IapError::AlreadyAdded(_) => "ALREADY_ADDED",
            IapError::ScoreOutOfRange(_) => "SCORE_OUT_OF_RANGE",
            IapError::DuplicateAnalytics(_) => "DUPLICATE_ANALYTICS",
            IapError::InvalidDeployment(_) => "INVALID_DEPLOYMENT",
            IapError::ActivityNotInDeployment { .. } => "ACTIVITY_NOT_IN_DEPLOYMENT",
        }
    }
}

impl From<IapError> for CoreError {
    fn from(err: IapError) -> Self {
        let kind = if err.http_status_code() == 403 {
            CoreErrorKind::Forbidden
        } else {
            CoreErrorKind::Validation
        };
        let mut core = CoreError::new(kind, err.to_string()).with_code(err.error_code());

        if let IapError::InvalidEdges(edges) = &err {
            let listed = edges
                .iter()
                .map(|(source, target)| format!("{}->{}", source, target))
                .collect::<Vec<_>>()
                .join(",");
            let mut fields = std::collections::BTreeMap::new();
            fields.insert("edges".to_string(), listed);
            core = core.with_fields(fields);
        }

        core
    }
}
