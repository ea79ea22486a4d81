//! Error types for the campaign core

use thiserror::Error;

/// Fatal errors raised at the state boundary.
///
/// Phase-internal anomalies are skipped and counted in reports instead of
/// surfacing here. Anything that does surface means the caller must
/// discard the attempt rather than continue with partial state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("unknown top-level state key: {0}")]
    UnknownTopLevelKey(String),

    #[error("derived state must not be persisted: {0}")]
    DerivedKeyPersisted(String),

    #[error("state document must be a JSON object")]
    NotAnObject,

    #[error("state shape invalid: {}", .0.join("; "))]
    InvalidShape(Vec<String>),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Top-level errors for scenario loading and the demo binaries.
#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CampaignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_shape_joins_problems() {
        let err = StateError::InvalidShape(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "state shape invalid: first; second");
    }

    #[test]
    fn test_state_error_converts_to_campaign_error() {
        let err: CampaignError = StateError::NotAnObject.into();
        assert!(matches!(err, CampaignError::State(_)));
    }
}
