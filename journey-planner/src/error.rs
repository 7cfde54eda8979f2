//! Errors surfaced by providers and planners.

use crate::domain::DomainError;

/// Failure reported by a data provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Fetching a resource failed
    #[error("failed to fetch {resource}: {message}")]
    Fetch { resource: String, message: String },

    /// Network data could not be loaded
    #[error("failed to load network: {0}")]
    Load(String),
}

/// Error from planning a query.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlannerError {
    /// Query is missing data, contradicts itself or names unknown locations
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Query names a profile nobody registered
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProviderError::Fetch {
            resource: "tile 14/8361/5481".into(),
            message: "timed out".into(),
        };
        assert_eq!(err.to_string(), "failed to fetch tile 14/8361/5481: timed out");

        let err = PlannerError::InvalidQuery("no origin".into());
        assert_eq!(err.to_string(), "invalid query: no origin");

        let err = PlannerError::UnknownProfile("bike".into());
        assert_eq!(err.to_string(), "unknown profile: bike");

        let err: PlannerError = ProviderError::Load("bad json".into()).into();
        assert_eq!(err.to_string(), "failed to load network: bad json");

        let err: PlannerError = DomainError::EmptyPath.into();
        assert_eq!(err.to_string(), "path must have at least one leg");
    }
}
