//! Domain error types.
//!
//! These errors represent invalid construction of domain values. They are
//! distinct from provider (IO) failures and from query validation errors.

use super::ConnectionId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Path has no legs
    #[error("path must have at least one leg")]
    EmptyPath,

    /// Leg has no steps
    #[error("leg must have at least one step")]
    EmptyLeg,

    /// A step does not start where the previous one stopped
    #[error("steps are not contiguous: {0} does not meet {1}")]
    NotContiguous(String, String),

    /// Tile coordinate outside the slippy-map grid
    #[error("invalid tile coordinate: {0}")]
    InvalidTile(String),

    /// Connection that cannot be scanned
    #[error("malformed connection {0}: {1}")]
    MalformedConnection(ConnectionId, &'static str),
}
