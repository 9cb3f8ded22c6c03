//! Precondition violations of the binding and routing core.

use crate::shapes::ElementId;
use thiserror::Error;

/// Binding and routing errors.
///
/// These never escape the public operations in release builds; they are
/// turned into "nothing changed".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectorError {
    #[error("Connector has fewer than two points")]
    SinglePointConnector,
    #[error("Both endpoints of an elbow connector cannot be dragged at once")]
    BothElbowEndpointsDragged,
    #[error("Fixed segment {index} is not axis-aligned")]
    NonOrthogonalFixedSegment { index: usize },
    #[error("Elbow connector points are not orthogonal")]
    InvalidElbowPoints,
    #[error("Element not found: {0}")]
    MissingElement(ElementId),
}

/// Result type for binding and routing operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Check a precondition: panics in debug builds, logs and returns the error otherwise.
pub fn invariant(cond: bool, err: ConnectorError) -> ConnectorResult<()> {
    if cond {
        return Ok(());
    }
    debug_assert!(cond, "{err}");
    log::error!("invariant violated: {err}");
    Err(err)
}
