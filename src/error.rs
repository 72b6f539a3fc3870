//! Error type for fallible store and edit operations.
//!
//! Lookups never produce these; a missing element is reported as `None`.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NetlistError {
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("via not found: {0}")]
    ViaNotFound(String),
    #[error("confirmed via not found: {0}")]
    ConfirmedViaNotFound(String),
    #[error("connector not found: {0}")]
    ConnectorNotFound(String),
    #[error("trace not found: {0}")]
    TraceNotFound(String),
    #[error("net not found: {0}")]
    NetNotFound(String),
    #[error("trace {id} needs at least 2 points, got {points}")]
    DegenerateTrace { id: String, points: usize },
    #[error("point index {index} out of range for trace {id} ({len} points)")]
    PointIndexOutOfRange { id: String, index: usize, len: usize },
    #[error("segment index {index} out of range for trace {id} ({len} segments)")]
    SegmentIndexOutOfRange { id: String, index: usize, len: usize },
}
