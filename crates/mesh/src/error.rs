//! Error types for mesh operations.

use crate::snapshot::SnapshotError;

/// Errors that can occur while editing a mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// A dead id, an out-of-range parameter, or a vertex that is not an
    /// endpoint of the given edge
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request would break a topological invariant
    #[error("Invalid mesh topology: {0}")]
    InvalidTopology(String),

    #[error("Visit budget of {budget} exceeded")]
    BudgetExceeded { budget: usize },

    #[error("Mesh is corrupt: {count} problems, first: {first}")]
    CorruptState { count: usize, first: String },

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

pub type MeshResult<T> = Result<T, MeshError>;
