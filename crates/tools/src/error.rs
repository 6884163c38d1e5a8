//! Error types for tool invocation and the undo stack.

use polymesh::MeshError;

/// Errors that can occur while invoking, executing or undoing a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("Invalid message format: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl ToolError {
    /// Stable machine-readable code for protocol replies
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidState(_) => "invalid_state",
            Self::NothingToUndo => "nothing_to_undo",
            Self::NothingToRedo => "nothing_to_redo",
            Self::Mesh(MeshError::InvalidArgument(_)) => "invalid_argument",
            Self::Mesh(MeshError::InvalidTopology(_)) => "invalid_topology",
            Self::Mesh(MeshError::BudgetExceeded { .. }) => "budget_exceeded",
            Self::Mesh(MeshError::CorruptState { .. }) => "corrupt_state",
            Self::Mesh(MeshError::Snapshot(_)) => "snapshot",
            Self::Protocol(_) => "protocol",
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
