//! JSON message protocol between an external UI and the tool stack.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::MeshCounts;
use crate::error::{ToolError, ToolResult};
use crate::property::ToolArgs;
use crate::registry::{ToolDef, ToolId, registry};
use crate::stack::ToolStack;

/// Messages from the UI to the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ToolRequest {
    /// Run a tool by path
    Invoke {
        tool: String,
        #[serde(default)]
        args: ToolArgs,
    },

    /// Take back the last tool
    Undo,

    /// Re-run the last undone tool
    Redo,

    /// Ask for the tool registry
    ListTools,
}

/// Messages from the editor to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ToolReply {
    /// Tool executed; counts after the change
    Done { tool: ToolId, counts: MeshCounts },

    Undone { tool: ToolId, counts: MeshCounts },

    Redone { tool: ToolId, counts: MeshCounts },

    Tools(Vec<ToolDef>),

    /// Error notification
    Error { code: String, message: String },
}

impl From<&ToolError> for ToolReply {
    fn from(err: &ToolError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Apply one request to the stack. Failures become `ToolReply::Error`.
pub fn handle_request(stack: &mut ToolStack, request: ToolRequest) -> ToolReply {
    debug!("Tool request: {:?}", request);
    match try_handle(stack, request) {
        Ok(reply) => reply,
        Err(err) => {
            warn!("Tool request failed: {}", err);
            ToolReply::from(&err)
        }
    }
}

fn try_handle(stack: &mut ToolStack, request: ToolRequest) -> ToolResult<ToolReply> {
    let reply = match request {
        ToolRequest::Invoke { tool, args } => {
            let id = ToolId::from_path(&tool)?;
            stack.run(id, &args)?;
            ToolReply::Done {
                tool: id,
                counts: MeshCounts::of(stack.mesh()),
            }
        }
        ToolRequest::Undo => {
            let tool = stack.undo()?;
            ToolReply::Undone {
                tool,
                counts: MeshCounts::of(stack.mesh()),
            }
        }
        ToolRequest::Redo => {
            let tool = stack.redo()?;
            ToolReply::Redone {
                tool,
                counts: MeshCounts::of(stack.mesh()),
            }
        }
        ToolRequest::ListTools => ToolReply::Tools(registry(&stack.ctx().config)),
    };
    Ok(reply)
}

/// Parse a JSON request, apply it and serialize the reply.
///
/// A request that does not parse is answered with a `protocol` error reply.
pub fn handle_json(stack: &mut ToolStack, message: &str) -> ToolResult<String> {
    let reply = match serde_json::from_str::<ToolRequest>(message) {
        Ok(request) => handle_request(stack, request),
        Err(err) => ToolReply::from(&ToolError::from(err)),
    };
    Ok(serde_json::to_string(&reply)?)
}
