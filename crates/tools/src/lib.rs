//! Undoable mesh editing tools for polyedit
//!
//! Every topology edit from [`polymesh::ops`] is wrapped as a tool with a
//! typed parameter schema. Tools are looked up by a stable path
//! (`mesh.split_edge`), validated by [`invoke`], executed on a
//! [`ToolStack`] and undone by restoring the snapshot taken before they ran.

pub mod context;
pub mod error;
pub mod property;
pub mod protocol;
pub mod registry;
pub mod stack;
pub mod tool;

pub use context::{ChangeCause, MeshCounts, ToolContext, TopologyChanged};
pub use error::{ToolError, ToolResult};
pub use property::{PropertyDef, PropertyKind, PropertyValue, ToolArgs};
pub use protocol::{ToolReply, ToolRequest, handle_json, handle_request};
pub use registry::{ToolDef, ToolId, registry, registry_json};
pub use stack::ToolStack;
pub use tool::{Invocation, MeshTool, ToolMacro, ToolOp, ToolState, invoke};
