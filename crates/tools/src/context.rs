//! State shared by every tool invocation.

use std::collections::HashMap;

use polyedit_config::EditorConfig;
use polymesh::{Mesh, SelectMask};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::property::{PropertyValue, ToolArgs};
use crate::registry::ToolId;

/// Why the topology changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Exec,
    Undo,
    Redo,
}

/// Live element counts after a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshCounts {
    pub verts: usize,
    pub edges: usize,
    pub faces: usize,
}

impl MeshCounts {
    pub fn of(mesh: &Mesh) -> Self {
        Self {
            verts: mesh.vertex_count(),
            edges: mesh.edge_count(),
            faces: mesh.face_count(),
        }
    }
}

/// Event sent to topology listeners (the redraw scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyChanged {
    pub tool: ToolId,
    pub cause: ChangeCause,
    pub counts: MeshCounts,
}

type Listener = Box<dyn Fn(&TopologyChanged)>;

/// The mesh being edited plus everything tools read besides their
/// arguments.
pub struct ToolContext {
    pub mesh: Mesh,
    /// Element kinds a delete acts on when the caller gives none
    pub select_mask: SelectMask,
    pub config: EditorConfig,
    listeners: Vec<Listener>,
    last_values: HashMap<(ToolId, String), PropertyValue>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("mesh", &MeshCounts::of(&self.mesh))
            .field("select_mask", &self.select_mask)
            .field("config", &self.config)
            .field("listener_count", &self.listeners.len())
            .field("remembered", &self.last_values.len())
            .finish()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(Mesh::new(), EditorConfig::default())
    }
}

impl ToolContext {
    pub fn new(mesh: Mesh, config: EditorConfig) -> Self {
        let select_mask = SelectMask::from_bits(config.default_select_mask)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                warn!(
                    "Invalid default_select_mask {:#b}, using all element types",
                    config.default_select_mask
                );
                SelectMask::ALL
            });
        Self {
            mesh,
            select_mask,
            config,
            listeners: Vec::new(),
            last_values: HashMap::new(),
        }
    }

    /// Register a listener for topology changes.
    pub fn on_topology_changed(&mut self, listener: impl Fn(&TopologyChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn notify(&self, tool: ToolId, cause: ChangeCause) {
        let event = TopologyChanged {
            tool,
            cause,
            counts: MeshCounts::of(&self.mesh),
        };
        trace!("Topology changed: {:?}", event);
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Value of `name` from the last successful run of `tool`
    pub fn last_value(&self, tool: ToolId, name: &str) -> Option<&PropertyValue> {
        self.last_values.get(&(tool, name.to_string()))
    }

    /// Remember the remember-last parameters of an executed invocation.
    pub(crate) fn remember(&mut self, tool: ToolId, args: &ToolArgs) {
        let def = tool.def(&self.config);
        for prop in def.properties.iter().filter(|p| p.remember_last) {
            if let Some(value) = args.get(&prop.name) {
                self.last_values
                    .insert((tool, prop.name.clone()), value.clone());
            }
        }
    }
}
