//! Vertex extrusion (click-to-add-vertex drawing).

use glam::Vec3;
use tracing::debug;

use crate::bmesh::{EdgeId, Mesh, VertexId};
use crate::error::MeshResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtrudeResult {
    pub vertex: VertexId,
    /// Edge from the previously active vertex, if it was selected
    pub edge: Option<EdgeId>,
}

/// Add a vertex at `co`, connected to the active vertex if that is selected.
///
/// Afterwards only the new vertex (and the new edge) are selected, and both
/// are active.
pub fn extrude_vertex(mesh: &mut Mesh, co: Vec3) -> MeshResult<ExtrudeResult> {
    let previous = mesh
        .verts()
        .active()
        .filter(|&v| mesh.verts().is_selected(v));

    let vertex = mesh.make_vertex(co);
    let edge = match previous {
        Some(prev) => Some(mesh.make_edge(prev, vertex)?),
        None => None,
    };

    mesh.select_none();
    mesh.verts_mut().set_select(vertex, true)?;
    mesh.verts_mut().set_active(Some(vertex))?;
    if let Some(e) = edge {
        mesh.edges_mut().set_select(e, true)?;
        mesh.edges_mut().set_active(Some(e))?;
    }

    debug!("extrude_vertex: {:?} from {:?}", vertex, previous);
    Ok(ExtrudeResult { vertex, edge })
}
