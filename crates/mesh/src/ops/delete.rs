//! Delete selected geometry.

use tracing::debug;

use crate::bmesh::{EdgeId, FaceId, Mesh, SelectMask, VertexId};
use crate::error::MeshResult;

/// How many elements [`delete_selected`] killed directly.
///
/// Elements removed by a cascade (faces of a killed edge, and so on) are not
/// counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub faces: usize,
    pub edges: usize,
    pub vertices: usize,
}

/// Kill the selected, visible elements of the types in `mask`.
///
/// Faces go first, then edges, then vertices; anything already removed by
/// an earlier cascade is skipped.
pub fn delete_selected(mesh: &mut Mesh, mask: SelectMask) -> MeshResult<DeleteSummary> {
    let mut summary = DeleteSummary::default();

    if mask.contains(SelectMask::FACE) {
        let faces: Vec<FaceId> = mesh.faces().editable().collect();
        for f in faces {
            if mesh.face(f).is_some() {
                mesh.kill_face(f)?;
                summary.faces += 1;
            }
        }
    }
    if mask.contains(SelectMask::EDGE) {
        let edges: Vec<EdgeId> = mesh.edges().editable().collect();
        for e in edges {
            if mesh.edge(e).is_some() {
                mesh.kill_edge(e)?;
                summary.edges += 1;
            }
        }
    }
    if mask.contains(SelectMask::VERTEX) {
        let verts: Vec<VertexId> = mesh.verts().editable().collect();
        for v in verts {
            if mesh.vertex(v).is_some() {
                mesh.kill_vertex(v)?;
                summary.vertices += 1;
            }
        }
    }

    debug!("delete_selected: {:?} with mask {:?}", summary, mask);
    Ok(summary)
}
