//! Winding and edge-direction fixes.

use tracing::debug;

use crate::bmesh::{EdgeId, FaceId, Mesh};
use crate::error::MeshResult;

/// Flip every selected, visible face whose first three corners turn
/// clockwise in the XY plane. Returns the number of faces flipped.
///
/// Running it twice flips nothing the second time: reversing a face puts
/// its first three corners in exactly the opposite order.
pub fn fix_windings(mesh: &mut Mesh) -> MeshResult<usize> {
    let faces: Vec<FaceId> = mesh.faces().editable().collect();
    let mut flipped = 0;

    for f in faces {
        let corners: Vec<_> = mesh.face_positions(f).into_iter().take(3).collect();
        let [a, b, c] = corners[..] else {
            continue;
        };
        if (b - a).cross(c - a).z < 0.0 {
            mesh.reverse_winding(f)?;
            flipped += 1;
        }
    }

    debug!("fix_windings: {} faces flipped", flipped);
    Ok(flipped)
}

/// Swap the endpoints of every selected, visible edge.
pub fn reverse_edges(mesh: &mut Mesh) -> MeshResult<usize> {
    let edges: Vec<EdgeId> = mesh.edges().editable().collect();
    for &e in &edges {
        mesh.reverse_edge(e)?;
    }
    debug!("reverse_edges: {} edges", edges.len());
    Ok(edges.len())
}
