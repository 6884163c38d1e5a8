//! Multi-step edge subdivision.

use tracing::debug;

use crate::bmesh::{EdgeId, Mesh, VertexId};
use crate::error::{MeshError, MeshResult};

/// Insert `steps` evenly spaced vertices along `e`, from `v1` toward `v2`.
///
/// Every face using the edge gains the new vertices at the right cyclic
/// position. Returns the new vertices in `v1 -> v2` order.
pub fn split_edge_multi(mesh: &mut Mesh, e: EdgeId, steps: u32) -> MeshResult<Vec<VertexId>> {
    if steps == 0 {
        return Err(MeshError::InvalidArgument(
            "split steps must be at least 1".into(),
        ));
    }
    if mesh.edge(e).is_none() {
        return Err(MeshError::InvalidArgument(format!(
            "edge {:?} is not live",
            e
        )));
    }

    let mut new_verts = Vec::with_capacity(steps as usize);
    let mut tail = e;
    for i in 0..steps {
        // Split the remaining tail so the pieces come out equal.
        let t = 1.0 / (steps - i + 1) as f32;
        let (nv, ne) = mesh.split_edge(tail, t)?;
        new_verts.push(nv);
        tail = ne;
    }

    debug!("split_edge_multi: {:?} into {} pieces", e, steps + 1);
    Ok(new_verts)
}

/// Split every selected, visible edge. Returns all new vertices.
pub fn split_selected_edges(mesh: &mut Mesh, steps: u32) -> MeshResult<Vec<VertexId>> {
    if steps == 0 {
        return Err(MeshError::InvalidArgument(
            "split steps must be at least 1".into(),
        ));
    }

    let edges: Vec<EdgeId> = mesh.edges().editable().collect();
    let mut new_verts = Vec::new();
    for e in edges {
        new_verts.extend(split_edge_multi(mesh, e, steps)?);
    }
    Ok(new_verts)
}
