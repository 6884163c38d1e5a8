//! Vertex smoothing and translation.

use glam::Vec3;
use tracing::debug;

use crate::bmesh::{Mesh, VertexId};
use crate::error::{MeshError, MeshResult};

/// One Laplacian smoothing pass over `verts`.
///
/// Every vertex moves toward the average of its neighbours by `factor`
/// (0..=1). All neighbour positions are read from the start of the pass,
/// so the result does not depend on vertex order. Vertices without
/// neighbours stay put. Returns the number of vertices moved.
pub fn vertex_smooth(mesh: &mut Mesh, verts: &[VertexId], factor: f32) -> MeshResult<usize> {
    if !(0.0..=1.0).contains(&factor) {
        return Err(MeshError::InvalidArgument(format!(
            "smooth factor {} is outside 0..=1",
            factor
        )));
    }
    for &v in verts {
        mesh.vertex_co(v)?;
    }

    let targets: Vec<(VertexId, Vec3)> = verts
        .iter()
        .filter_map(|&v| {
            let neighbors = mesh.vertex_neighbors(v);
            if neighbors.is_empty() {
                return None;
            }
            let sum: Vec3 = neighbors.iter().map(|&n| mesh.verts[n].co).sum();
            let avg = sum / neighbors.len() as f32;
            Some((v, mesh.verts[v].co.lerp(avg, factor)))
        })
        .collect();

    for &(v, co) in &targets {
        mesh.set_vertex_co(v, co)?;
    }

    debug!("vertex_smooth: {} of {} vertices moved", targets.len(), verts.len());
    Ok(targets.len())
}

/// Move `verts` by `offset`.
pub fn translate(mesh: &mut Mesh, verts: &[VertexId], offset: Vec3) -> MeshResult<usize> {
    for &v in verts {
        mesh.vertex_co(v)?;
    }
    for &v in verts {
        let co = mesh.verts[v].co + offset;
        mesh.set_vertex_co(v, co)?;
    }
    Ok(verts.len())
}
