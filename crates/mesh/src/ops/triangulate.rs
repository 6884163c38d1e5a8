//! Polygon triangulation by ear clipping.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use tracing::{debug, trace};

use crate::bmesh::{Element, FaceId, LoopId, Mesh, newell_normal};
use crate::error::{MeshError, MeshResult};

const EPSILON: f32 = 1e-7;

/// Split every face of degree > 3 in `faces` into triangles.
///
/// Triangles keep the winding of their source face, vertex positions do not
/// change, and face flags and loop payloads are carried over. Returns the
/// new triangles.
pub fn triangulate(mesh: &mut Mesh, faces: &[FaceId]) -> MeshResult<Vec<FaceId>> {
    for &f in faces {
        if mesh.face(f).is_none() {
            return Err(MeshError::InvalidArgument(format!(
                "face {:?} is not live",
                f
            )));
        }
    }

    let mut created = Vec::new();
    for &f in faces {
        // A face listed twice is already gone.
        if mesh.face_len(f) <= 3 {
            continue;
        }

        let verts = mesh.face_vertices(f);
        let flags = mesh.faces[f].flags();
        let payloads: HashMap<_, _> = mesh
            .face_loops(f)
            .map(|l| (mesh.loops[l].v, mesh.loops[l].payload.clone()))
            .collect();
        let tris = triangulate_polygon(&mesh.face_positions(f));

        mesh.kill_face(f)?;
        for [a, b, c] in tris {
            let tri = mesh.make_face(&[verts[a], verts[b], verts[c]])?;
            mesh.faces_mut().copy_state(flags, tri)?;
            let loops: Vec<LoopId> = mesh.face_loops(tri).collect();
            for l in loops {
                if let Some(payload) = payloads.get(&mesh.loops[l].v) {
                    mesh.set_loop_payload(l, payload.clone())?;
                }
            }
            created.push(tri);
        }
        trace!("triangulate: {:?} -> {} triangles", f, verts.len() - 2);
    }

    debug!("triangulate: {} triangles created", created.len());
    Ok(created)
}

/// Triangulate every face of the mesh.
pub fn triangulate_all(mesh: &mut Mesh) -> MeshResult<Vec<FaceId>> {
    let faces: Vec<FaceId> = mesh.faces().ids().collect();
    triangulate(mesh, &faces)
}

/// Triangles (as corner indices, in polygon winding) covering a polygon.
///
/// The polygon is projected onto its own plane and ear clipped; when no ear
/// can be found (degenerate or self-intersecting input) the rest is fanned.
fn triangulate_polygon(points: &[Vec3]) -> Vec<[usize; 3]> {
    let n = points.len();
    let normal = newell_normal(points);
    if normal == Vec3::ZERO {
        return fan(&(0..n).collect::<Vec<_>>());
    }

    let u = normal.any_orthogonal_vector().normalize();
    let w = normal.cross(u);
    let flat: Vec<Vec2> = points
        .iter()
        .map(|p| Vec2::new(p.dot(u), p.dot(w)))
        .collect();

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut tris = Vec::with_capacity(n - 2);
    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let (a, b, c) = (
                remaining[(i + m - 1) % m],
                remaining[i],
                remaining[(i + 1) % m],
            );
            is_ear(&flat, &remaining, a, b, c)
        });
        match ear {
            Some(i) => {
                tris.push([
                    remaining[(i + m - 1) % m],
                    remaining[i],
                    remaining[(i + 1) % m],
                ]);
                remaining.remove(i);
            }
            None => {
                tris.extend(fan(&remaining));
                return tris;
            }
        }
    }
    tris.push([remaining[0], remaining[1], remaining[2]]);
    tris
}

fn fan(corners: &[usize]) -> Vec<[usize; 3]> {
    (1..corners.len() - 1)
        .map(|i| [corners[0], corners[i], corners[i + 1]])
        .collect()
}

fn is_ear(flat: &[Vec2], remaining: &[usize], a: usize, b: usize, c: usize) -> bool {
    let (pa, pb, pc) = (flat[a], flat[b], flat[c]);
    if (pb - pa).perp_dot(pc - pb) <= EPSILON {
        return false;
    }
    remaining
        .iter()
        .filter(|&&i| i != a && i != b && i != c)
        .all(|&i| !strictly_inside(flat[i], pa, pb, pc))
}

fn strictly_inside(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    (b - a).perp_dot(p - a) > EPSILON
        && (c - b).perp_dot(p - b) > EPSILON
        && (a - c).perp_dot(p - c) > EPSILON
}
