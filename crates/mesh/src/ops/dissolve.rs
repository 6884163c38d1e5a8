//! Vertex dissolve: remove a vertex while keeping the surface around it.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::bmesh::{EdgeId, ElemFlags, Element, FaceId, LoopId, LoopPayload, Mesh, VertexId};
use crate::error::{MeshError, MeshResult};

/// What [`dissolve_vertex`] created in place of the vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DissolveResult {
    /// Faces rebuilt without the vertex
    pub faces: Vec<FaceId>,
    /// Edge joining the two neighbours of a wire vertex
    pub edge: Option<EdgeId>,
}

/// A face to create once the vertex is gone.
#[derive(Debug)]
struct Rebuild {
    boundary: Vec<VertexId>,
    flags: ElemFlags,
    payloads: HashMap<VertexId, LoopPayload>,
}

#[derive(Debug)]
enum Plan {
    Kill,
    JoinWire {
        a: VertexId,
        b: VertexId,
        flags: ElemFlags,
    },
    Rebuild(Vec<Rebuild>),
}

/// Remove a vertex, merging the geometry around it.
///
/// - degree < 2: the vertex is killed with its edge;
/// - wire vertex of degree 2: its neighbours are joined by an edge;
/// - degree 2 with faces: the vertex is cut out of every face;
/// - degree >= 3 with a single consistently wound fan of faces: the fan
///   becomes one face;
/// - anything else: the vertex is cut out of each face separately.
///
/// Faces left with fewer than 3 vertices disappear. The whole plan is built
/// before the mesh is touched.
pub fn dissolve_vertex(mesh: &mut Mesh, v: VertexId) -> MeshResult<DissolveResult> {
    if mesh.vertex(v).is_none() {
        return Err(MeshError::InvalidArgument(format!(
            "vertex {:?} is not live",
            v
        )));
    }

    // ===== PHASE 1: PLAN (read-only) =====
    let plan = plan_dissolve(mesh, v);
    trace!("dissolve_vertex: {:?} plan {:?}", v, plan);

    // ===== PHASE 2: APPLY =====
    let mut result = DissolveResult::default();
    mesh.kill_vertex(v)?;
    match plan {
        Plan::Kill => {}
        Plan::JoinWire { a, b, flags } => {
            let existing = mesh.edge_between(a, b);
            let e = mesh.make_edge(a, b)?;
            // An edge that was already there keeps its own state.
            if existing.is_none() {
                mesh.edges_mut().copy_state(flags, e)?;
            }
            result.edge = Some(e);
        }
        Plan::Rebuild(rebuilds) => {
            for rebuild in rebuilds {
                let f = mesh.make_face(&rebuild.boundary)?;
                mesh.faces_mut().copy_state(rebuild.flags, f)?;
                let loops: Vec<LoopId> = mesh.face_loops(f).collect();
                for l in loops {
                    let origin = mesh.loops[l].v;
                    if let Some(payload) = rebuild.payloads.get(&origin) {
                        mesh.set_loop_payload(l, payload.clone())?;
                    }
                }
                result.faces.push(f);
            }
        }
    }

    debug!(
        "dissolve_vertex: {:?} -> {} faces, edge {:?}",
        v,
        result.faces.len(),
        result.edge
    );
    Ok(result)
}

fn plan_dissolve(mesh: &Mesh, v: VertexId) -> Plan {
    let edges: Vec<EdgeId> = mesh.vertex_edges(v).collect();
    let faces = mesh.vertex_faces(v);

    if edges.len() < 2 {
        return Plan::Kill;
    }
    if edges.len() == 2 && faces.is_empty() {
        let neighbors = mesh.vertex_neighbors(v);
        return Plan::JoinWire {
            a: neighbors[0],
            b: neighbors[1],
            flags: mesh.edges[edges[0]].flags(),
        };
    }
    if edges.len() >= 3 {
        if let Some(rebuild) = plan_fan_merge(mesh, v, &edges) {
            return Plan::Rebuild(vec![rebuild]);
        }
    }

    // Cut the vertex out of each face on its own.
    let rebuilds = faces
        .iter()
        .filter_map(|&f| {
            let corner = mesh.face_loop_at(f, v)?;
            let boundary = corner_chain(mesh, corner);
            (boundary.len() >= 3).then(|| Rebuild {
                boundary,
                flags: mesh.faces[f].flags(),
                payloads: face_payloads(mesh, &[f]),
            })
        })
        .collect();
    Plan::Rebuild(rebuilds)
}

/// Boundary of the face of `corner` with the corner's vertex left out,
/// starting right after it.
fn corner_chain(mesh: &Mesh, corner: LoopId) -> Vec<VertexId> {
    let f = mesh.loops[corner].f;
    let verts = mesh.face_vertices(f);
    let v = mesh.loops[corner].v;
    match verts.iter().position(|&x| x == v) {
        Some(i) => verts[i + 1..].iter().chain(&verts[..i]).copied().collect(),
        None => Vec::new(),
    }
}

fn face_payloads(mesh: &Mesh, faces: &[FaceId]) -> HashMap<VertexId, LoopPayload> {
    let mut payloads = HashMap::new();
    for &f in faces {
        for l in mesh.face_loops(f) {
            let lp = &mesh.loops[l];
            payloads
                .entry(lp.v)
                .or_insert_with(|| lp.payload.clone());
        }
    }
    payloads
}

/// The corner at `v` of the face across the incoming edge of `corner`.
///
/// `Ok(None)` at an open boundary, `Err(())` when the neighbour is wound the
/// other way.
fn next_corner(mesh: &Mesh, v: VertexId, corner: LoopId) -> Result<Option<LoopId>, ()> {
    let incoming = mesh.loops[corner].prev;
    let other = mesh.loops[incoming].radial_next;
    if other == incoming {
        return Ok(None);
    }
    if mesh.loops[other].v == v {
        Ok(Some(other))
    } else {
        Err(())
    }
}

/// Merge the faces around `v` into one, if they form a single fan.
fn plan_fan_merge(mesh: &Mesh, v: VertexId, edges: &[EdgeId]) -> Option<Rebuild> {
    // Every edge at the vertex must carry one or two faces.
    for &e in edges {
        let n = mesh.edge_loops(e).count();
        if n == 0 || n > 2 {
            return None;
        }
    }

    let faces = mesh.vertex_faces(v);
    let corners: Vec<LoopId> = faces
        .iter()
        .filter_map(|&f| mesh.face_loop_at(f, v))
        .collect();
    if corners.len() < 2 || corners.len() != faces.len() {
        return None;
    }

    // An open fan starts at the corner whose outgoing edge is a boundary.
    let starts: Vec<LoopId> = corners
        .iter()
        .copied()
        .filter(|&l| mesh.loops[l].radial_next == l)
        .collect();
    let (start, open) = match starts.as_slice() {
        [] => (corners[0], false),
        [start] => (*start, true),
        _ => return None,
    };

    let mut order = vec![start];
    let mut cur = start;
    let mut closed = false;
    while order.len() <= corners.len() {
        match next_corner(mesh, v, cur).ok()? {
            None => break,
            Some(next) if next == start => {
                closed = true;
                break;
            }
            Some(next) => {
                order.push(next);
                cur = next;
            }
        }
    }
    if order.len() != corners.len() || closed == open {
        return None;
    }

    let mut boundary = Vec::new();
    for (i, &corner) in order.iter().enumerate() {
        let mut chain = corner_chain(mesh, corner);
        let last = i + 1 == order.len();
        // Consecutive chains share an end vertex.
        if !(open && last) {
            chain.pop();
        }
        boundary.extend(chain);
    }

    let mut seen = std::collections::HashSet::new();
    if boundary.len() < 3 || !boundary.iter().all(|&x| seen.insert(x)) {
        return None;
    }

    let source: Vec<FaceId> = order.iter().map(|&l| mesh.loops[l].f).collect();
    Some(Rebuild {
        boundary,
        flags: mesh.faces[source[0]].flags(),
        payloads: face_payloads(mesh, &source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmesh::ElemRef;
    use crate::bmesh::test_meshes::*;
    use crate::ops::split_edge_multi;
    use glam::Vec3;

    #[test]
    fn test_dissolve_loose_vertex() {
        let mut mesh = Mesh::new();
        let v = mesh.make_vertex(Vec3::ZERO);

        let result = dissolve_vertex(&mut mesh, v).unwrap();

        assert_eq!(result, DissolveResult::default());
        assert_eq!(mesh.vertex_count(), 0);
        assert!(dissolve_vertex(&mut mesh, v).is_err());
    }

    #[test]
    fn test_dissolve_wire_vertex_joins_neighbours() {
        let mut mesh = Mesh::new();
        let a = mesh.make_vertex(Vec3::ZERO);
        let m = mesh.make_vertex(Vec3::X);
        let b = mesh.make_vertex(Vec3::X * 2.0);
        mesh.make_edge(a, m).unwrap();
        mesh.make_edge(m, b).unwrap();

        let result = dissolve_vertex(&mut mesh, m).unwrap();

        let e = result.edge.unwrap();
        assert_eq!(mesh.edge_between(a, b), Some(e));
        assert_eq!(mesh.edge_count(), 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_wire_vertex_keeps_existing_edge_state() {
        let mut mesh = Mesh::new();
        let a = mesh.make_vertex(Vec3::ZERO);
        let m = mesh.make_vertex(Vec3::X);
        let b = mesh.make_vertex(Vec3::Y);
        let am = mesh.make_edge(a, m).unwrap();
        mesh.make_edge(m, b).unwrap();
        let ab = mesh.make_edge(a, b).unwrap();
        mesh.set_select(ElemRef::Edge(am), true).unwrap();
        mesh.edges_mut().set_hidden(am, true).unwrap();

        let result = dissolve_vertex(&mut mesh, m).unwrap();

        assert_eq!(result.edge, Some(ab));
        assert_eq!(mesh.edge_count(), 1);
        assert!(!mesh.edges().is_selected(ab));
        assert!(!mesh.edges().is_hidden(ab));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_degree_two_undoes_split() {
        let (mut mesh, v, [f0, f1]) = two_quads();
        let shared = mesh.edge_between(v[1], v[2]).unwrap();
        let new = split_edge_multi(&mut mesh, shared, 1).unwrap();

        let result = dissolve_vertex(&mut mesh, new[0]).unwrap();

        assert_eq!(result.faces.len(), 2);
        assert!(mesh.face(f0).is_none() && mesh.face(f1).is_none());
        for &f in &result.faces {
            assert_eq!(mesh.face_len(f), 4);
        }
        let joined = mesh.edge_between(v[1], v[2]).unwrap();
        assert_eq!(mesh.edge_faces(joined).len(), 2);
        assert_eq!(mesh.edge_count(), 7);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_interior_vertex_merges_closed_fan() {
        let (mut mesh, v) = quad_grid();

        let result = dissolve_vertex(&mut mesh, v[4]).unwrap();

        assert_eq!(result.faces.len(), 1);
        let f = result.faces[0];
        assert_eq!(mesh.face_len(f), 8);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 8);
        assert!(mesh.face_normal(f).z > 0.0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_boundary_vertex_merges_open_fan() {
        let (mut mesh, v) = quad_grid();
        let before = mesh.face_count();

        let result = dissolve_vertex(&mut mesh, v[1]).unwrap();

        assert_eq!(result.faces.len(), 1);
        assert_eq!(
            mesh.face_vertices(result.faces[0]),
            vec![v[2], v[5], v[4], v[3], v[0]]
        );
        assert_eq!(mesh.face_count(), before - 1);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_carries_flags_and_payloads() {
        let (mut mesh, v) = quad_grid();
        for f in mesh.faces().ids().collect::<Vec<_>>() {
            mesh.set_select(ElemRef::Face(f), true).unwrap();
            for l in mesh.face_loops(f).collect::<Vec<_>>() {
                let origin = mesh.get_loop(l).unwrap().vertex();
                mesh.set_loop_payload(l, LoopPayload::new(vec![origin.0 as u8]))
                    .unwrap();
            }
        }

        let result = dissolve_vertex(&mut mesh, v[4]).unwrap();

        let f = result.faces[0];
        assert!(mesh.faces().is_selected(f));
        for l in mesh.face_loops(f) {
            let lp = mesh.get_loop(l).unwrap();
            assert_eq!(lp.payload().as_bytes(), &[lp.vertex().0 as u8]);
        }
    }

    #[test]
    fn test_dissolve_tetrahedron_apex() {
        let (mut mesh, v) = tetrahedron();

        let result = dissolve_vertex(&mut mesh, v[3]).unwrap();

        assert_eq!(result.faces.len(), 1);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 3);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_inconsistent_winding_falls_back_to_excision() {
        let mut mesh = Mesh::new();
        let c = mesh.make_vertex(Vec3::ZERO);
        let a = mesh.make_vertex(Vec3::X);
        let b = mesh.make_vertex(Vec3::Y);
        let d = mesh.make_vertex(-Vec3::Y);
        mesh.make_face(&[c, a, b]).unwrap();
        mesh.make_face(&[c, a, d]).unwrap();

        let result = dissolve_vertex(&mut mesh, c).unwrap();

        assert!(result.faces.is_empty());
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.validate().is_ok());
    }
}
