//! Build faces from a set of selected vertices.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::bmesh::{EdgeId, FaceId, LoopId, Mesh, VertexId};
use crate::error::{MeshError, MeshResult};

/// Outcome of [`make_face_from_selection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MakeFaceReport {
    pub faces: Vec<FaceId>,
    /// How many of `faces` were flipped to agree with a neighbour
    pub reversed: usize,
    /// Segments that were abandoned, keyed by their start vertex
    pub aborted: Vec<(VertexId, MeshError)>,
    /// Segments too short to become a face
    pub skipped: usize,
}

/// Reconstruct polygon boundaries from the selected, visible vertices.
///
/// Vertices are visited in order of increasing edge count (ties by id).
/// From each unvisited vertex a segment follows unvisited edges whose far
/// end is selected; the walk stops when no such edge is left or when it
/// closes back on its first vertex. A segment that takes more than
/// `budget` steps is abandoned with `BudgetExceeded`; the others proceed.
///
/// Segments of at least 3 vertices become faces. Selected vertices with no
/// edge to any other selected vertex are collected into one extra face,
/// ordered counter-clockwise around their centroid in the XY plane, when
/// there are at least 3 of them.
pub fn make_face_from_selection(mesh: &mut Mesh, budget: usize) -> MeshResult<MakeFaceReport> {
    let mut report = MakeFaceReport::default();

    let mut order: Vec<VertexId> = mesh.verts().editable().collect();
    let selected: HashSet<VertexId> = order.iter().copied().collect();
    order.sort_by_key(|&v| (mesh.vertex_degree(v), v));

    let loose: Vec<VertexId> = order
        .iter()
        .copied()
        .filter(|&v| {
            mesh.vertex_neighbors(v)
                .iter()
                .all(|n| !selected.contains(n))
        })
        .collect();

    // ===== PHASE 1: WALK SEGMENTS (read-only) =====
    let mut segments = Vec::new();
    let mut visited_verts: HashSet<VertexId> = HashSet::new();
    let mut visited_edges: HashSet<EdgeId> = HashSet::new();
    for &start in &order {
        if visited_verts.contains(&start) || loose.contains(&start) {
            continue;
        }
        visited_verts.insert(start);
        match walk_segment(mesh, start, &selected, &mut visited_verts, &mut visited_edges, budget) {
            Ok(seg) if seg.len() >= 3 => segments.push(seg),
            Ok(seg) => {
                warn!("make_face: skipping {}-vertex segment at {:?}", seg.len(), start);
                report.skipped += 1;
            }
            Err(err) => {
                warn!("make_face: segment at {:?} aborted: {}", start, err);
                report.aborted.push((start, err));
            }
        }
    }
    if loose.len() >= 3 {
        segments.push(sort_ccw(mesh, loose));
    } else if !loose.is_empty() {
        report.skipped += 1;
    }

    // ===== PHASE 2: BUILD FACES =====
    for seg in segments {
        let f = match mesh.make_face(&seg) {
            Ok(f) => f,
            Err(err) => {
                warn!("make_face: segment at {:?} rejected: {}", seg[0], err);
                report.aborted.push((seg[0], err));
                continue;
            }
        };
        if conflicts_with_neighbor(mesh, f) {
            mesh.reverse_winding(f)?;
            report.reversed += 1;
        }
        copy_neighbor_payloads(mesh, f)?;
        report.faces.push(f);
    }

    debug!(
        "make_face: {} faces ({} reversed), {} aborted, {} skipped",
        report.faces.len(),
        report.reversed,
        report.aborted.len(),
        report.skipped
    );
    Ok(report)
}

fn walk_segment(
    mesh: &Mesh,
    start: VertexId,
    selected: &HashSet<VertexId>,
    visited_verts: &mut HashSet<VertexId>,
    visited_edges: &mut HashSet<EdgeId>,
    budget: usize,
) -> MeshResult<Vec<VertexId>> {
    let mut seg = vec![start];
    let mut cur = start;
    let mut steps = 0;

    loop {
        let step = mesh.vertex_edges(cur).find_map(|e| {
            let next = mesh.edge(e)?.other(cur)?;
            let usable = !visited_edges.contains(&e)
                && selected.contains(&next)
                && (next == start || !seg.contains(&next));
            usable.then_some((e, next))
        });
        let Some((e, next)) = step else {
            return Ok(seg);
        };

        steps += 1;
        if steps > budget {
            return Err(MeshError::BudgetExceeded { budget });
        }
        visited_edges.insert(e);
        if next == start {
            return Ok(seg);
        }
        visited_verts.insert(next);
        seg.push(next);
        cur = next;
    }
}

fn sort_ccw(mesh: &Mesh, mut verts: Vec<VertexId>) -> Vec<VertexId> {
    let co = |v: VertexId| mesh.vertex(v).map(|vert| vert.co).unwrap_or_default();
    let centroid = verts.iter().map(|&v| co(v)).sum::<glam::Vec3>() / verts.len() as f32;
    verts.sort_by(|&a, &b| {
        let (pa, pb) = (co(a) - centroid, co(b) - centroid);
        pa.y.atan2(pa.x)
            .total_cmp(&pb.y.atan2(pb.x))
            .then(a.cmp(&b))
    });
    verts
}

/// A radial neighbour starting at the same vertex walks the shared edge in
/// the same direction, so the two faces disagree on winding.
fn conflicts_with_neighbor(mesh: &Mesh, f: FaceId) -> bool {
    mesh.face_loops(f).any(|l| {
        let lp = &mesh.loops[l];
        lp.radial_next != l && mesh.loops[lp.radial_next].v == lp.v
    })
}

/// Copy each loop's payload from a radial neighbour, preferring one whose
/// origin differs. A same-origin neighbour contributes its `next` loop,
/// which sits at the far endpoint of the shared edge.
fn copy_neighbor_payloads(mesh: &mut Mesh, f: FaceId) -> MeshResult<()> {
    let loops: Vec<LoopId> = mesh.face_loops(f).collect();
    for l in loops {
        let v = mesh.loops[l].v;
        let others: Vec<LoopId> = mesh.edge_loops(mesh.loops[l].e).filter(|&o| o != l).collect();
        let source = others
            .iter()
            .copied()
            .find(|&o| mesh.loops[o].v != v)
            .or_else(|| others.first().map(|&o| mesh.loops[o].next));
        if let Some(src) = source {
            mesh.copy_loop_payload(l, src)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmesh::test_meshes::*;
    use crate::bmesh::{ElemRef, LoopPayload};
    use glam::Vec3;

    const BUDGET: usize = 10_000;

    fn select(mesh: &mut Mesh, verts: &[VertexId]) {
        for &v in verts {
            mesh.set_select(ElemRef::Vertex(v), true).unwrap();
        }
    }

    #[test]
    fn test_loose_vertices_form_ccw_face() {
        let mut mesh = Mesh::new();
        let verts: Vec<_> = [(1.0, 1.0), (0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| mesh.make_vertex(Vec3::new(x, y, 0.0)))
            .collect();
        select(&mut mesh, &verts);

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        assert_eq!(report.faces.len(), 1);
        let f = report.faces[0];
        assert_eq!(mesh.face_len(f), 4);
        assert!(mesh.face_normal(f).z > 0.0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_two_loose_vertices_make_nothing() {
        let mut mesh = Mesh::new();
        let a = mesh.make_vertex(Vec3::ZERO);
        let b = mesh.make_vertex(Vec3::X);
        select(&mut mesh, &[a, b]);

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        assert!(report.faces.is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn test_open_path_is_closed_into_face() {
        let mut mesh = Mesh::new();
        let v: Vec<_> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| mesh.make_vertex(Vec3::new(x, y, 0.0)))
            .collect();
        for w in v.windows(2) {
            mesh.make_edge(w[0], w[1]).unwrap();
        }
        select(&mut mesh, &v);

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        assert_eq!(report.faces.len(), 1);
        assert_eq!(mesh.face_vertices(report.faces[0]), v);
        assert_eq!(mesh.edge_count(), 4);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_closed_wire_loop_stops_at_start() {
        let mut mesh = Mesh::new();
        let v: Vec<_> = (0..3)
            .map(|i| mesh.make_vertex(Vec3::new(i as f32, (i % 2) as f32, 0.0)))
            .collect();
        for i in 0..3 {
            mesh.make_edge(v[i], v[(i + 1) % 3]).unwrap();
        }
        select(&mut mesh, &v);

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        assert_eq!(report.faces.len(), 1);
        assert_eq!(mesh.face_len(report.faces[0]), 3);
        assert_eq!(mesh.edge_count(), 3);
    }

    /// Square face plus a wire path v1-v4-v5-v2 on its right side.
    fn square_with_wire_neighbor() -> (Mesh, [VertexId; 6], FaceId) {
        let mut mesh = Mesh::new();
        let v = [
            mesh.make_vertex(Vec3::new(0.0, 0.0, 0.0)),
            mesh.make_vertex(Vec3::new(1.0, 0.0, 0.0)),
            mesh.make_vertex(Vec3::new(1.0, 1.0, 0.0)),
            mesh.make_vertex(Vec3::new(0.0, 1.0, 0.0)),
            mesh.make_vertex(Vec3::new(2.0, 0.0, 0.0)),
            mesh.make_vertex(Vec3::new(2.0, 1.0, 0.0)),
        ];
        let f = mesh.make_face(&v[..4]).unwrap();
        mesh.make_edge(v[1], v[4]).unwrap();
        mesh.make_edge(v[4], v[5]).unwrap();
        mesh.make_edge(v[5], v[2]).unwrap();
        (mesh, v, f)
    }

    #[test]
    fn test_conflicting_winding_is_reversed() {
        let (mut mesh, v, _) = square_with_wire_neighbor();
        select(&mut mesh, &[v[1], v[2], v[4], v[5]]);

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        assert_eq!(report.faces.len(), 1);
        assert_eq!(report.reversed, 1);
        let f = report.faces[0];
        assert!(mesh.face_normal(f).z > 0.0);
        let shared = mesh.edge_between(v[1], v[2]).unwrap();
        let origins: Vec<_> = mesh
            .edge_loops(shared)
            .map(|l| mesh.get_loop(l).unwrap().vertex())
            .collect();
        assert_eq!(origins.len(), 2);
        assert_ne!(origins[0], origins[1]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_payload_copied_from_opposite_neighbor() {
        let (mut mesh, v, square) = square_with_wire_neighbor();
        for l in mesh.face_loops(square).collect::<Vec<_>>() {
            let origin = mesh.get_loop(l).unwrap().vertex();
            mesh.set_loop_payload(l, LoopPayload::new(vec![origin.0 as u8]))
                .unwrap();
        }
        select(&mut mesh, &[v[1], v[2], v[4], v[5]]);

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        let f = report.faces[0];
        let l = mesh.face_loop_at(f, v[2]).unwrap();
        let neighbor = mesh.get_loop(l).unwrap().radial_next();
        assert_eq!(mesh.get_loop(neighbor).unwrap().vertex(), v[1]);
        assert_eq!(
            mesh.get_loop(l).unwrap().payload().as_bytes(),
            &[v[1].0 as u8]
        );
    }

    #[test]
    fn test_budget_aborts_only_the_segment() {
        let mut mesh = Mesh::new();
        let v: Vec<_> = (0..4)
            .map(|i| mesh.make_vertex(Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        for w in v.windows(2) {
            mesh.make_edge(w[0], w[1]).unwrap();
        }
        select(&mut mesh, &v);

        let report = make_face_from_selection(&mut mesh, 1).unwrap();

        assert!(report.faces.is_empty());
        assert!(!report.aborted.is_empty());
        assert!(report
            .aborted
            .iter()
            .all(|(_, err)| *err == MeshError::BudgetExceeded { budget: 1 }));
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn test_hidden_vertices_are_ignored() {
        let (mut mesh, v, f) = unit_square();
        mesh.kill_face(f).unwrap();
        select(&mut mesh, &v);
        mesh.verts_mut().set_hidden(v[3], true).unwrap();

        let report = make_face_from_selection(&mut mesh, BUDGET).unwrap();

        assert_eq!(report.faces.len(), 1);
        assert_eq!(mesh.face_len(report.faces[0]), 3);
    }
}
