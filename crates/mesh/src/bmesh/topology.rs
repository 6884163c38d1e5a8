//! Topology query methods for Mesh.
//!
//! Every cycle walk is bounded by the size of the arena it walks, so queries
//! terminate (with a truncated answer) even on a corrupted mesh.

use glam::Vec3;

use super::types::{Edge, EdgeId, ElementId, Face, FaceId, Loop, LoopId, Vertex, VertexId};
use super::Mesh;
use crate::error::{MeshError, MeshResult};

/// Walk a cycle from `start` until it returns to `start`, `step` fails, or
/// `limit` ids have been produced.
pub(crate) fn walk_cycle<I: ElementId>(
    start: Option<I>,
    limit: usize,
    step: impl Fn(I) -> Option<I>,
) -> impl Iterator<Item = I> {
    let mut cur = start;
    let mut remaining = limit;
    std::iter::from_fn(move || {
        let id = cur?;
        if remaining == 0 {
            return None;
        }
        remaining -= 1;
        cur = step(id).filter(|&next| Some(next) != start);
        Some(id)
    })
}

/// Polygon normal by Newell's method (robust for non-planar and concave
/// polygons). Zero for degenerate input.
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n.normalize_or_zero()
}

impl Mesh {
    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get vertex by ID
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.verts.get(id)
    }

    /// Get edge by ID
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Get loop by ID
    pub fn get_loop(&self, id: LoopId) -> Option<&Loop> {
        self.loops.get(id)
    }

    /// Get face by ID
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id)
    }

    /// Position of a live vertex.
    pub fn vertex_co(&self, id: VertexId) -> MeshResult<Vec3> {
        self.verts
            .get(id)
            .map(|v| v.co)
            .ok_or_else(|| MeshError::InvalidArgument(format!("vertex {:?} is not live", id)))
    }

    // ========================================================================
    // Cycle walks
    // ========================================================================

    /// Edges around a vertex, in disk-cycle order.
    pub fn vertex_edges(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.verts.get(v).and_then(|vert| vert.e);
        walk_cycle(start, self.edges.slot_count(), move |e| {
            self.edges.get(e)?.disk(v).map(|link| link.next)
        })
    }

    /// Loops on an edge, in radial-cycle order.
    pub fn edge_loops(&self, e: EdgeId) -> impl Iterator<Item = LoopId> + '_ {
        let start = self.edges.get(e).and_then(|edge| edge.l);
        walk_cycle(start, self.loops.slot_count(), move |l| {
            self.loops.get(l).map(|lp| lp.radial_next)
        })
    }

    /// Loops bounding a face, starting at `l_first`.
    pub fn face_loops(&self, f: FaceId) -> impl Iterator<Item = LoopId> + '_ {
        let start = self.faces.get(f).map(|face| face.l_first);
        walk_cycle(start, self.loops.slot_count(), move |l| {
            self.loops.get(l).map(|lp| lp.next)
        })
    }

    // ========================================================================
    // Topology Queries
    // ========================================================================

    /// Boundary vertices of a face in winding order.
    pub fn face_vertices(&self, f: FaceId) -> Vec<VertexId> {
        self.face_loops(f)
            .filter_map(|l| self.loops.get(l).map(|lp| lp.v))
            .collect()
    }

    /// Boundary edges of a face in winding order (`l.e` for each loop).
    pub fn face_edges(&self, f: FaceId) -> Vec<EdgeId> {
        self.face_loops(f)
            .filter_map(|l| self.loops.get(l).map(|lp| lp.e))
            .collect()
    }

    /// Boundary positions of a face in winding order.
    pub fn face_positions(&self, f: FaceId) -> Vec<Vec3> {
        self.face_vertices(f)
            .into_iter()
            .filter_map(|v| self.verts.get(v).map(|vert| vert.co))
            .collect()
    }

    /// Faces using an edge, in radial order.
    pub fn edge_faces(&self, e: EdgeId) -> Vec<FaceId> {
        self.edge_loops(e)
            .filter_map(|l| self.loops.get(l).map(|lp| lp.f))
            .collect()
    }

    /// Faces touching a vertex, each listed once.
    pub fn vertex_faces(&self, v: VertexId) -> Vec<FaceId> {
        let mut faces = Vec::new();
        for e in self.vertex_edges(v) {
            for f in self.edge_faces(e) {
                if !faces.contains(&f) {
                    faces.push(f);
                }
            }
        }
        faces
    }

    /// Vertices sharing an edge with `v`, in disk-cycle order.
    pub fn vertex_neighbors(&self, v: VertexId) -> Vec<VertexId> {
        self.vertex_edges(v)
            .filter_map(|e| self.edges.get(e)?.other(v))
            .collect()
    }

    /// Number of edges incident to `v`.
    pub fn vertex_degree(&self, v: VertexId) -> usize {
        self.vertex_edges(v).count()
    }

    /// The edge connecting `a` and `b`, if any.
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.vertex_edges(a)
            .find(|&e| self.edges.get(e).is_some_and(|edge| edge.other(a) == Some(b)))
    }

    /// The endpoint of `e` that is not `v`.
    pub fn other_vertex(&self, e: EdgeId, v: VertexId) -> MeshResult<VertexId> {
        self.edges.require(e)?;
        self.edges[e].other(v).ok_or_else(|| {
            MeshError::InvalidArgument(format!("{:?} is not an endpoint of {:?}", v, e))
        })
    }

    /// Degree of a face (0 for a dead id).
    pub fn face_len(&self, f: FaceId) -> usize {
        self.faces.get(f).map_or(0, Face::len)
    }

    /// The loop of face `f` whose origin is `v`.
    pub fn face_loop_at(&self, f: FaceId, v: VertexId) -> Option<LoopId> {
        self.face_loops(f)
            .find(|&l| self.loops.get(l).is_some_and(|lp| lp.v == v))
    }

    /// Unit normal of a face by Newell's method.
    pub fn face_normal(&self, f: FaceId) -> Vec3 {
        newell_normal(&self.face_positions(f))
    }

    /// Whether an edge has no faces.
    pub fn is_wire_edge(&self, e: EdgeId) -> bool {
        self.edges.get(e).is_some_and(|edge| edge.l.is_none())
    }

    /// Whether an edge has exactly one face.
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        self.edge_loops(e).count() == 1
    }
}
