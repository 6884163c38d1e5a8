//! Mesh topology store.
//!
//! Vertices, edges, loops and faces live in id-indexed arenas. Adjacency is
//! expressed by three families of index cycles:
//!
//! - the **disk cycle** of a vertex links every edge that uses it,
//! - the **radial cycle** of an edge links every loop (face corner) on it,
//! - the **face cycle** (`next`/`prev`) links the loops bounding a face.
//!
//! Elements are only created and destroyed through the kernel methods in
//! [`construction`](self) and [`modification`](self), which keep all three
//! families consistent. [`Mesh::validate`] checks them after the fact.

mod construction;
mod elements;
mod modification;
mod selection;
mod topology;
mod types;
mod validation;

pub use elements::ElementList;
pub use topology::newell_normal;
pub(crate) use types::NONE;
pub use types::{
    DiskLink, ElemFlags, ElemKind, ElemRef, Edge, EdgeId, Element, ElementId, Face, FaceId, Loop,
    LoopId, LoopPayload, SelectMask, Vertex, VertexId,
};
pub use validation::{Issue, RepairSummary, TopologyProblem, ValidationReport};

/// Polygon mesh with loop, radial and disk adjacency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub(crate) verts: ElementList<VertexId, Vertex>,
    pub(crate) edges: ElementList<EdgeId, Edge>,
    pub(crate) loops: ElementList<LoopId, Loop>,
    pub(crate) faces: ElementList<FaceId, Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verts(&self) -> &ElementList<VertexId, Vertex> {
        &self.verts
    }

    /// Mutable access for selection/active/hide bookkeeping.
    pub fn verts_mut(&mut self) -> &mut ElementList<VertexId, Vertex> {
        &mut self.verts
    }

    pub fn edges(&self) -> &ElementList<EdgeId, Edge> {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut ElementList<EdgeId, Edge> {
        &mut self.edges
    }

    pub fn faces(&self) -> &ElementList<FaceId, Face> {
        &self.faces
    }

    pub fn faces_mut(&mut self) -> &mut ElementList<FaceId, Face> {
        &mut self.faces
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of loops (sum of all face degrees)
    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    /// Number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}


#[cfg(test)]
mod tests {
    use super::test_meshes::*;
    use super::*;

    #[test]
    fn test_unit_square_counts() {
        let (mesh, _, f) = unit_square();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edge_count(), 4);
        assert_eq!(mesh.loop_count(), 4);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face_len(f), 4);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_tetrahedron_is_closed_manifold() {
        let (mesh, _) = tetrahedron();

        assert_eq!(mesh.edge_count(), 6);
        for e in mesh.edges().ids() {
            assert_eq!(mesh.edge_loops(e).count(), 2);
        }
        assert!(mesh.validate().is_ok());
    }
}
