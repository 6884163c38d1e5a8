//! Destructive and in-place editing methods for Mesh.

use glam::Vec3;
use tracing::trace;

use super::types::{EdgeId, FaceId, Loop, LoopId, LoopPayload, VertexId};
use super::Mesh;
use crate::error::MeshResult;

impl Mesh {
    // ========================================================================
    // Destructors
    // ========================================================================

    /// Kill a face and its loops. Edges and vertices are kept.
    pub fn kill_face(&mut self, f: FaceId) -> MeshResult<()> {
        self.faces.require(f)?;

        let loops: Vec<LoopId> = self.face_loops(f).collect();
        for &l in &loops {
            self.radial_remove(l);
        }
        for l in loops {
            self.loops.remove(l);
        }
        self.faces.remove(f);

        trace!("kill_face: {:?}", f);
        Ok(())
    }

    /// Kill an edge and every face that uses it. Endpoints are kept.
    pub fn kill_edge(&mut self, e: EdgeId) -> MeshResult<()> {
        self.edges.require(e)?;

        for f in self.edge_faces(e) {
            self.kill_face(f)?;
        }
        let [v1, v2] = self.edges[e].v;
        self.disk_remove(e, v1)?;
        self.disk_remove(e, v2)?;
        self.edges.remove(e);

        trace!("kill_edge: {:?}", e);
        Ok(())
    }

    /// Kill a vertex together with its edges and their faces.
    pub fn kill_vertex(&mut self, v: VertexId) -> MeshResult<()> {
        self.verts.require(v)?;

        let edges: Vec<EdgeId> = self.vertex_edges(v).collect();
        for e in edges {
            self.kill_edge(e)?;
        }
        self.verts.remove(v);

        trace!("kill_vertex: {:?}", v);
        Ok(())
    }

    // ========================================================================
    // In-place edits
    // ========================================================================

    pub fn set_vertex_co(&mut self, v: VertexId, co: Vec3) -> MeshResult<()> {
        self.verts.require(v)?;
        self.verts[v].co = co;
        Ok(())
    }

    pub fn set_loop_payload(&mut self, l: LoopId, payload: LoopPayload) -> MeshResult<()> {
        self.loops.require(l)?;
        self.loops[l].payload = payload;
        Ok(())
    }

    /// Copy the attribute payload of loop `src` onto loop `dst`.
    pub fn copy_loop_payload(&mut self, dst: LoopId, src: LoopId) -> MeshResult<()> {
        self.loops.require(dst)?;
        self.loops.require(src)?;
        if dst != src {
            self.loops[dst].payload = self.loops[src].payload.clone();
        }
        Ok(())
    }

    /// Reverse the winding of a face in place.
    ///
    /// Each loop keeps its edge and takes over the vertex (and payload) of
    /// its old `next`. `l_first` moves one step forward so that the first
    /// three corners come out in exactly reversed order.
    pub fn reverse_winding(&mut self, f: FaceId) -> MeshResult<()> {
        self.faces.require(f)?;

        let loops: Vec<LoopId> = self.face_loops(f).collect();
        let n = loops.len();
        let corners: Vec<(VertexId, LoopPayload)> = loops
            .iter()
            .map(|&l| (self.loops[l].v, self.loops[l].payload.clone()))
            .collect();

        for (i, &l) in loops.iter().enumerate() {
            let (v, payload) = corners[(i + 1) % n].clone();
            let lp = &mut self.loops[l];
            lp.v = v;
            lp.payload = payload;
            std::mem::swap(&mut lp.next, &mut lp.prev);
        }
        self.faces[f].l_first = loops[1 % n];

        trace!("reverse_winding: {:?}", f);
        Ok(())
    }

    /// Swap the endpoints of an edge. Face windings are not affected.
    pub fn reverse_edge(&mut self, e: EdgeId) -> MeshResult<()> {
        self.edges.require(e)?;
        let edge = &mut self.edges[e];
        edge.v.swap(0, 1);
        edge.disk.swap(0, 1);
        Ok(())
    }

    /// Split an edge at parameter `t` (0 = v1, 1 = v2).
    ///
    /// The original edge becomes `(v1, new)` and the returned edge is
    /// `(new, v2)`. Every face on the edge gains the new vertex at the same
    /// cyclic position, so windings are preserved.
    pub fn split_edge(&mut self, e: EdgeId, t: f32) -> MeshResult<(VertexId, EdgeId)> {
        self.edges.require(e)?;

        let [v1, v2] = self.edges[e].v;
        let co = self.verts[v1].co.lerp(self.verts[v2].co, t);
        let nv = self.make_vertex(co);

        // Re-point the original edge at the new vertex.
        self.disk_remove(e, v2)?;
        self.edges[e].v[1] = nv;
        self.disk_append(e, nv)?;
        let ne = self.make_edge_unchecked(nv, v2)?;

        let loops: Vec<LoopId> = self.edge_loops(e).collect();
        for l in loops {
            let f = self.loops[l].f;
            let nl = if self.loops[l].v == v1 {
                // v1 -> v2 becomes v1 -> nv (e), nv -> v2 (ne)
                let nl = self.loops.insert(Loop::new(nv, ne, f));
                self.loop_link_after(l, nl);
                self.radial_append(nl, ne);
                nl
            } else {
                // v2 -> v1 becomes v2 -> nv (ne), nv -> v1 (e)
                self.radial_remove(l);
                self.radial_append(l, ne);
                let nl = self.loops.insert(Loop::new(nv, e, f));
                self.loop_link_after(l, nl);
                self.radial_append(nl, e);
                nl
            };
            self.loops[nl].payload = self.loops[l].payload.clone();
            self.faces[f].len += 1;
        }

        let flags = self.edges[e].flags;
        self.edges.copy_state(flags, ne)?;
        self.verts.copy_state(flags, nv)?;

        trace!("split_edge: {:?} at {} -> {:?}, {:?}", e, t, nv, ne);
        Ok((nv, ne))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmesh::test_meshes::*;
    use crate::bmesh::ElemRef;

    #[test]
    fn test_kill_face_keeps_edges_and_vertices() {
        let (mut mesh, _, f) = unit_square();

        mesh.kill_face(f).unwrap();

        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.loop_count(), 0);
        assert_eq!(mesh.edge_count(), 4);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.edges().ids().all(|e| mesh.is_wire_edge(e)));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_kill_edge_kills_adjacent_faces() {
        let (mut mesh, v, [_, f1]) = two_quads();
        let shared = mesh.edge_between(v[1], v[2]).unwrap();

        mesh.kill_edge(shared).unwrap();

        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.edge_count(), 6);
        assert!(mesh.face(f1).is_none());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_kill_vertex_cascades() {
        let (mut mesh, v) = quad_grid();

        mesh.kill_vertex(v[4]).unwrap();

        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.edge_count(), 8);
        assert_eq!(mesh.face_count(), 0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_kill_clears_selection_and_active() {
        let (mut mesh, _, f) = unit_square();
        mesh.set_select(ElemRef::Face(f), true).unwrap();
        mesh.faces_mut().set_active(Some(f)).unwrap();

        mesh.kill_face(f).unwrap();

        assert_eq!(mesh.faces().selected_count(), 0);
        assert_eq!(mesh.faces().active(), None);
        assert!(mesh.kill_face(f).is_err());
    }

    #[test]
    fn test_reverse_winding_reverses_first_corners() {
        let (mut mesh, v, f) = unit_square();

        mesh.reverse_winding(f).unwrap();

        let order = mesh.face_vertices(f);
        assert_eq!(order, vec![v[2], v[1], v[0], v[3]]);
        assert!(mesh.validate().is_ok());

        mesh.reverse_winding(f).unwrap();
        let cyc = mesh.face_vertices(f);
        let start = cyc.iter().position(|&x| x == v[0]).unwrap();
        let rotated: Vec<_> = (0..4).map(|i| cyc[(start + i) % 4]).collect();
        assert_eq!(rotated, v.to_vec());
    }

    #[test]
    fn test_reverse_winding_moves_payloads_with_vertices() {
        let (mut mesh, v, f) = unit_square();
        for l in mesh.face_loops(f).collect::<Vec<_>>() {
            let origin = mesh.get_loop(l).unwrap().vertex();
            mesh.set_loop_payload(l, LoopPayload::new(vec![origin.0 as u8]))
                .unwrap();
        }

        mesh.reverse_winding(f).unwrap();

        for l in mesh.face_loops(f) {
            let lp = mesh.get_loop(l).unwrap();
            assert_eq!(lp.payload().as_bytes(), &[lp.vertex().0 as u8]);
        }
        assert_eq!(mesh.face_len(f), v.len());
    }

    #[test]
    fn test_reverse_edge_keeps_disk_cycles() {
        let (mut mesh, v, _) = unit_square();
        let e = mesh.edge_between(v[0], v[1]).unwrap();

        mesh.reverse_edge(e).unwrap();

        assert_eq!(mesh.edge(e).unwrap().verts(), [v[1], v[0]]);
        assert_eq!(mesh.edge_between(v[0], v[1]), Some(e));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_split_edge_threads_both_faces() {
        let (mut mesh, v, [f0, f1]) = two_quads();
        let shared = mesh.edge_between(v[1], v[2]).unwrap();

        let (nv, ne) = mesh.split_edge(shared, 0.5).unwrap();

        assert_eq!(mesh.vertex(nv).unwrap().co, Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(mesh.edge(ne).unwrap().verts(), [nv, v[2]]);
        assert_eq!(mesh.face_vertices(f0), vec![v[0], v[1], nv, v[2], v[3]]);
        assert_eq!(mesh.face_vertices(f1), vec![v[1], v[4], v[5], v[2], nv]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_split_selected_edge_selects_new_elements() {
        let (mut mesh, v, _) = unit_square();
        let e = mesh.edge_between(v[0], v[1]).unwrap();
        mesh.set_select(ElemRef::Edge(e), true).unwrap();

        let (nv, ne) = mesh.split_edge(e, 0.25).unwrap();

        assert!(mesh.edges().is_selected(ne));
        assert!(mesh.verts().is_selected(nv));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_copy_loop_payload() {
        let (mut mesh, _, f) = unit_square();
        let loops: Vec<_> = mesh.face_loops(f).collect();
        mesh.set_loop_payload(loops[0], LoopPayload::new(b"uv".to_vec()))
            .unwrap();

        mesh.copy_loop_payload(loops[2], loops[0]).unwrap();

        assert_eq!(mesh.get_loop(loops[2]).unwrap().payload().as_bytes(), b"uv");
    }
}
