//! Construction methods for Mesh: element constructors and cycle splicing.

use std::collections::HashSet;

use glam::Vec3;
use tracing::trace;

use super::types::{Edge, EdgeId, Face, FaceId, Loop, LoopId, NONE, VertexId, Vertex};
use super::Mesh;
use crate::error::{MeshError, MeshResult};

impl Mesh {
    /// Create a loose vertex.
    pub fn make_vertex(&mut self, co: Vec3) -> VertexId {
        let v = self.verts.insert(Vertex::new(co));
        trace!("make_vertex: {:?} at {:?}", v, co);
        v
    }

    /// Create an edge between two distinct vertices.
    ///
    /// If the vertices are already connected the existing edge is returned;
    /// the mesh never holds two edges between the same pair.
    pub fn make_edge(&mut self, v1: VertexId, v2: VertexId) -> MeshResult<EdgeId> {
        self.verts.require(v1)?;
        self.verts.require(v2)?;
        if v1 == v2 {
            return Err(MeshError::InvalidTopology(format!(
                "edge endpoints must differ, got {:?} twice",
                v1
            )));
        }

        if let Some(e) = self.edge_between(v1, v2) {
            return Ok(e);
        }
        self.make_edge_unchecked(v1, v2)
    }

    /// Create an edge without the liveness/duplicate checks.
    pub(crate) fn make_edge_unchecked(&mut self, v1: VertexId, v2: VertexId) -> MeshResult<EdgeId> {
        let e = self.edges.insert(Edge::new(v1, v2));
        self.disk_append(e, v1)?;
        self.disk_append(e, v2)?;
        trace!("make_edge: {:?} ({:?} -> {:?})", e, v1, v2);
        Ok(e)
    }

    /// Create a face whose boundary visits `verts` in order.
    ///
    /// Edges between consecutive vertices are reused when they exist and
    /// created otherwise. Every check happens before anything is mutated.
    pub fn make_face(&mut self, verts: &[VertexId]) -> MeshResult<FaceId> {
        // ===== PHASE 1: VALIDATE (read-only, fail early) =====
        if verts.len() < 3 {
            return Err(MeshError::InvalidTopology(format!(
                "a face needs at least 3 vertices, got {}",
                verts.len()
            )));
        }
        let mut seen = HashSet::with_capacity(verts.len());
        for &v in verts {
            self.verts.require(v)?;
            if !seen.insert(v) {
                return Err(MeshError::InvalidTopology(format!(
                    "vertex {:?} appears twice in a face boundary",
                    v
                )));
            }
        }

        // ===== PHASE 2: BOUNDARY EDGES =====
        let n = verts.len();
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            let e = match self.edge_between(a, b) {
                Some(e) => e,
                None => self.make_edge_unchecked(a, b)?,
            };
            edges.push(e);
        }

        // ===== PHASE 3: FACE AND LOOPS =====
        let f = self.faces.insert(Face {
            l_first: LoopId(NONE),
            len: n as u32,
            flags: Default::default(),
        });
        let loops: Vec<LoopId> = verts
            .iter()
            .zip(&edges)
            .map(|(&v, &e)| self.loops.insert(Loop::new(v, e, f)))
            .collect();

        for i in 0..n {
            let l = loops[i];
            self.loops[l].next = loops[(i + 1) % n];
            self.loops[l].prev = loops[(i + n - 1) % n];
            self.radial_append(l, edges[i]);
        }
        self.faces[f].l_first = loops[0];

        trace!("make_face: {:?} with {} vertices", f, n);
        Ok(f)
    }

    // ========================================================================
    // Cycle splicing
    // ========================================================================

    /// Link `e` into the disk cycle of its endpoint `v` (at the tail).
    pub(crate) fn disk_append(&mut self, e: EdgeId, v: VertexId) -> MeshResult<()> {
        match self.verts[v].e {
            None => {
                self.verts[v].e = Some(e);
                let link = self.disk_link_mut(e, v)?;
                link.prev = e;
                link.next = e;
            }
            Some(first) => {
                let last = self.disk_link_mut(first, v)?.prev;
                {
                    let link = self.disk_link_mut(e, v)?;
                    link.prev = last;
                    link.next = first;
                }
                self.disk_link_mut(last, v)?.next = e;
                self.disk_link_mut(first, v)?.prev = e;
            }
        }
        Ok(())
    }

    /// Unlink `e` from the disk cycle of its endpoint `v`.
    pub(crate) fn disk_remove(&mut self, e: EdgeId, v: VertexId) -> MeshResult<()> {
        let link = *self.disk_link_mut(e, v)?;
        if link.next == e {
            self.verts[v].e = None;
        } else {
            self.disk_link_mut(link.prev, v)?.next = link.next;
            self.disk_link_mut(link.next, v)?.prev = link.prev;
            if self.verts[v].e == Some(e) {
                self.verts[v].e = Some(link.next);
            }
        }
        *self.disk_link_mut(e, v)? = super::DiskLink::UNLINKED;
        Ok(())
    }

    /// Disk link of `e` at `v`; a broken cycle surfaces as `CorruptState`.
    fn disk_link_mut(&mut self, e: EdgeId, v: VertexId) -> MeshResult<&mut super::DiskLink> {
        let corrupt = || MeshError::CorruptState {
            count: 1,
            first: format!("disk cycle of {:?} reaches {:?}", v, e),
        };
        let edge = self.edges.get_mut(e).ok_or_else(corrupt)?;
        let i = edge.end_index(v).ok_or_else(corrupt)?;
        Ok(&mut edge.disk[i])
    }

    /// Link loop `l` into the radial cycle of `e` and point it at `e`.
    pub(crate) fn radial_append(&mut self, l: LoopId, e: EdgeId) {
        self.loops[l].e = e;
        match self.edges[e].l {
            None => {
                self.edges[e].l = Some(l);
                self.loops[l].radial_next = l;
                self.loops[l].radial_prev = l;
            }
            Some(first) => {
                let last = self.loops[first].radial_prev;
                self.loops[l].radial_prev = last;
                self.loops[l].radial_next = first;
                self.loops[last].radial_next = l;
                self.loops[first].radial_prev = l;
            }
        }
    }

    /// Unlink loop `l` from the radial cycle of its edge.
    pub(crate) fn radial_remove(&mut self, l: LoopId) {
        let e = self.loops[l].e;
        let (prev, next) = (self.loops[l].radial_prev, self.loops[l].radial_next);
        if next == l {
            self.edges[e].l = None;
        } else {
            self.loops[prev].radial_next = next;
            self.loops[next].radial_prev = prev;
            if self.edges[e].l == Some(l) {
                self.edges[e].l = Some(next);
            }
        }
        self.loops[l].radial_next = l;
        self.loops[l].radial_prev = l;
    }

    /// Insert `new` into the face cycle right after `l`.
    pub(crate) fn loop_link_after(&mut self, l: LoopId, new: LoopId) {
        let next = self.loops[l].next;
        self.loops[new].prev = l;
        self.loops[new].next = next;
        self.loops[l].next = new;
        self.loops[next].prev = new;
    }
}
