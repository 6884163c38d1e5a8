//! Duplicate a subgraph of the mesh.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::bmesh::{
    EdgeId, ElemRef, Element, ElementId, ElementList, FaceId, LoopId, Mesh, VertexId,
};
use crate::error::{MeshError, MeshResult};

/// Original -> copy for every duplicated element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateMap {
    pub verts: BTreeMap<VertexId, VertexId>,
    pub edges: BTreeMap<EdgeId, EdgeId>,
    pub faces: BTreeMap<FaceId, FaceId>,
}

impl DuplicateMap {
    /// Total number of copies
    pub fn len(&self) -> usize {
        self.verts.len() + self.edges.len() + self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The copy of `elem`, if it was duplicated.
    pub fn get(&self, elem: ElemRef) -> Option<ElemRef> {
        match elem {
            ElemRef::Vertex(v) => self.verts.get(&v).map(|&c| ElemRef::Vertex(c)),
            ElemRef::Edge(e) => self.edges.get(&e).map(|&c| ElemRef::Edge(c)),
            ElemRef::Face(f) => self.faces.get(&f).map(|&c| ElemRef::Face(c)),
        }
    }

    /// New vertices in original id order.
    pub fn new_verts(&self) -> Vec<VertexId> {
        self.verts.values().copied().collect()
    }
}

/// Copy `geom` as a new, disconnected subgraph.
///
/// Only adjacency among the given elements is mirrored: an edge is copied
/// when both endpoints are in `geom`, a face when all of its vertices and
/// boundary edges are. Anything else referencing uncopied elements is
/// skipped. Copies keep edge orientation, face winding and loop payloads.
/// Active elements that were copied move to the copy; copied originals are
/// deselected and their copies selected.
pub fn duplicate(mesh: &mut Mesh, geom: &[ElemRef]) -> MeshResult<DuplicateMap> {
    // ===== PHASE 1: RESTRICT (read-only) =====
    let mut faces = BTreeSet::new();
    let mut edges = BTreeSet::new();
    let mut verts = BTreeSet::new();
    for &elem in geom {
        if mesh.elem_flags(elem).is_none() {
            return Err(MeshError::InvalidArgument(format!(
                "{:?} is not a live element",
                elem
            )));
        }
        match elem {
            ElemRef::Vertex(v) => verts.insert(v),
            ElemRef::Edge(e) => edges.insert(e),
            ElemRef::Face(f) => faces.insert(f),
        };
    }
    let given = edges.len() + faces.len();
    edges.retain(|&e| mesh.edges[e].verts().iter().all(|v| verts.contains(v)));
    faces.retain(|&f| {
        mesh.face_vertices(f).iter().all(|v| verts.contains(v))
            && mesh.face_edges(f).iter().all(|e| edges.contains(e))
    });
    let skipped = given - edges.len() - faces.len();
    if skipped > 0 {
        debug!("duplicate: skipping {} elements with uncopied references", skipped);
    }

    // ===== PHASE 2: COPY =====
    let mut map = DuplicateMap::default();
    for &v in &verts {
        let copy = mesh.make_vertex(mesh.verts[v].co);
        map.verts.insert(v, copy);
    }
    for &e in &edges {
        let [a, b] = mesh.edges[e].verts();
        let copy = mesh.make_edge(map.verts[&a], map.verts[&b])?;
        map.edges.insert(e, copy);
    }
    for &f in &faces {
        let boundary: Vec<VertexId> = mesh
            .face_vertices(f)
            .iter()
            .map(|v| map.verts[v])
            .collect();
        let copy = mesh.make_face(&boundary)?;
        let pairs: Vec<(LoopId, LoopId)> = mesh.face_loops(f).zip(mesh.face_loops(copy)).collect();
        for (src, dst) in pairs {
            mesh.copy_loop_payload(dst, src)?;
        }
        map.faces.insert(f, copy);
    }

    // ===== PHASE 3: SELECTION =====
    move_selection(&mut mesh.verts, &map.verts)?;
    move_selection(&mut mesh.edges, &map.edges)?;
    move_selection(&mut mesh.faces, &map.faces)?;

    debug!(
        "duplicate: {} verts, {} edges, {} faces",
        map.verts.len(),
        map.edges.len(),
        map.faces.len()
    );
    Ok(map)
}

/// Duplicate every selected, visible element.
pub fn duplicate_selected(mesh: &mut Mesh) -> MeshResult<DuplicateMap> {
    let geom: Vec<ElemRef> = mesh
        .verts()
        .editable()
        .map(ElemRef::from)
        .chain(mesh.edges().editable().map(ElemRef::from))
        .chain(mesh.faces().editable().map(ElemRef::from))
        .collect();
    duplicate(mesh, &geom)
}

fn move_selection<I: ElementId, T: Element>(
    list: &mut ElementList<I, T>,
    map: &BTreeMap<I, I>,
) -> MeshResult<()> {
    if let Some(copy) = list.active().and_then(|a| map.get(&a)) {
        list.set_active(Some(*copy))?;
    }
    for (&orig, &copy) in map {
        list.set_select(orig, false)?;
        list.set_select(copy, true)?;
    }
    Ok(())
}
