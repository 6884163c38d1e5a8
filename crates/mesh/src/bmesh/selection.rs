//! Mesh-level selection helpers spanning the three selectable element lists.

use super::types::{ElemFlags, ElemRef, Element};
use super::Mesh;
use crate::error::MeshResult;

impl Mesh {
    /// Select or deselect any live element.
    pub fn set_select(&mut self, elem: ElemRef, select: bool) -> MeshResult<()> {
        match elem {
            ElemRef::Vertex(v) => self.verts.set_select(v, select),
            ElemRef::Edge(e) => self.edges.set_select(e, select),
            ElemRef::Face(f) => self.faces.set_select(f, select),
        }
    }

    pub fn is_selected(&self, elem: ElemRef) -> bool {
        match elem {
            ElemRef::Vertex(v) => self.verts.is_selected(v),
            ElemRef::Edge(e) => self.edges.is_selected(e),
            ElemRef::Face(f) => self.faces.is_selected(f),
        }
    }

    /// Flags of a live element.
    pub fn elem_flags(&self, elem: ElemRef) -> Option<ElemFlags> {
        match elem {
            ElemRef::Vertex(v) => self.verts.get(v).map(Element::flags),
            ElemRef::Edge(e) => self.edges.get(e).map(Element::flags),
            ElemRef::Face(f) => self.faces.get(f).map(Element::flags),
        }
    }

    /// Deselect everything (active elements are kept).
    pub fn select_none(&mut self) {
        self.verts.select_none();
        self.edges.select_none();
        self.faces.select_none();
    }

    pub fn select_all(&mut self) {
        self.verts.select_all();
        self.edges.select_all();
        self.faces.select_all();
    }

    /// Currently selected elements: vertices, then edges, then faces.
    pub fn selected_elems(&self) -> Vec<ElemRef> {
        self.verts
            .selected()
            .map(ElemRef::from)
            .chain(self.edges.selected().map(ElemRef::from))
            .chain(self.faces.selected().map(ElemRef::from))
            .collect()
    }
}
