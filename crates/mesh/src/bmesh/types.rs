//! Type definitions for the mesh topology store.

use std::fmt;
use std::hash::Hash;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Packed "no element" marker used by snapshot records and unlinked cycles.
pub(crate) const NONE: u32 = u32::MAX;

/// Element type tag, used in diagnostics and selection masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElemKind {
    Vertex,
    Edge,
    Loop,
    Face,
}

/// Common behaviour of the typed element identifiers.
///
/// Ids are slot indices into the owning arena. They are handed out in
/// increasing order and never reused, so iteration by id is creation order.
pub trait ElementId: Copy + Eq + Ord + Hash + fmt::Debug {
    const KIND: ElemKind;

    fn from_index(index: usize) -> Self;

    fn index(self) -> usize;
}

macro_rules! define_element_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl ElementId for $name {
            const KIND: ElemKind = $kind;

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_element_id!(
    /// Type-safe vertex identifier
    VertexId,
    ElemKind::Vertex
);
define_element_id!(
    /// Type-safe edge identifier
    EdgeId,
    ElemKind::Edge
);
define_element_id!(
    /// Type-safe loop (face corner) identifier
    LoopId,
    ElemKind::Loop
);
define_element_id!(
    /// Type-safe face identifier
    FaceId,
    ElemKind::Face
);

/// Per-element flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElemFlags(u8);

impl ElemFlags {
    pub const SELECT: Self = Self(1);
    pub const HIDE: Self = Self(1 << 1);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Rebuild flags from raw bits, dropping unknown bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & (Self::SELECT.0 | Self::HIDE.0))
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

/// Bitmask over the selectable element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectMask(u32);

impl SelectMask {
    pub const VERTEX: Self = Self(1);
    pub const EDGE: Self = Self(1 << 1);
    pub const FACE: Self = Self(1 << 2);
    pub const ALL: Self = Self(Self::VERTEX.0 | Self::EDGE.0 | Self::FACE.0);

    /// Returns `None` when bits outside vertex/edge/face are set.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for SelectMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Reference to any selectable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElemRef {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
}

impl From<VertexId> for ElemRef {
    fn from(id: VertexId) -> Self {
        Self::Vertex(id)
    }
}

impl From<EdgeId> for ElemRef {
    fn from(id: EdgeId) -> Self {
        Self::Edge(id)
    }
}

impl From<FaceId> for ElemRef {
    fn from(id: FaceId) -> Self {
        Self::Face(id)
    }
}

/// Elements that carry flag bits (and can therefore be selected).
pub trait Element {
    fn flags(&self) -> ElemFlags;

    fn flags_mut(&mut self) -> &mut ElemFlags;
}

/// Neighbours of an edge inside the disk cycle of one of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskLink {
    pub prev: EdgeId,
    pub next: EdgeId,
}

impl DiskLink {
    pub(crate) const UNLINKED: Self = Self {
        prev: EdgeId(NONE),
        next: EdgeId(NONE),
    };
}

/// A vertex in the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub co: Vec3,
    pub(crate) flags: ElemFlags,
    /// Entry into the disk cycle (None for a loose vertex)
    pub(crate) e: Option<EdgeId>,
}

impl Vertex {
    pub(crate) fn new(co: Vec3) -> Self {
        Self {
            co,
            flags: ElemFlags::empty(),
            e: None,
        }
    }

    /// One incident edge, if any.
    pub fn edge(&self) -> Option<EdgeId> {
        self.e
    }
}

/// An edge between two distinct vertices.
///
/// `disk[i]` links this edge into the disk cycle of `v[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub(crate) v: [VertexId; 2],
    pub(crate) disk: [DiskLink; 2],
    pub(crate) flags: ElemFlags,
    /// Entry into the radial cycle (None for a wire edge)
    pub(crate) l: Option<LoopId>,
}

impl Edge {
    pub(crate) fn new(v1: VertexId, v2: VertexId) -> Self {
        Self {
            v: [v1, v2],
            disk: [DiskLink::UNLINKED; 2],
            flags: ElemFlags::empty(),
            l: None,
        }
    }

    pub fn v1(&self) -> VertexId {
        self.v[0]
    }

    pub fn v2(&self) -> VertexId {
        self.v[1]
    }

    pub fn verts(&self) -> [VertexId; 2] {
        self.v
    }

    pub fn has_vertex(&self, v: VertexId) -> bool {
        self.v[0] == v || self.v[1] == v
    }

    /// The endpoint that is not `v`, or None if `v` is not an endpoint.
    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if self.v[0] == v {
            Some(self.v[1])
        } else if self.v[1] == v {
            Some(self.v[0])
        } else {
            None
        }
    }

    /// One loop of the radial cycle, if any face uses this edge.
    pub fn first_loop(&self) -> Option<LoopId> {
        self.l
    }

    /// Disk link for endpoint `v`.
    pub fn disk(&self, v: VertexId) -> Option<DiskLink> {
        self.end_index(v).map(|i| self.disk[i])
    }

    pub(crate) fn end_index(&self, v: VertexId) -> Option<usize> {
        self.v.iter().position(|&end| end == v)
    }
}

/// Opaque per-loop attribute payload (UVs, colours, ...).
///
/// The kernel copies it verbatim and never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct LoopPayload(Vec<u8>);

impl LoopPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A loop: one corner of a face, i.e. a directed half-edge bound to the face.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Origin vertex
    pub(crate) v: VertexId,
    pub(crate) e: EdgeId,
    pub(crate) f: FaceId,
    /// Next/previous loop around the face
    pub(crate) next: LoopId,
    pub(crate) prev: LoopId,
    /// Next/previous loop around the edge
    pub(crate) radial_next: LoopId,
    pub(crate) radial_prev: LoopId,
    pub(crate) payload: LoopPayload,
}

impl Loop {
    pub(crate) fn new(v: VertexId, e: EdgeId, f: FaceId) -> Self {
        Self {
            v,
            e,
            f,
            next: LoopId(NONE),
            prev: LoopId(NONE),
            radial_next: LoopId(NONE),
            radial_prev: LoopId(NONE),
            payload: LoopPayload::default(),
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.v
    }

    pub fn edge(&self) -> EdgeId {
        self.e
    }

    pub fn face(&self) -> FaceId {
        self.f
    }

    pub fn next(&self) -> LoopId {
        self.next
    }

    pub fn prev(&self) -> LoopId {
        self.prev
    }

    pub fn radial_next(&self) -> LoopId {
        self.radial_next
    }

    pub fn radial_prev(&self) -> LoopId {
        self.radial_prev
    }

    pub fn payload(&self) -> &LoopPayload {
        &self.payload
    }
}

/// A face (polygon) in the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Entry into the boundary loop cycle
    pub(crate) l_first: LoopId,
    /// Number of loops in the boundary cycle
    pub(crate) len: u32,
    pub(crate) flags: ElemFlags,
}

impl Face {
    pub fn first_loop(&self) -> LoopId {
        self.l_first
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Element for Vertex {
    fn flags(&self) -> ElemFlags {
        self.flags
    }

    fn flags_mut(&mut self) -> &mut ElemFlags {
        &mut self.flags
    }
}

impl Element for Edge {
    fn flags(&self) -> ElemFlags {
        self.flags
    }

    fn flags_mut(&mut self) -> &mut ElemFlags {
        &mut self.flags
    }
}

impl Element for Face {
    fn flags(&self) -> ElemFlags {
        self.flags
    }

    fn flags_mut(&mut self) -> &mut ElemFlags {
        &mut self.flags
    }
}
