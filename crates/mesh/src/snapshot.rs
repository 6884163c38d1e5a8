//! Binary mesh snapshots used for undo.
//!
//! Layout (integers in host byte order, which must be little-endian;
//! records `#[repr(C)]` Pod):
//!
//! ```text
//! Header
//! vertex arena : u32 slot count, then per slot u8 presence + VertexRecord
//! edge arena   : u32 slot count, then per slot u8 presence + EdgeRecord
//! loop arena   : u32 slot count, then per slot u8 presence + LoopRecord + payload bytes
//! face arena   : u32 slot count, then per slot u8 presence + FaceRecord
//! selection    : for vertices, edges, faces: u32 count, u32 ids, u32 active
//! ```
//!
//! Killed slots are kept so decoded ids are identical to the encoded ones.

use std::collections::BTreeSet;
use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::bmesh::{
    DiskLink, Edge, EdgeId, ElemFlags, ElemKind, Element, ElementId, ElementList, Face, FaceId,
    Loop, LoopId, LoopPayload, Mesh, Vertex, VertexId,
};
use crate::bmesh::NONE;
use crate::error::MeshResult;

/// Magic bytes at the start of every snapshot.
pub const MAGIC: [u8; 4] = *b"PMSH";

/// Current snapshot format version.
pub const VERSION: u16 = 1;

#[cfg(target_endian = "big")]
compile_error!("snapshot records are written in host byte order and assume little-endian");

/// Errors that can occur while decoding a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot truncated at byte {offset}: need {needed}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Not a mesh snapshot (bad magic)")]
    BadMagic,

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("Snapshot references missing {kind:?} {index}")]
    DanglingReference { kind: ElemKind, index: u32 },

    #[error("{0} trailing bytes after snapshot")]
    TrailingBytes(usize),
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Header {
    magic: [u8; 4],
    version: u16,
    _reserved: u16,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct VertexRecord {
    co: [f32; 3],
    flags: u32,
    e: u32,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct EdgeRecord {
    v: [u32; 2],
    /// prev/next for v[0], then prev/next for v[1]
    disk: [u32; 4],
    l: u32,
    flags: u32,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct LoopRecord {
    v: u32,
    e: u32,
    f: u32,
    next: u32,
    prev: u32,
    radial_next: u32,
    radial_prev: u32,
    payload_len: u32,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct FaceRecord {
    l_first: u32,
    len: u32,
    flags: u32,
}

fn pack<I: ElementId>(id: Option<I>) -> u32 {
    id.map_or(NONE, |id| id.index() as u32)
}

fn unpack<I: ElementId>(raw: u32) -> Option<I> {
    (raw != NONE).then(|| I::from_index(raw as usize))
}

// ============================================================================
// Snapshot
// ============================================================================

/// An encoded copy of a whole mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    /// Encode the current state of `mesh`.
    pub fn capture(mesh: &Mesh) -> Self {
        encode(mesh)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Replace `mesh` with the snapshot contents.
    ///
    /// The snapshot is fully decoded first; on error `mesh` is untouched.
    pub fn restore(&self, mesh: &mut Mesh) -> MeshResult<()> {
        *mesh = decode(&self.bytes)?;
        debug!("snapshot restored ({} bytes)", self.bytes.len());
        Ok(())
    }
}

// ============================================================================
// Encoding
// ============================================================================

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn put<T: Pod>(&mut self, value: &T) {
        self.buf.extend_from_slice(bytemuck::bytes_of(value));
    }

    fn put_u32(&mut self, value: u32) {
        self.put(&value);
    }

    fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn put_arena<I: ElementId, T>(
        &mut self,
        list: &ElementList<I, T>,
        mut record: impl FnMut(&mut Self, &T),
    ) {
        self.put_u32(list.slot_count() as u32);
        for slot in &list.slots {
            match slot {
                Some(elem) => {
                    self.put_u8(1);
                    record(self, elem);
                }
                None => self.put_u8(0),
            }
        }
    }

    fn put_selection<I: ElementId, T>(&mut self, list: &ElementList<I, T>) {
        self.put_u32(list.selected_count() as u32);
        for id in list.selected() {
            self.put_u32(id.index() as u32);
        }
        self.put_u32(pack(list.active()));
    }
}

/// Encode a mesh into a snapshot.
pub fn encode(mesh: &Mesh) -> Snapshot {
    let mut w = Writer::default();
    w.put(&Header {
        magic: MAGIC,
        version: VERSION,
        _reserved: 0,
    });

    w.put_arena(&mesh.verts, |w, v| {
        w.put(&VertexRecord {
            co: v.co.to_array(),
            flags: v.flags.bits() as u32,
            e: pack(v.e),
        })
    });
    w.put_arena(&mesh.edges, |w, e| {
        w.put(&EdgeRecord {
            v: [e.v[0].0, e.v[1].0],
            disk: [
                e.disk[0].prev.0,
                e.disk[0].next.0,
                e.disk[1].prev.0,
                e.disk[1].next.0,
            ],
            l: pack(e.l),
            flags: e.flags.bits() as u32,
        })
    });
    w.put_arena(&mesh.loops, |w, l| {
        w.put(&LoopRecord {
            v: l.v.0,
            e: l.e.0,
            f: l.f.0,
            next: l.next.0,
            prev: l.prev.0,
            radial_next: l.radial_next.0,
            radial_prev: l.radial_prev.0,
            payload_len: l.payload.len() as u32,
        });
        w.buf.extend_from_slice(l.payload.as_bytes());
    });
    w.put_arena(&mesh.faces, |w, f| {
        w.put(&FaceRecord {
            l_first: f.l_first.0,
            len: f.len,
            flags: f.flags.bits() as u32,
        })
    });

    w.put_selection(&mesh.verts);
    w.put_selection(&mesh.edges);
    w.put_selection(&mesh.faces);

    debug!("snapshot encoded ({} bytes)", w.buf.len());
    Snapshot { bytes: w.buf }
}

// ============================================================================
// Decoding
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SnapshotError> {
        let available = self.bytes.len() - self.offset;
        if n > available {
            return Err(SnapshotError::Truncated {
                offset: self.offset,
                needed: n,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn read<T: Pod>(&mut self) -> Result<T, SnapshotError> {
        Ok(bytemuck::pod_read_unaligned(self.take(size_of::<T>())?))
    }

    fn read_u32(&mut self) -> Result<u32, SnapshotError> {
        self.read()
    }

    fn read_arena<R>(
        &mut self,
        mut record: impl FnMut(&mut Self) -> Result<R, SnapshotError>,
    ) -> Result<Vec<Option<R>>, SnapshotError> {
        let count = self.read_u32()? as usize;
        // Every slot costs at least its presence byte.
        let remaining = self.bytes.len() - self.offset;
        if count > remaining {
            return Err(SnapshotError::Truncated {
                offset: self.offset,
                needed: count,
                available: remaining,
            });
        }
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let present = self.take(1)?[0] != 0;
            slots.push(if present { Some(record(self)?) } else { None });
        }
        Ok(slots)
    }

    fn read_selection<I: ElementId>(
        &mut self,
    ) -> Result<(BTreeSet<I>, Option<I>), SnapshotError> {
        let count = self.read_u32()? as usize;
        let mut selected = BTreeSet::new();
        for _ in 0..count {
            selected.insert(I::from_index(self.read_u32()? as usize));
        }
        let active = unpack(self.read_u32()?);
        Ok((selected, active))
    }
}

/// Decode a snapshot into a fresh mesh.
///
/// Bounds and every cross reference are checked, then the cycles are
/// walked: damage that [`Mesh::repair`] could not fix is `CorruptState`.
/// The decoded mesh has the same ids and cycle order as the one that was
/// encoded.
pub fn decode(bytes: &[u8]) -> MeshResult<Mesh> {
    let mut r = Reader { bytes, offset: 0 };

    let header: Header = r.read()?;
    if header.magic != MAGIC {
        return Err(SnapshotError::BadMagic.into());
    }
    if header.version != VERSION {
        return Err(SnapshotError::UnsupportedVersion(header.version).into());
    }

    let verts = r.read_arena(|r| {
        let rec: VertexRecord = r.read()?;
        let mut v = Vertex::new(rec.co.into());
        v.flags = ElemFlags::from_bits_truncate(rec.flags as u8);
        v.e = unpack(rec.e);
        Ok(v)
    })?;
    let edges = r.read_arena(|r| {
        let rec: EdgeRecord = r.read()?;
        let mut e = Edge::new(VertexId(rec.v[0]), VertexId(rec.v[1]));
        e.disk = [
            DiskLink {
                prev: EdgeId(rec.disk[0]),
                next: EdgeId(rec.disk[1]),
            },
            DiskLink {
                prev: EdgeId(rec.disk[2]),
                next: EdgeId(rec.disk[3]),
            },
        ];
        e.l = unpack(rec.l);
        e.flags = ElemFlags::from_bits_truncate(rec.flags as u8);
        Ok(e)
    })?;
    let loops = r.read_arena(|r| {
        let rec: LoopRecord = r.read()?;
        let mut l = Loop::new(VertexId(rec.v), EdgeId(rec.e), FaceId(rec.f));
        l.next = LoopId(rec.next);
        l.prev = LoopId(rec.prev);
        l.radial_next = LoopId(rec.radial_next);
        l.radial_prev = LoopId(rec.radial_prev);
        l.payload = LoopPayload::new(r.take(rec.payload_len as usize)?);
        Ok(l)
    })?;
    let faces = r.read_arena(|r| {
        let rec: FaceRecord = r.read()?;
        Ok(Face {
            l_first: LoopId(rec.l_first),
            len: rec.len,
            flags: ElemFlags::from_bits_truncate(rec.flags as u8),
        })
    })?;

    let (vsel, vact) = r.read_selection::<VertexId>()?;
    let (esel, eact) = r.read_selection::<EdgeId>()?;
    let (fsel, fact) = r.read_selection::<FaceId>()?;

    let trailing = bytes.len() - r.offset;
    if trailing != 0 {
        return Err(SnapshotError::TrailingBytes(trailing).into());
    }

    let mesh = Mesh {
        verts: ElementList::from_parts(verts, vsel, vact),
        edges: ElementList::from_parts(edges, esel, eact),
        loops: ElementList::from_parts(loops, BTreeSet::new(), None),
        faces: ElementList::from_parts(faces, fsel, fact),
    };
    check_references(&mesh)?;
    mesh.validate().structural_result()?;

    debug!(
        "snapshot decoded: {} verts, {} edges, {} faces",
        mesh.vertex_count(),
        mesh.edge_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

fn require_live<I: ElementId, T>(list: &ElementList<I, T>, id: I) -> Result<(), SnapshotError> {
    if list.contains(id) {
        Ok(())
    } else {
        Err(SnapshotError::DanglingReference {
            kind: I::KIND,
            index: id.index() as u32,
        })
    }
}

fn require_selection<I: ElementId, T: Element>(
    list: &ElementList<I, T>,
) -> Result<(), SnapshotError> {
    for id in list.selected() {
        require_live(list, id)?;
    }
    if let Some(id) = list.active() {
        require_live(list, id)?;
    }
    Ok(())
}

/// Every id stored in a live record must name a live element.
fn check_references(mesh: &Mesh) -> Result<(), SnapshotError> {
    for (_, v) in mesh.verts.iter() {
        if let Some(e) = v.e {
            require_live(&mesh.edges, e)?;
        }
    }
    for (_, e) in mesh.edges.iter() {
        for v in e.v {
            require_live(&mesh.verts, v)?;
        }
        for link in e.disk {
            require_live(&mesh.edges, link.prev)?;
            require_live(&mesh.edges, link.next)?;
        }
        if let Some(l) = e.l {
            require_live(&mesh.loops, l)?;
        }
    }
    for (_, l) in mesh.loops.iter() {
        require_live(&mesh.verts, l.v)?;
        require_live(&mesh.edges, l.e)?;
        require_live(&mesh.faces, l.f)?;
        for link in [l.next, l.prev, l.radial_next, l.radial_prev] {
            require_live(&mesh.loops, link)?;
        }
    }
    for (_, f) in mesh.faces.iter() {
        require_live(&mesh.loops, f.l_first)?;
    }
    require_selection(&mesh.verts)?;
    require_selection(&mesh.edges)?;
    require_selection(&mesh.faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmesh::test_meshes::*;
    use crate::bmesh::ElemRef;
    use crate::error::MeshError;
    use glam::Vec3;

    #[test]
    fn test_round_trip_fixtures() {
        for mesh in [
            unit_square().0,
            two_quads().0,
            quad_grid().0,
            tetrahedron().0,
            Mesh::new(),
        ] {
            let decoded = decode(encode(&mesh).as_bytes()).unwrap();
            assert_eq!(decoded, mesh);
        }
    }

    #[test]
    fn test_round_trip_keeps_killed_slots_and_selection() {
        let (mut mesh, v) = quad_grid();
        mesh.kill_vertex(v[0]).unwrap();
        mesh.set_select(ElemRef::Vertex(v[8]), true).unwrap();
        mesh.verts_mut().set_active(Some(v[8])).unwrap();
        mesh.verts_mut().set_hidden(v[7], true).unwrap();
        let f = mesh.faces().ids().next().unwrap();
        let l = mesh.face_loops(f).next().unwrap();
        mesh.set_loop_payload(l, LoopPayload::new(vec![1, 2, 3])).unwrap();

        let decoded = decode(encode(&mesh).as_bytes()).unwrap();

        assert_eq!(decoded, mesh);
        assert!(decoded.vertex(v[0]).is_none());
        assert_eq!(decoded.verts().active(), Some(v[8]));
        assert!(decoded.verts().is_hidden(v[7]));
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(&Mesh::new()).into_bytes();
        bytes[0] = b'X';

        assert_eq!(
            decode(&bytes),
            Err(MeshError::Snapshot(SnapshotError::BadMagic))
        );
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = encode(&Mesh::new()).into_bytes();
        bytes[4] = 9;

        assert_eq!(
            decode(&bytes),
            Err(MeshError::Snapshot(SnapshotError::UnsupportedVersion(9)))
        );
    }

    #[test]
    fn test_rejects_truncation_everywhere() {
        let bytes = encode(&unit_square().0).into_bytes();

        for cut in 0..bytes.len() {
            assert!(matches!(
                decode(&bytes[..cut]),
                Err(MeshError::Snapshot(SnapshotError::Truncated { .. }))
            ));
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = encode(&Mesh::new()).into_bytes();
        bytes.extend_from_slice(&[0, 0]);

        assert_eq!(
            decode(&bytes),
            Err(MeshError::Snapshot(SnapshotError::TrailingBytes(2)))
        );
    }

    #[test]
    fn test_rejects_dangling_reference() {
        let (mut mesh, v, _) = unit_square();
        // Point a live vertex at an edge slot that does not exist.
        mesh.verts[v[0]].e = Some(EdgeId(50));

        assert_eq!(
            decode(encode(&mesh).as_bytes()),
            Err(MeshError::Snapshot(SnapshotError::DanglingReference {
                kind: ElemKind::Edge,
                index: 50
            }))
        );
    }

    #[test]
    fn test_rejects_broken_disk_cycle() {
        let mut mesh = Mesh::new();
        let a = mesh.make_vertex(Vec3::ZERO);
        let b = mesh.make_vertex(Vec3::X);
        let c = mesh.make_vertex(Vec3::Y);
        let d = mesh.make_vertex(Vec3::Z);
        let e0 = mesh.make_edge(a, b).unwrap();
        let e1 = mesh.make_edge(c, d).unwrap();
        // Every id is live, but the disk of `a` now runs into an edge that
        // does not touch it.
        mesh.edges[e0].disk[0] = DiskLink { prev: e1, next: e1 };

        assert!(matches!(
            decode(encode(&mesh).as_bytes()),
            Err(MeshError::CorruptState { .. })
        ));
        // The kernel reports the same damage instead of panicking.
        assert!(matches!(
            mesh.kill_vertex(a),
            Err(MeshError::CorruptState { .. })
        ));
    }

    #[test]
    fn test_decodes_repairable_drift() {
        let (mut mesh, _, f) = unit_square();
        mesh.faces[f].len = 9;

        let mut decoded = decode(encode(&mesh).as_bytes()).unwrap();
        assert_eq!(decoded, mesh);

        decoded.repair().unwrap();
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_restore_replaces_or_leaves_untouched() {
        let (mut mesh, v, f) = unit_square();
        let snap = Snapshot::capture(&mesh);
        let original = mesh.clone();

        mesh.kill_face(f).unwrap();
        mesh.kill_vertex(v[2]).unwrap();
        snap.restore(&mut mesh).unwrap();
        assert_eq!(mesh, original);

        let broken = Snapshot::from_bytes(vec![1, 2, 3]);
        assert!(broken.restore(&mut mesh).is_err());
        assert_eq!(mesh, original);
    }
}
