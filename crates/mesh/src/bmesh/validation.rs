//! Consistency checks and conservative repair for Mesh.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use super::elements::ElementList;
use super::types::{
    EdgeId, ElemFlags, ElemKind, Element, ElementId, FaceId, LoopId, VertexId,
};
use super::Mesh;
use crate::error::{MeshError, MeshResult};

/// What is wrong with one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// A field names a killed or out-of-range element
    DanglingReference(&'static str),
    /// The `next`/`prev` cycle does not close, or names another face
    BrokenFaceCycle,
    FaceLengthMismatch { expected: usize, actual: usize },
    /// The boundary visits the same vertex twice
    RepeatedVertex,
    /// Fewer than 3 loops
    DegenerateFace,
    /// `l.e` does not connect `l.v` and `l.next.v`
    LoopSpansWrongEdge,
    /// `radial_prev` is not the inverse of `radial_next`
    BrokenRadialCycle,
    /// The radial cycle and the loops pointing at the edge disagree
    RadialMembership,
    /// Disk links are not mutually inverse
    BrokenDiskCycle,
    /// The disk cycle and the edges incident to the vertex disagree
    DiskMembership,
    /// Both endpoints are the same vertex
    DegenerateEdge,
    /// A selected id is not live
    StaleSelection,
    /// The active id is not live
    StaleActive,
    /// The SELECT flag disagrees with the selected set
    SelectFlagMismatch,
}

impl Issue {
    /// Whether [`Mesh::repair`] can fix this without guessing.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            Self::FaceLengthMismatch { .. }
                | Self::RepeatedVertex
                | Self::DegenerateFace
                | Self::StaleSelection
                | Self::StaleActive
                | Self::SelectFlagMismatch
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference(field) => write!(f, "dangling reference in `{}`", field),
            Self::BrokenFaceCycle => write!(f, "broken face cycle"),
            Self::FaceLengthMismatch { expected, actual } => {
                write!(f, "face length {} but cycle has {} loops", expected, actual)
            }
            Self::RepeatedVertex => write!(f, "boundary repeats a vertex"),
            Self::DegenerateFace => write!(f, "face has fewer than 3 loops"),
            Self::LoopSpansWrongEdge => write!(f, "loop edge does not span its corner"),
            Self::BrokenRadialCycle => write!(f, "broken radial cycle"),
            Self::RadialMembership => write!(f, "radial cycle membership mismatch"),
            Self::BrokenDiskCycle => write!(f, "broken disk cycle"),
            Self::DiskMembership => write!(f, "disk cycle membership mismatch"),
            Self::DegenerateEdge => write!(f, "edge endpoints are equal"),
            Self::StaleSelection => write!(f, "selected id is not live"),
            Self::StaleActive => write!(f, "active id is not live"),
            Self::SelectFlagMismatch => write!(f, "SELECT flag disagrees with selection"),
        }
    }
}

/// One consistency problem found by [`Mesh::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyProblem {
    pub kind: ElemKind,
    pub index: u32,
    pub issue: Issue,
}

impl TopologyProblem {
    fn new<I: ElementId>(id: I, issue: Issue) -> Self {
        Self {
            kind: I::KIND,
            index: id.index() as u32,
            issue,
        }
    }
}

impl fmt::Display for TopologyProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.kind, self.index, self.issue)
    }
}

/// Every problem found by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    problems: Vec<TopologyProblem>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopologyProblem> {
        self.problems.iter()
    }

    /// `Ok` for a clean report, `CorruptState` otherwise.
    pub fn into_result(self) -> MeshResult<()> {
        match self.problems.first() {
            None => Ok(()),
            Some(first) => Err(MeshError::CorruptState {
                count: self.problems.len(),
                first: first.to_string(),
            }),
        }
    }

    /// `CorruptState` if any problem is beyond [`Mesh::repair`].
    ///
    /// A mesh that passes keeps every cycle intact, so kernel edits on it
    /// cannot run into a broken link.
    pub fn structural_result(&self) -> MeshResult<()> {
        match self.problems.iter().find(|p| !p.issue.is_repairable()) {
            None => Ok(()),
            Some(first) => Err(MeshError::CorruptState {
                count: self.problems.iter().filter(|p| !p.issue.is_repairable()).count(),
                first: first.to_string(),
            }),
        }
    }

    fn push<I: ElementId>(&mut self, id: I, issue: Issue) {
        self.problems.push(TopologyProblem::new(id, issue));
    }
}

/// What [`Mesh::repair`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub selection_fixes: usize,
    pub lengths_fixed: usize,
    pub faces_killed: usize,
}

impl RepairSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of walking one face cycle.
struct FaceWalk {
    loops: Vec<LoopId>,
    closed: bool,
}

impl Mesh {
    /// Check every cycle and every cross reference. Never panics.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let on_face = self.check_faces(&mut report);
        self.check_loops(&on_face, &mut report);
        self.check_edges(&mut report);
        self.check_vertices(&mut report);
        check_selection(&self.verts, &mut report);
        check_selection(&self.edges, &mut report);
        check_selection(&self.faces, &mut report);

        if !report.is_ok() {
            debug!("validate: {} problems", report.len());
        }
        report
    }

    /// Fix what can be fixed without guessing, then validate again.
    ///
    /// Stale selection/active entries and SELECT flag drift are corrected,
    /// face lengths are recounted, and faces that repeat a vertex or have
    /// fewer than 3 loops are killed. Anything still wrong afterwards is
    /// reported as `CorruptState`.
    pub fn repair(&mut self) -> MeshResult<RepairSummary> {
        // Broken cycles cannot be fixed without guessing; refuse before mutating.
        self.validate().structural_result()?;

        let mut summary = RepairSummary {
            selection_fixes: repair_selection(&mut self.verts)
                + repair_selection(&mut self.edges)
                + repair_selection(&mut self.faces),
            ..Default::default()
        };

        let faces: Vec<FaceId> = self.faces.ids().collect();
        for f in faces {
            let walk = self.walk_face(f);
            if !walk.closed {
                continue;
            }
            let mut seen = HashSet::new();
            let repeats = walk
                .loops
                .iter()
                .filter_map(|&l| self.loops.get(l))
                .any(|lp| !seen.insert(lp.v));
            if repeats || walk.loops.len() < 3 {
                warn!("repair: killing degenerate face {:?}", f);
                self.kill_face(f)?;
                summary.faces_killed += 1;
                continue;
            }
            if self.faces[f].len as usize != walk.loops.len() {
                warn!(
                    "repair: face {:?} length {} -> {}",
                    f,
                    self.faces[f].len,
                    walk.loops.len()
                );
                self.faces[f].len = walk.loops.len() as u32;
                summary.lengths_fixed += 1;
            }
        }

        debug!("repair: {:?}", summary);
        self.validate().into_result()?;
        Ok(summary)
    }

    fn walk_face(&self, f: FaceId) -> FaceWalk {
        let mut walk = FaceWalk {
            loops: Vec::new(),
            closed: false,
        };
        let Some(face) = self.faces.get(f) else {
            return walk;
        };
        let start = face.l_first;
        let mut cur = start;
        for _ in 0..=self.loops.slot_count() {
            let Some(lp) = self.loops.get(cur) else {
                return walk;
            };
            if lp.f != f {
                return walk;
            }
            walk.loops.push(cur);
            cur = lp.next;
            if cur == start {
                walk.closed = true;
                return walk;
            }
        }
        walk
    }

    /// Face cycles; returns the set of loops reached from a face.
    fn check_faces(&self, report: &mut ValidationReport) -> HashSet<LoopId> {
        let mut on_face = HashSet::new();

        for (f, face) in self.faces.iter() {
            if !self.loops.contains(face.l_first) {
                report.push(f, Issue::DanglingReference("l_first"));
                continue;
            }
            let walk = self.walk_face(f);
            on_face.extend(walk.loops.iter().copied());
            if !walk.closed {
                report.push(f, Issue::BrokenFaceCycle);
                continue;
            }

            let n = walk.loops.len();
            if face.len() != n {
                report.push(
                    f,
                    Issue::FaceLengthMismatch {
                        expected: face.len(),
                        actual: n,
                    },
                );
            }
            if n < 3 {
                report.push(f, Issue::DegenerateFace);
            }

            let mut seen = HashSet::new();
            let mut repeated = false;
            for (i, &l) in walk.loops.iter().enumerate() {
                let lp = &self.loops[l];
                let next = walk.loops[(i + 1) % n];
                if self.loops.get(lp.prev).is_none() || self.loops[next].prev != l {
                    report.push(l, Issue::BrokenFaceCycle);
                }
                if !seen.insert(lp.v) {
                    repeated = true;
                }
                let next_v = self.loops[next].v;
                match self.edges.get(lp.e) {
                    Some(edge) => {
                        if !(edge.has_vertex(lp.v) && edge.has_vertex(next_v)) {
                            report.push(l, Issue::LoopSpansWrongEdge);
                        }
                    }
                    None => report.push(l, Issue::DanglingReference("e")),
                }
                if !self.verts.contains(lp.v) {
                    report.push(l, Issue::DanglingReference("v"));
                }
            }
            if repeated {
                report.push(f, Issue::RepeatedVertex);
            }
        }
        on_face
    }

    fn check_loops(&self, on_face: &HashSet<LoopId>, report: &mut ValidationReport) {
        for (l, lp) in self.loops.iter() {
            if !self.faces.contains(lp.f) {
                report.push(l, Issue::DanglingReference("f"));
            } else if !on_face.contains(&l) {
                report.push(l, Issue::BrokenFaceCycle);
            }
            match (self.loops.get(lp.radial_next), self.loops.get(lp.radial_prev)) {
                (Some(next), Some(_)) => {
                    if next.radial_prev != l {
                        report.push(l, Issue::BrokenRadialCycle);
                    }
                }
                _ => report.push(l, Issue::DanglingReference("radial")),
            }
        }
    }

    fn check_edges(&self, report: &mut ValidationReport) {
        let mut pointing: HashMap<EdgeId, usize> = HashMap::new();
        for (_, lp) in self.loops.iter() {
            *pointing.entry(lp.e).or_default() += 1;
        }

        for (e, edge) in self.edges.iter() {
            let [v1, v2] = edge.v;
            if v1 == v2 {
                report.push(e, Issue::DegenerateEdge);
            }
            for (i, v) in edge.v.into_iter().enumerate() {
                if !self.verts.contains(v) {
                    report.push(e, Issue::DanglingReference("v"));
                    continue;
                }
                let link = edge.disk[i];
                let next_ok = self
                    .edges
                    .get(link.next)
                    .and_then(|next| next.disk(v))
                    .is_some_and(|back| back.prev == e);
                let prev_ok = self
                    .edges
                    .get(link.prev)
                    .and_then(|prev| prev.disk(v))
                    .is_some_and(|back| back.next == e);
                if !(next_ok && prev_ok) {
                    report.push(e, Issue::BrokenDiskCycle);
                }
            }

            let expected = pointing.get(&e).copied().unwrap_or(0);
            let mut walked = 0;
            let mut consistent = true;
            if let Some(start) = edge.l {
                let mut cur = start;
                loop {
                    match self.loops.get(cur) {
                        Some(lp) if lp.e == e => {
                            walked += 1;
                            cur = lp.radial_next;
                        }
                        _ => {
                            consistent = false;
                            break;
                        }
                    }
                    if cur == start {
                        break;
                    }
                    if walked > expected {
                        consistent = false;
                        break;
                    }
                }
            }
            if !consistent || walked != expected {
                report.push(e, Issue::RadialMembership);
            }
        }
    }

    fn check_vertices(&self, report: &mut ValidationReport) {
        let mut incident: HashMap<VertexId, usize> = HashMap::new();
        for (_, edge) in self.edges.iter() {
            for v in edge.v {
                *incident.entry(v).or_default() += 1;
            }
        }

        for (v, vert) in self.verts.iter() {
            let expected = incident.get(&v).copied().unwrap_or(0);
            let Some(start) = vert.e else {
                if expected != 0 {
                    report.push(v, Issue::DiskMembership);
                }
                continue;
            };
            if !self.edges.get(start).is_some_and(|edge| edge.has_vertex(v)) {
                report.push(v, Issue::DanglingReference("e"));
                continue;
            }

            let mut walked = 0;
            let mut consistent = true;
            let mut cur = start;
            loop {
                match self.edges.get(cur).and_then(|edge| edge.disk(v)) {
                    Some(link) => {
                        walked += 1;
                        cur = link.next;
                    }
                    None => {
                        consistent = false;
                        break;
                    }
                }
                if cur == start {
                    break;
                }
                if walked > expected {
                    consistent = false;
                    break;
                }
            }
            if !consistent || walked != expected {
                report.push(v, Issue::DiskMembership);
            }
        }
    }
}

fn check_selection<I: ElementId, T: Element>(
    list: &ElementList<I, T>,
    report: &mut ValidationReport,
) {
    for id in list.selected() {
        if !list.contains(id) {
            report.push(id, Issue::StaleSelection);
        }
    }
    if let Some(id) = list.active() {
        if !list.contains(id) {
            report.push(id, Issue::StaleActive);
        }
    }
    for (id, elem) in list.iter() {
        if elem.flags().contains(ElemFlags::SELECT) != list.is_selected(id) {
            report.push(id, Issue::SelectFlagMismatch);
        }
    }
}

/// Drop stale ids and resync SELECT flags; returns the number of fixes.
fn repair_selection<I: ElementId, T: Element>(list: &mut ElementList<I, T>) -> usize {
    let mut fixes = 0;

    let stale: Vec<I> = list.selected().filter(|&id| !list.contains(id)).collect();
    for id in stale {
        warn!("repair: dropping stale selection {:?}", id);
        list.selected.remove(&id);
        fixes += 1;
    }
    if list.active.is_some_and(|id| !list.contains(id)) {
        warn!("repair: clearing stale active {:?}", list.active);
        list.active = None;
        fixes += 1;
    }

    let ElementList {
        slots, selected, ..
    } = list;
    for (i, slot) in slots.iter_mut().enumerate() {
        if let Some(elem) = slot {
            let in_set = selected.contains(&I::from_index(i));
            if elem.flags().contains(ElemFlags::SELECT) != in_set {
                elem.flags_mut().set(ElemFlags::SELECT, in_set);
                fixes += 1;
            }
        }
    }
    fixes
}
