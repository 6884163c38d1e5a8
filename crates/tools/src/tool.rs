//! Tool invocation and the per-command undo state machine.

use std::collections::BTreeSet;

use glam::Vec3;
use polymesh::ops;
use polymesh::{Mesh, SelectMask, Snapshot, VertexId};
use tracing::{debug, trace, warn};

use crate::context::{ChangeCause, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::property::{PropertyKind, PropertyValue, ToolArgs};
use crate::registry::ToolId;

// =============================================================================
// Tools
// =============================================================================

/// A fully parameterised tool, ready to run against a mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshTool {
    SplitEdge { steps: u32 },
    DissolveVertex,
    Delete { mask: SelectMask },
    Triangulate,
    ExtrudeVertex { co: Vec3 },
    MakeFace { budget: usize },
    FixWindings,
    Repair,
    VertexSmooth { factor: f32, repeat: u32 },
    ReverseEdge,
    Duplicate,
    Translate { offset: Vec3 },
}

impl MeshTool {
    pub fn id(&self) -> ToolId {
        match self {
            Self::SplitEdge { .. } => ToolId::SplitEdge,
            Self::DissolveVertex => ToolId::DissolveVertex,
            Self::Delete { .. } => ToolId::Delete,
            Self::Triangulate => ToolId::Triangulate,
            Self::ExtrudeVertex { .. } => ToolId::ExtrudeVertex,
            Self::MakeFace { .. } => ToolId::MakeFace,
            Self::FixWindings => ToolId::FixWindings,
            Self::Repair => ToolId::Repair,
            Self::VertexSmooth { .. } => ToolId::VertexSmooth,
            Self::ReverseEdge => ToolId::ReverseEdge,
            Self::Duplicate => ToolId::Duplicate,
            Self::Translate { .. } => ToolId::Translate,
        }
    }

    /// Run the operator on the selected, visible elements of `mesh`.
    pub fn exec(&self, mesh: &mut Mesh) -> ToolResult<()> {
        match self {
            Self::SplitEdge { steps } => {
                let created = ops::split_selected_edges(mesh, *steps)?;
                debug!("split_edge: {} vertices created", created.len());
            }
            Self::DissolveVertex => {
                let verts: Vec<VertexId> = mesh.verts().editable().collect();
                for v in verts {
                    ops::dissolve_vertex(mesh, v)?;
                }
            }
            Self::Delete { mask } => {
                ops::delete_selected(mesh, *mask)?;
            }
            Self::Triangulate => {
                ops::triangulate_all(mesh)?;
            }
            Self::ExtrudeVertex { co } => {
                ops::extrude_vertex(mesh, *co)?;
            }
            Self::MakeFace { budget } => {
                let report = ops::make_face_from_selection(mesh, *budget)?;
                if !report.aborted.is_empty() {
                    warn!(
                        "make_face: {} segments aborted",
                        report.aborted.len()
                    );
                }
            }
            Self::FixWindings => {
                ops::fix_windings(mesh)?;
            }
            Self::Repair => {
                let summary = mesh.repair()?;
                if !summary.is_empty() {
                    warn!("repair: {:?}", summary);
                }
            }
            Self::VertexSmooth { factor, repeat } => {
                let verts: Vec<VertexId> = mesh.verts().editable().collect();
                for _ in 0..*repeat {
                    ops::vertex_smooth(mesh, &verts, *factor)?;
                }
            }
            Self::ReverseEdge => {
                ops::reverse_edges(mesh)?;
            }
            Self::Duplicate => {
                ops::duplicate_selected(mesh)?;
            }
            Self::Translate { offset } => {
                let verts = editable_vertices(mesh);
                ops::translate(mesh, &verts, *offset)?;
            }
        }
        Ok(())
    }
}

/// Vertices of every selected, visible element.
fn editable_vertices(mesh: &Mesh) -> Vec<VertexId> {
    let mut verts: BTreeSet<VertexId> = mesh.verts().editable().collect();
    for e in mesh.edges().editable() {
        if let Some(edge) = mesh.edge(e) {
            verts.extend(edge.verts());
        }
    }
    for f in mesh.faces().editable() {
        verts.extend(mesh.face_vertices(f));
    }
    verts.into_iter().collect()
}

// =============================================================================
// Undo state machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Created,
    Executed,
    Undone,
}

/// One tool with the snapshot needed to take it back.
#[derive(Debug, Clone)]
pub struct ToolOp {
    tool: MeshTool,
    state: ToolState,
    snapshot: Option<Snapshot>,
}

impl ToolOp {
    pub fn new(tool: MeshTool) -> Self {
        Self {
            tool,
            state: ToolState::Created,
            snapshot: None,
        }
    }

    pub fn tool(&self) -> &MeshTool {
        &self.tool
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    /// Capture the mesh as it is before `exec`.
    pub fn undo_pre(&mut self, ctx: &ToolContext) {
        let snapshot = Snapshot::capture(&ctx.mesh);
        trace!("{}: snapshot of {} bytes", self.tool.id(), snapshot.len());
        self.snapshot = Some(snapshot);
    }

    /// Run the tool. On failure the mesh is put back to the snapshot.
    pub fn exec(&mut self, ctx: &mut ToolContext) -> ToolResult<()> {
        if self.state == ToolState::Executed {
            return Err(ToolError::InvalidState(format!(
                "{} has already been executed",
                self.tool.id()
            )));
        }
        if let Err(err) = self.tool.exec(&mut ctx.mesh) {
            warn!("{} failed: {}", self.tool.id(), err);
            if let Some(snapshot) = &self.snapshot {
                snapshot.restore(&mut ctx.mesh)?;
            }
            return Err(err);
        }
        self.state = ToolState::Executed;
        Ok(())
    }

    /// Tell listeners the topology changed.
    pub fn exec_post(&self, ctx: &ToolContext, cause: ChangeCause) {
        ctx.notify(self.tool.id(), cause);
    }

    /// Restore the mesh from the pre-exec snapshot.
    pub fn undo(&mut self, ctx: &mut ToolContext) -> ToolResult<()> {
        if self.state != ToolState::Executed {
            return Err(ToolError::InvalidState(format!(
                "{} is not executed",
                self.tool.id()
            )));
        }
        let snapshot = self.snapshot.as_ref().ok_or_else(|| {
            ToolError::InvalidState(format!("{} has no snapshot", self.tool.id()))
        })?;
        snapshot.restore(&mut ctx.mesh)?;
        self.state = ToolState::Undone;
        Ok(())
    }
}

/// Several tools executed and undone as one unit.
#[derive(Debug, Clone)]
pub struct ToolMacro {
    id: ToolId,
    ops: Vec<ToolOp>,
}

impl ToolMacro {
    pub fn new(id: ToolId, tools: impl IntoIterator<Item = MeshTool>) -> Self {
        Self {
            id,
            ops: tools.into_iter().map(ToolOp::new).collect(),
        }
    }

    pub fn id(&self) -> ToolId {
        self.id
    }

    pub fn ops(&self) -> &[ToolOp] {
        &self.ops
    }
}

#[derive(Debug, Clone)]
enum Unit {
    Op(ToolOp),
    Macro(ToolMacro),
}

/// A validated tool call: a single op or a macro, undone as one step.
#[derive(Debug, Clone)]
pub struct Invocation {
    id: ToolId,
    /// Arguments with every default filled in
    args: ToolArgs,
    unit: Unit,
}

impl Invocation {
    pub fn id(&self) -> ToolId {
        self.id
    }

    pub fn args(&self) -> &ToolArgs {
        &self.args
    }

    pub fn is_macro(&self) -> bool {
        matches!(self.unit, Unit::Macro(_))
    }

    /// Tools in execution order
    pub fn tools(&self) -> Vec<&MeshTool> {
        match &self.unit {
            Unit::Op(op) => vec![op.tool()],
            Unit::Macro(m) => m.ops.iter().map(ToolOp::tool).collect(),
        }
    }

    /// Snapshot and execute every step; a failing step leaves the mesh as it
    /// was before the first.
    pub(crate) fn run(&mut self, ctx: &mut ToolContext) -> ToolResult<()> {
        match &mut self.unit {
            Unit::Op(op) => {
                op.undo_pre(ctx);
                op.exec(ctx)
            }
            Unit::Macro(m) => {
                for i in 0..m.ops.len() {
                    m.ops[i].undo_pre(ctx);
                    if let Err(err) = m.ops[i].exec(ctx) {
                        for done in m.ops[..i].iter_mut().rev() {
                            done.undo(ctx)?;
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }

    pub(crate) fn undo(&mut self, ctx: &mut ToolContext) -> ToolResult<()> {
        match &mut self.unit {
            Unit::Op(op) => op.undo(ctx),
            Unit::Macro(m) => {
                for op in m.ops.iter_mut().rev() {
                    op.undo(ctx)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn exec_post(&self, ctx: &ToolContext, cause: ChangeCause) {
        ctx.notify(self.id, cause);
    }
}

// =============================================================================
// Invocation
// =============================================================================

/// Validate `args` against the schema of `id` and build the invocation.
///
/// Missing parameters are filled from the last executed value (for
/// remember-last parameters), then the schema default, then the context
/// (the select mask of `mesh.delete`). Nothing is mutated.
pub fn invoke(ctx: &ToolContext, id: ToolId, args: &ToolArgs) -> ToolResult<Invocation> {
    let def = id.def(&ctx.config);

    if let Some((name, _)) = args.iter().find(|(name, _)| def.property(name).is_none()) {
        return Err(ToolError::InvalidArgument(format!(
            "{} has no parameter {}",
            id, name
        )));
    }

    let mut resolved = ToolArgs::new();
    for prop in &def.properties {
        let value = match args.get(&prop.name) {
            Some(given) => given.clone(),
            None => prop
                .remember_last
                .then(|| ctx.last_value(id, &prop.name))
                .flatten()
                .or(prop.default.as_ref())
                .cloned()
                .or_else(|| context_default(ctx, &prop.kind))
                .ok_or_else(|| {
                    ToolError::InvalidArgument(format!("{}: {} is required", id, prop.name))
                })?,
        };
        // Filled-in values come from config and history, so they are checked too.
        let value = prop.kind.check(&prop.name, &value)?;
        resolved.insert(&prop.name, value);
    }

    let unit = match id {
        ToolId::SplitEdge => Unit::Op(ToolOp::new(MeshTool::SplitEdge {
            steps: int_param(&resolved, "steps")?,
        })),
        ToolId::DissolveVertex => Unit::Op(ToolOp::new(MeshTool::DissolveVertex)),
        ToolId::Delete => {
            let bits = int_param(&resolved, "sel_mask")?;
            let mask = SelectMask::from_bits(bits).ok_or_else(|| {
                ToolError::InvalidArgument(format!("sel_mask: {:#b} is not a mask", bits))
            })?;
            Unit::Op(ToolOp::new(MeshTool::Delete { mask }))
        }
        ToolId::Triangulate => Unit::Op(ToolOp::new(MeshTool::Triangulate)),
        ToolId::ExtrudeVertex => Unit::Op(ToolOp::new(MeshTool::ExtrudeVertex {
            co: resolved.vec3("co")?,
        })),
        ToolId::MakeFace => Unit::Op(ToolOp::new(MeshTool::MakeFace {
            budget: ctx.config.make_face_visit_budget,
        })),
        ToolId::FixWindings => Unit::Op(ToolOp::new(MeshTool::FixWindings)),
        ToolId::Repair => Unit::Op(ToolOp::new(MeshTool::Repair)),
        ToolId::VertexSmooth => Unit::Op(ToolOp::new(MeshTool::VertexSmooth {
            factor: resolved.float("factor")? as f32,
            repeat: int_param(&resolved, "repeat")?,
        })),
        ToolId::ReverseEdge => Unit::Op(ToolOp::new(MeshTool::ReverseEdge)),
        ToolId::Duplicate => {
            if resolved.bool("do_transform")? {
                Unit::Macro(ToolMacro::new(
                    id,
                    [
                        MeshTool::Duplicate,
                        MeshTool::Translate {
                            offset: resolved.vec3("offset")?,
                        },
                    ],
                ))
            } else {
                Unit::Op(ToolOp::new(MeshTool::Duplicate))
            }
        }
        ToolId::Translate => Unit::Op(ToolOp::new(MeshTool::Translate {
            offset: resolved.vec3("offset")?,
        })),
    };

    trace!("invoke {}: {:?}", id, resolved);
    Ok(Invocation {
        id,
        args: resolved,
        unit,
    })
}

fn context_default(ctx: &ToolContext, kind: &PropertyKind) -> Option<PropertyValue> {
    match kind {
        PropertyKind::Flags { .. } => Some(PropertyValue::Int(i64::from(ctx.select_mask.bits()))),
        _ => None,
    }
}

fn int_param(args: &ToolArgs, name: &str) -> ToolResult<u32> {
    let value = args.int(name)?;
    u32::try_from(value)
        .map_err(|_| ToolError::InvalidArgument(format!("{}: {} does not fit", name, value)))
}
