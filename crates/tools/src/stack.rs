//! Undo/redo history of executed tools.

use std::collections::VecDeque;

use polymesh::Mesh;
use tracing::{debug, info};

use crate::context::{ChangeCause, TopologyChanged, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::property::ToolArgs;
use crate::registry::ToolId;
use crate::tool::{Invocation, invoke};

/// Owns the editing context and the history of executed invocations.
#[derive(Debug, Default)]
pub struct ToolStack {
    ctx: ToolContext,
    /// Executed invocations, oldest first
    undo_stack: VecDeque<Invocation>,
    /// Undone invocations, most recently undone last
    redo_stack: Vec<Invocation>,
}

impl ToolStack {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn ctx(&self) -> &ToolContext {
        &self.ctx
    }

    /// Direct access for selection changes and other edits made outside
    /// tools. Such edits are not recorded in the history.
    pub fn ctx_mut(&mut self) -> &mut ToolContext {
        &mut self.ctx
    }

    pub fn mesh(&self) -> &Mesh {
        &self.ctx.mesh
    }

    pub fn on_topology_changed(&mut self, listener: impl Fn(&TopologyChanged) + 'static) {
        self.ctx.on_topology_changed(listener);
    }

    /// Validate a tool call against the current context without running it.
    pub fn invoke(&self, id: ToolId, args: &ToolArgs) -> ToolResult<Invocation> {
        invoke(&self.ctx, id, args)
    }

    /// Invoke and execute in one step.
    pub fn run(&mut self, id: ToolId, args: &ToolArgs) -> ToolResult<()> {
        let invocation = self.invoke(id, args)?;
        self.execute(invocation)
    }

    /// Execute an invocation and record it as one undo step.
    ///
    /// On failure the mesh is unchanged and nothing is recorded. On success
    /// the redo history is discarded.
    pub fn execute(&mut self, mut invocation: Invocation) -> ToolResult<()> {
        invocation.run(&mut self.ctx)?;
        self.ctx.remember(invocation.id(), invocation.args());
        invocation.exec_post(&self.ctx, ChangeCause::Exec);

        self.redo_stack.clear();
        if !self.ctx.config.undo_enabled() {
            debug!("Undo disabled, not recording {}", invocation.id());
            return Ok(());
        }
        self.undo_stack.push_back(invocation);
        let limit = self.ctx.config.max_undo_levels;
        while self.undo_stack.len() > limit {
            if let Some(dropped) = self.undo_stack.pop_front() {
                debug!("Undo history full, dropping {}", dropped.id());
            }
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Put the mesh back to the state before the last executed tool.
    pub fn undo(&mut self) -> ToolResult<ToolId> {
        let Some(mut invocation) = self.undo_stack.pop_back() else {
            debug!("Undo: no entries available");
            return Err(ToolError::NothingToUndo);
        };
        if let Err(err) = invocation.undo(&mut self.ctx) {
            self.undo_stack.push_back(invocation);
            return Err(err);
        }

        let id = invocation.id();
        info!("Undo {}", id);
        invocation.exec_post(&self.ctx, ChangeCause::Undo);
        self.redo_stack.push(invocation);
        Ok(id)
    }

    /// Run the most recently undone tool again on the restored state.
    pub fn redo(&mut self) -> ToolResult<ToolId> {
        let Some(mut invocation) = self.redo_stack.pop() else {
            debug!("Redo: no entries available");
            return Err(ToolError::NothingToRedo);
        };
        if let Err(err) = invocation.run(&mut self.ctx) {
            // The redo tail no longer applies.
            self.redo_stack.clear();
            return Err(err);
        }

        let id = invocation.id();
        info!("Redo {}", id);
        invocation.exec_post(&self.ctx, ChangeCause::Redo);
        self.undo_stack.push_back(invocation);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use polyedit_config::EditorConfig;
    use polymesh::ElemRef;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stack_with_square(config: EditorConfig) -> ToolStack {
        let mut mesh = Mesh::new();
        let v: Vec<_> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| mesh.make_vertex(Vec3::new(x, y, 0.0)))
            .collect();
        let f = mesh.make_face(&v).unwrap();
        mesh.set_select(ElemRef::Face(f), true).unwrap();
        ToolStack::new(ToolContext::new(mesh, config))
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut stack = stack_with_square(EditorConfig::default());
        let original = stack.mesh().clone();

        stack.run(ToolId::Triangulate, &ToolArgs::new()).unwrap();
        let triangulated = stack.mesh().clone();
        assert_eq!(triangulated.face_count(), 2);

        assert_eq!(stack.undo().unwrap(), ToolId::Triangulate);
        assert_eq!(*stack.mesh(), original);
        assert!(stack.can_redo());

        assert_eq!(stack.redo().unwrap(), ToolId::Triangulate);
        assert_eq!(*stack.mesh(), triangulated);
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_empty_history_errors() {
        let mut stack = ToolStack::default();
        assert!(matches!(stack.undo(), Err(ToolError::NothingToUndo)));
        assert!(matches!(stack.redo(), Err(ToolError::NothingToRedo)));
    }

    #[test]
    fn test_new_tool_discards_redo() {
        let mut stack = stack_with_square(EditorConfig::default());
        stack.run(ToolId::FixWindings, &ToolArgs::new()).unwrap();
        stack.undo().unwrap();

        stack.run(ToolId::Triangulate, &ToolArgs::new()).unwrap();

        assert!(!stack.can_redo());
        assert_eq!(stack.undo_count(), 1);
    }

    #[test]
    fn test_history_is_capped() {
        let config = EditorConfig {
            max_undo_levels: 2,
            ..EditorConfig::default()
        };
        let mut stack = stack_with_square(config);
        let offset = ToolArgs::new().with("offset", Vec3::X);

        for _ in 0..4 {
            stack.run(ToolId::Translate, &offset).unwrap();
        }

        assert_eq!(stack.undo_count(), 2);
        stack.undo().unwrap();
        stack.undo().unwrap();
        assert!(!stack.can_undo());
        // Two of four moves remain.
        let v = stack.mesh().verts().ids().next().unwrap();
        assert_eq!(stack.mesh().vertex(v).unwrap().co.x, 2.0);
    }

    #[test]
    fn test_zero_undo_levels_records_nothing() {
        let config = EditorConfig {
            max_undo_levels: 0,
            ..EditorConfig::default()
        };
        let mut stack = stack_with_square(config);

        stack.run(ToolId::Triangulate, &ToolArgs::new()).unwrap();

        assert_eq!(stack.mesh().face_count(), 2);
        assert!(!stack.can_undo());
        assert!(matches!(stack.undo(), Err(ToolError::NothingToUndo)));
    }

    #[test]
    fn test_rejected_invocation_is_not_recorded() {
        let mut stack = stack_with_square(EditorConfig::default());
        let before = stack.mesh().clone();

        let bad = ToolArgs::new().with("sel_mask", 0);
        assert!(matches!(
            stack.run(ToolId::Delete, &bad),
            Err(ToolError::InvalidArgument(_))
        ));

        assert_eq!(*stack.mesh(), before);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_remembered_values_feed_next_invocation() {
        let mut stack = stack_with_square(EditorConfig::default());
        let e = stack.mesh().edges().ids().next().unwrap();
        stack
            .ctx_mut()
            .mesh
            .set_select(ElemRef::Edge(e), true)
            .unwrap();

        stack
            .run(ToolId::SplitEdge, &ToolArgs::new().with("steps", 3))
            .unwrap();
        let next = stack.invoke(ToolId::SplitEdge, &ToolArgs::new()).unwrap();

        assert_eq!(next.args().int("steps").unwrap(), 3);
    }

    #[test]
    fn test_listeners_see_every_change() {
        let mut stack = stack_with_square(EditorConfig::default());
        let events: Rc<RefCell<Vec<TopologyChanged>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        stack.on_topology_changed(move |event| sink.borrow_mut().push(*event));

        stack.run(ToolId::Triangulate, &ToolArgs::new()).unwrap();
        stack.undo().unwrap();
        stack.redo().unwrap();

        let causes: Vec<ChangeCause> = events.borrow().iter().map(|e| e.cause).collect();
        assert_eq!(
            causes,
            vec![ChangeCause::Exec, ChangeCause::Undo, ChangeCause::Redo]
        );
        assert_eq!(events.borrow()[1].counts.faces, 1);
    }

    #[test]
    fn test_duplicate_macro_is_one_undo_step() {
        let mut stack = stack_with_square(EditorConfig::default());
        stack.ctx_mut().mesh.select_all();
        let original = stack.mesh().clone();
        let args = ToolArgs::new().with("offset", Vec3::new(0.0, 0.0, 2.0));

        stack.run(ToolId::Duplicate, &args).unwrap();

        assert_eq!(stack.mesh().face_count(), 2);
        assert_eq!(stack.undo_count(), 1);
        let copy = stack.mesh().faces().selected().next().unwrap();
        assert!(stack
            .mesh()
            .face_positions(copy)
            .iter()
            .all(|p| p.z == 2.0));

        stack.undo().unwrap();
        assert_eq!(*stack.mesh(), original);
    }
}
