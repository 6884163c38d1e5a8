//! Identity-keyed element arenas with selection bookkeeping.

use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};

use super::types::{ElemFlags, Element, ElementId};
use crate::error::{MeshError, MeshResult};

/// Arena of one element type.
///
/// Killed elements leave an empty slot behind so ids stay stable. The list
/// also tracks which live elements are selected and which one is active.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementList<I: ElementId, T> {
    pub(crate) slots: Vec<Option<T>>,
    pub(crate) live: usize,
    pub(crate) selected: BTreeSet<I>,
    pub(crate) active: Option<I>,
}

impl<I: ElementId, T> Default for ElementList<I, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            selected: BTreeSet::new(),
            active: None,
        }
    }
}

impl<I: ElementId, T> ElementList<I, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a list from raw parts (snapshot decoding).
    pub(crate) fn from_parts(slots: Vec<Option<T>>, selected: BTreeSet<I>, active: Option<I>) -> Self {
        let live = slots.iter().filter(|slot| slot.is_some()).count();
        Self {
            slots,
            live,
            selected,
            active,
        }
    }

    /// Number of live elements
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Size of the id space (live and killed slots)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, id: I) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live elements in id order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|elem| (I::from_index(i), elem)))
    }

    /// Live ids in id order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub(crate) fn insert(&mut self, elem: T) -> I {
        let id = I::from_index(self.slots.len());
        self.slots.push(Some(elem));
        self.live += 1;
        id
    }

    /// Empty the slot of `id`, dropping it from selection and active.
    pub(crate) fn remove(&mut self, id: I) -> Option<T> {
        let elem = self.slots.get_mut(id.index())?.take()?;
        self.live -= 1;
        self.selected.remove(&id);
        if self.active == Some(id) {
            self.active = None;
        }
        Some(elem)
    }

    pub(crate) fn require(&self, id: I) -> MeshResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(MeshError::InvalidArgument(format!(
                "{:?} {:?} is not a live element",
                I::KIND,
                id
            )))
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Selected ids in id order.
    pub fn selected(&self) -> impl Iterator<Item = I> + '_ {
        self.selected.iter().copied()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, id: I) -> bool {
        self.selected.contains(&id)
    }

    pub fn active(&self) -> Option<I> {
        self.active
    }

    /// Set (or clear) the active element. Fails for killed ids.
    pub fn set_active(&mut self, id: Option<I>) -> MeshResult<()> {
        if let Some(id) = id {
            self.require(id)?;
        }
        self.active = id;
        Ok(())
    }
}

impl<I: ElementId, T: Element> ElementList<I, T> {
    /// Select or deselect a live element.
    pub fn set_select(&mut self, id: I, select: bool) -> MeshResult<()> {
        self.require(id)?;
        self[id].flags_mut().set(ElemFlags::SELECT, select);
        if select {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(elem) = slot {
                elem.flags_mut().set(ElemFlags::SELECT, true);
                self.selected.insert(I::from_index(i));
            }
        }
    }

    pub fn select_none(&mut self) {
        for id in std::mem::take(&mut self.selected) {
            if let Some(elem) = self.get_mut(id) {
                elem.flags_mut().set(ElemFlags::SELECT, false);
            }
        }
    }

    pub fn set_hidden(&mut self, id: I, hidden: bool) -> MeshResult<()> {
        self.require(id)?;
        self[id].flags_mut().set(ElemFlags::HIDE, hidden);
        Ok(())
    }

    pub fn is_hidden(&self, id: I) -> bool {
        self.get(id)
            .is_some_and(|elem| elem.flags().contains(ElemFlags::HIDE))
    }

    /// Selected elements that are not hidden, in id order.
    pub fn editable(&self) -> impl Iterator<Item = I> + '_ {
        self.selected().filter(|&id| !self.is_hidden(id))
    }

    /// Copy SELECT/HIDE state from `from` onto `to`.
    pub(crate) fn copy_state(&mut self, from: ElemFlags, to: I) -> MeshResult<()> {
        self.set_select(to, from.contains(ElemFlags::SELECT))?;
        self.set_hidden(to, from.contains(ElemFlags::HIDE))
    }
}

impl<I: ElementId, T> Index<I> for ElementList<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        match self.slots.get(id.index()) {
            Some(Some(elem)) => elem,
            _ => panic!("{:?} {:?} is not a live element", I::KIND, id),
        }
    }
}

impl<I: ElementId, T> IndexMut<I> for ElementList<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        match self.slots.get_mut(id.index()) {
            Some(Some(elem)) => elem,
            _ => panic!("{:?} {:?} is not a live element", I::KIND, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmesh::{Vertex, VertexId};
    use glam::Vec3;

    fn list_with(n: usize) -> ElementList<VertexId, Vertex> {
        let mut list = ElementList::new();
        for i in 0..n {
            list.insert(Vertex::new(Vec3::splat(i as f32)));
        }
        list
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut list = list_with(3);
        list.remove(VertexId(1));
        let id = list.insert(Vertex::new(Vec3::ZERO));

        assert_eq!(id, VertexId(3));
        assert_eq!(list.len(), 3);
        assert_eq!(list.ids().collect::<Vec<_>>(), vec![VertexId(0), VertexId(2), VertexId(3)]);
    }

    #[test]
    fn test_remove_clears_selection_and_active() {
        let mut list = list_with(2);
        list.set_select(VertexId(0), true).unwrap();
        list.set_active(Some(VertexId(0))).unwrap();

        list.remove(VertexId(0));

        assert_eq!(list.selected_count(), 0);
        assert_eq!(list.active(), None);
    }

    #[test]
    fn test_cannot_select_killed_element() {
        let mut list = list_with(2);
        list.remove(VertexId(1));

        assert!(list.set_select(VertexId(1), true).is_err());
        assert!(list.set_active(Some(VertexId(1))).is_err());
    }

    #[test]
    fn test_editable_skips_hidden() {
        let mut list = list_with(3);
        list.select_all();
        list.set_hidden(VertexId(1), true).unwrap();

        assert_eq!(list.editable().collect::<Vec<_>>(), vec![VertexId(0), VertexId(2)]);
    }

    #[test]
    fn test_select_none_clears_flags() {
        let mut list = list_with(2);
        list.select_all();
        list.select_none();

        assert!(list.iter().all(|(_, v)| !v.flags.contains(ElemFlags::SELECT)));
    }
}
