//! Parent/pane placement of widgets.
//!
//! Placements are kept apart from the widgets themselves: a widget with no
//! entry sits on the root canvas. Children of each `(parent, slot)` pair are
//! stored in insertion order, which is the order the serializer and the code
//! generator observe.

use crate::widget::WidgetId;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

/// Where inside its parent a widget sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Directly inside the parent (layouts).
    #[default]
    None,
    /// Pane `n` of a Container.
    Pane(usize),
    /// Tab `n` of a Tabs widget.
    Tab(usize),
}

impl Slot {
    pub fn index(&self) -> Option<usize> {
        match self {
            Slot::None => None,
            Slot::Pane(i) | Slot::Tab(i) => Some(*i),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub parent: WidgetId,
    pub slot: Slot,
}

impl Placement {
    pub fn container_pane(&self) -> Option<usize> {
        match self.slot {
            Slot::Pane(i) => Some(i),
            _ => None,
        }
    }

    pub fn tab_pane(&self) -> Option<usize> {
        match self.slot {
            Slot::Tab(i) => Some(i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("widget {0} cannot be placed in a pane without a parent")]
    SlotWithoutParent(WidgetId),
    #[error("placing {child} under {parent} would make it its own ancestor")]
    Cycle { child: WidgetId, parent: WidgetId },
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    roots: Vec<WidgetId>,
    placements: IndexMap<WidgetId, Placement>,
    children: IndexMap<(WidgetId, Slot), Vec<WidgetId>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new widget on the root canvas.
    pub fn insert_root(&mut self, id: &WidgetId) {
        if !self.placements.contains_key(id) && !self.roots.contains(id) {
            self.roots.push(id.clone());
        }
    }

    /// Places `id` under `parent` in `slot`, or detaches it to the root canvas
    /// when both are absent. Re-placing into the same slot keeps its position.
    pub fn place(
        &mut self,
        id: &WidgetId,
        parent: Option<&WidgetId>,
        slot: Slot,
    ) -> Result<(), HierarchyError> {
        let Some(parent) = parent else {
            if slot != Slot::None {
                return Err(HierarchyError::SlotWithoutParent(id.clone()));
            }
            self.detach(id);
            self.insert_root(id);
            return Ok(());
        };

        if self.is_ancestor_or_self(id, parent) {
            return Err(HierarchyError::Cycle {
                child: id.clone(),
                parent: parent.clone(),
            });
        }

        let placement = Placement {
            parent: parent.clone(),
            slot,
        };
        if self.placements.get(id) == Some(&placement) {
            return Ok(());
        }

        self.detach(id);
        self.roots.retain(|r| r != id);
        self.children
            .entry((parent.clone(), slot))
            .or_default()
            .push(id.clone());
        debug!(widget = %id, parent = %parent, ?slot, "placed widget");
        self.placements.insert(id.clone(), placement);
        Ok(())
    }

    /// Drops all bookkeeping for `id`. Children placed under it keep their
    /// placements; callers relocate them first.
    pub fn remove(&mut self, id: &WidgetId) {
        self.detach(id);
        self.roots.retain(|r| r != id);
    }

    pub fn parent_info(&self, id: &WidgetId) -> Option<&Placement> {
        self.placements.get(id)
    }

    pub fn children_of(&self, parent: &WidgetId, slot: Slot) -> &[WidgetId] {
        self.children
            .get(&(parent.clone(), slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every direct child of `parent` regardless of slot, slots in ascending order.
    pub fn all_children_of(&self, parent: &WidgetId) -> Vec<WidgetId> {
        let mut slots: Vec<Slot> = self
            .children
            .keys()
            .filter(|(p, _)| p == parent)
            .map(|(_, slot)| *slot)
            .collect();
        slots.sort();
        slots
            .into_iter()
            .flat_map(|slot| self.children_of(parent, slot).to_vec())
            .collect()
    }

    pub fn roots(&self) -> &[WidgetId] {
        &self.roots
    }

    pub fn is_root(&self, id: &WidgetId) -> bool {
        self.roots.contains(id)
    }

    /// True when `candidate` is `of` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, candidate: &WidgetId, of: &WidgetId) -> bool {
        let mut current = Some(of);
        let mut steps = 0;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.placements.len() {
                break;
            }
            current = self.placements.get(id).map(|p| &p.parent);
        }
        false
    }

    /// Shifts children of panes after `removed` down by one. The removed
    /// pane itself must already be empty.
    pub fn close_gap(&mut self, parent: &WidgetId, removed: Slot) {
        let Some(removed_index) = removed.index() else {
            return;
        };
        let mut moved: Vec<(Slot, Vec<WidgetId>)> = Vec::new();
        self.children.retain(|(p, slot), ids| {
            let shift = p == parent
                && std::mem::discriminant(slot) == std::mem::discriminant(&removed)
                && slot.index().is_some_and(|i| i > removed_index);
            if shift {
                moved.push((*slot, std::mem::take(ids)));
            }
            !shift
        });
        for (slot, ids) in moved {
            let target = match slot {
                Slot::Pane(i) => Slot::Pane(i - 1),
                Slot::Tab(i) => Slot::Tab(i - 1),
                Slot::None => Slot::None,
            };
            for id in &ids {
                if let Some(p) = self.placements.get_mut(id) {
                    p.slot = target;
                }
            }
            self.children.insert((parent.clone(), target), ids);
        }
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.placements.clear();
        self.children.clear();
    }

    fn detach(&mut self, id: &WidgetId) {
        if let Some(old) = self.placements.shift_remove(id) {
            let key = (old.parent, old.slot);
            if let Some(list) = self.children.get_mut(&key) {
                list.retain(|c| c != id);
                if list.is_empty() {
                    self.children.shift_remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> WidgetId {
        WidgetId::new(s)
    }

    #[test]
    fn test_place_and_children_order() {
        let mut h = Hierarchy::new();
        for name in ["c", "a", "b"] {
            h.insert_root(&id(name));
        }
        h.place(&id("a"), Some(&id("c")), Slot::Pane(0)).unwrap();
        h.place(&id("b"), Some(&id("c")), Slot::Pane(0)).unwrap();

        assert_eq!(h.children_of(&id("c"), Slot::Pane(0)), &[id("a"), id("b")]);
        assert_eq!(h.roots(), &[id("c")]);
        let info = h.parent_info(&id("b")).unwrap();
        assert_eq!(info.parent, id("c"));
        assert_eq!(info.container_pane(), Some(0));
        assert_eq!(info.tab_pane(), None);
    }

    #[test]
    fn test_replacing_in_same_slot_keeps_position() {
        let mut h = Hierarchy::new();
        h.place(&id("a"), Some(&id("p")), Slot::Tab(1)).unwrap();
        h.place(&id("b"), Some(&id("p")), Slot::Tab(1)).unwrap();
        h.place(&id("a"), Some(&id("p")), Slot::Tab(1)).unwrap();
        assert_eq!(h.children_of(&id("p"), Slot::Tab(1)), &[id("a"), id("b")]);
    }

    #[test]
    fn test_detach_to_root() {
        let mut h = Hierarchy::new();
        h.insert_root(&id("p"));
        h.place(&id("a"), Some(&id("p")), Slot::None).unwrap();
        h.place(&id("a"), None, Slot::None).unwrap();
        assert!(h.parent_info(&id("a")).is_none());
        assert!(h.children_of(&id("p"), Slot::None).is_empty());
        assert_eq!(h.roots(), &[id("p"), id("a")]);
    }

    #[test]
    fn test_slot_without_parent_is_rejected() {
        let mut h = Hierarchy::new();
        assert_eq!(
            h.place(&id("a"), None, Slot::Pane(0)),
            Err(HierarchyError::SlotWithoutParent(id("a")))
        );
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut h = Hierarchy::new();
        h.place(&id("b"), Some(&id("a")), Slot::Pane(0)).unwrap();
        h.place(&id("c"), Some(&id("b")), Slot::Tab(0)).unwrap();
        assert!(matches!(
            h.place(&id("a"), Some(&id("c")), Slot::Pane(0)),
            Err(HierarchyError::Cycle { .. })
        ));
        assert!(h.place(&id("a"), Some(&id("a")), Slot::None).is_err());
    }

    #[test]
    fn test_unknown_widget_has_no_parent_info() {
        let h = Hierarchy::new();
        assert!(h.parent_info(&id("ghost")).is_none());
        assert!(h.children_of(&id("ghost"), Slot::Pane(3)).is_empty());
    }

    #[test]
    fn test_close_gap_shifts_later_panes() {
        let mut h = Hierarchy::new();
        h.place(&id("a"), Some(&id("p")), Slot::Pane(0)).unwrap();
        h.place(&id("b"), Some(&id("p")), Slot::Pane(2)).unwrap();
        h.place(&id("c"), Some(&id("p")), Slot::Pane(2)).unwrap();

        h.close_gap(&id("p"), Slot::Pane(1));

        assert_eq!(h.children_of(&id("p"), Slot::Pane(1)), &[id("b"), id("c")]);
        assert!(h.children_of(&id("p"), Slot::Pane(2)).is_empty());
        assert_eq!(h.parent_info(&id("c")).unwrap().slot, Slot::Pane(1));
        assert_eq!(h.children_of(&id("p"), Slot::Pane(0)), &[id("a")]);
    }

    #[test]
    fn test_all_children_in_slot_order() {
        let mut h = Hierarchy::new();
        h.place(&id("late"), Some(&id("t")), Slot::Tab(1)).unwrap();
        h.place(&id("early"), Some(&id("t")), Slot::Tab(0)).unwrap();
        assert_eq!(h.all_children_of(&id("t")), vec![id("early"), id("late")]);
    }
}
