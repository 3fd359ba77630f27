//! The editing context a designer surface drives.
//!
//! `EditorSession` owns every widget, the placement hierarchy and the name
//! allocator. All structural changes go through its methods so the
//! serializer and code generator always see a consistent tree.

use crate::codegen::{self, CodeGenOptions, GenerationError};
use crate::hierarchy::{Hierarchy, HierarchyError, Placement, Slot};
use crate::naming::{self, MacroError, NameAllocator};
use crate::project::{ProjectSettings, WindowSettings};
use crate::serialize::attrs::{self, AttributeError};
use crate::serialize::{self, Diagnostic, LoadError, SaveError};
use crate::widget::{EventKind, Geometry, Widget, WidgetId, WidgetKind};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown widget {0}")]
    UnknownWidget(WidgetId),
    #[error("{parent} is a {kind} and cannot hold widgets in {slot:?}")]
    WrongParentKind {
        parent: WidgetId,
        kind: WidgetKind,
        slot: Slot,
    },
    #[error("{parent} has {count} panes; index {index} is out of range")]
    PaneOutOfRange {
        parent: WidgetId,
        index: usize,
        count: usize,
    },
    #[error("{0} has no panes")]
    NoPanes(WidgetId),
    #[error("cannot remove the last pane of {0}")]
    LastPane(WidgetId),
    #[error("pane {index} of {parent} still holds widgets")]
    PaneInUse { parent: WidgetId, index: usize },
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Macro(#[from] MacroError),
    #[error(transparent)]
    Attribute(#[from] AttributeError),
    #[error("attribute `{key}` does not apply to {kind} widgets")]
    UnknownAttribute { kind: WidgetKind, key: String },
    #[error("{0} widgets do not raise events")]
    NoEvents(WidgetKind),
    #[error("{kind} widgets do not raise {event} events")]
    UnsupportedEvent { kind: WidgetKind, event: EventKind },
    #[error("`{0}` is not a valid C function name")]
    InvalidCallbackName(String),
}

/// One step of the parent-before-child walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub widget: &'a Widget,
    pub placement: Option<&'a Placement>,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    pub window: WindowSettings,
    pub project: ProjectSettings,
    widgets: IndexMap<WidgetId, Widget>,
    hierarchy: Hierarchy,
    names: NameAllocator,
    next_id: u64,
}

impl EditorSession {
    /// Starts a fresh project with default settings and no widgets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards everything, as when a project is closed.
    pub fn close(&mut self) {
        debug!(widgets = self.widgets.len(), "closing project");
        *self = Self::new();
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.get(id)
    }

    /// Widgets in creation (or load) order.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.values()
    }

    pub fn find_by_var(&self, var_name: &str) -> Option<&Widget> {
        self.widgets.values().find(|w| w.var_name == var_name)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn parent_info(&self, id: &WidgetId) -> Option<&Placement> {
        self.hierarchy.parent_info(id)
    }

    pub fn children_of(&self, parent: &WidgetId, slot: Slot) -> &[WidgetId] {
        self.hierarchy.children_of(parent, slot)
    }

    pub fn create_widget(
        &mut self,
        kind: WidgetKind,
        x: i32,
        y: i32,
        parent: Option<(&WidgetId, Slot)>,
    ) -> Result<WidgetId, SessionError> {
        if let Some((parent, slot)) = parent {
            self.check_slot(parent, slot)?;
        }

        let id = self.fresh_id();
        let mut widget = Widget::new(id.clone(), kind, x, y);
        widget.var_name = self.allocate_name(kind);
        debug!(widget = %id, %kind, var = %widget.var_name, "created widget");
        self.widgets.insert(id.clone(), widget);
        self.hierarchy.insert_root(&id);

        if let Some((parent, slot)) = parent {
            self.hierarchy.place(&id, Some(parent), slot)?;
        }
        Ok(id)
    }

    /// Moves a widget into `slot` of `parent`, or onto the root canvas when
    /// `parent` is `None`.
    pub fn place(
        &mut self,
        id: &WidgetId,
        parent: Option<&WidgetId>,
        slot: Slot,
    ) -> Result<(), SessionError> {
        let kind = self.get(id)?.kind;
        if let Some(parent) = parent {
            self.check_slot(parent, slot)?;
        }
        self.hierarchy.place(id, parent, slot)?;

        if self.widgets.get(id).is_some_and(|w| w.var_name.is_empty()) {
            let name = self.allocate_name(kind);
            if let Some(widget) = self.widgets.get_mut(id) {
                widget.var_name = name;
            }
        }
        Ok(())
    }

    /// Deletes a widget. Direct children of a Container, Tabs or layout are
    /// moved to the root canvas in pane order.
    pub fn delete_widget(&mut self, id: &WidgetId) -> Result<Widget, SessionError> {
        self.get(id)?;
        let children = self.hierarchy.all_children_of(id);
        for child in &children {
            self.hierarchy.place(child, None, Slot::None)?;
        }
        self.hierarchy.remove(id);
        let widget = self
            .widgets
            .shift_remove(id)
            .ok_or_else(|| SessionError::UnknownWidget(id.clone()))?;
        debug!(widget = %id, relocated = children.len(), "deleted widget");
        Ok(widget)
    }

    pub fn set_geometry(
        &mut self,
        id: &WidgetId,
        geometry: Geometry,
    ) -> Result<(), SessionError> {
        self.get_mut(id)?.geometry = geometry;
        Ok(())
    }

    /// Applies property-panel edits. Geometry keys (`x`, `y`, `width`,
    /// `height`) and the kind's own attribute keys are accepted; nothing
    /// changes unless every value is valid.
    pub fn apply_attributes(
        &mut self,
        id: &WidgetId,
        values: &[(&str, &str)],
    ) -> Result<(), SessionError> {
        let widget = self.get(id)?;
        let kind = widget.kind;
        let mut geometry = widget.geometry;
        let mut props = widget.props.clone();

        let mut typed = Vec::new();
        for &(key, value) in values {
            match key {
                "x" => geometry.x = attrs::parse_px(key, value)?,
                "y" => geometry.y = attrs::parse_px(key, value)?,
                "width" => geometry.width = attrs::parse_px(key, value)?,
                "height" => geometry.height = attrs::parse_px(key, value)?,
                _ => typed.push((key, value)),
            }
        }

        let applied = attrs::apply(kind, &mut props, typed);
        if let Some(error) = applied.errors.into_iter().next() {
            return Err(error.into());
        }
        if let Some(key) = applied.unknown.into_iter().next() {
            return Err(SessionError::UnknownAttribute { kind, key });
        }

        let old_panes = widget.pane_count();
        if kind.has_panes() && props.pane_names.len() < old_panes {
            for index in props.pane_names.len()..old_panes {
                if !self.children_of(id, pane_slot(kind, index)).is_empty() {
                    return Err(SessionError::PaneInUse {
                        parent: id.clone(),
                        index,
                    });
                }
            }
        }

        let widget = self.get_mut(id)?;
        widget.geometry = geometry;
        widget.props = props;
        debug!(widget = %id, keys = values.len(), "applied attributes");
        Ok(())
    }

    /// Sets or clears (empty input) a widget's macro alias. On error the
    /// previous alias is kept.
    pub fn set_macro(
        &mut self,
        id: &WidgetId,
        input: &str,
    ) -> Result<Option<String>, SessionError> {
        self.get(id)?;
        let name = naming::normalize_macro(input)?;
        if let Some(name) = &name
            && let Some(owner) = self
                .widgets
                .values()
                .find(|w| &w.id != id && w.macro_name.as_ref() == Some(name))
        {
            return Err(MacroError::Duplicate {
                name: name.clone(),
                owner: owner.id.to_string(),
            }
            .into());
        }
        self.get_mut(id)?.macro_name = name.clone();
        Ok(name)
    }

    pub fn set_callback_name(&mut self, id: &WidgetId, name: &str) -> Result<(), SessionError> {
        let kind = self.get(id)?.kind;
        if kind.event_kind().is_none() {
            return Err(SessionError::NoEvents(kind));
        }
        let name = name.trim();
        if !name.is_empty() && !naming::is_c_identifier(name) {
            return Err(SessionError::InvalidCallbackName(name.to_string()));
        }
        let widget = self.get_mut(id)?;
        let mut callback = widget.callback.take().unwrap_or_default();
        callback.name = name.to_string();
        widget.callback = (!callback.is_empty()).then_some(callback);
        Ok(())
    }

    /// Stores handler code for `event`. Empty code removes it.
    pub fn set_callback_code(
        &mut self,
        id: &WidgetId,
        event: EventKind,
        code: &str,
    ) -> Result<(), SessionError> {
        let kind = self.get(id)?.kind;
        if kind.event_kind() != Some(event) {
            return Err(SessionError::UnsupportedEvent { kind, event });
        }
        let widget = self.get_mut(id)?;
        let mut callback = widget.callback.take().unwrap_or_default();
        if code.is_empty() {
            callback.code.remove(&event);
        } else {
            callback.code.insert(event, code.to_string());
        }
        widget.callback = (!callback.is_empty()).then_some(callback);
        Ok(())
    }

    /// Appends a pane to a Container or Tabs widget and makes it active.
    pub fn add_pane(&mut self, id: &WidgetId) -> Result<usize, SessionError> {
        let widget = self.pane_owner_mut(id)?;
        let index = widget.props.pane_names.len();
        let name = widget.kind.default_pane_name(index);
        widget.props.pane_names.push(name);
        widget.props.active_pane = index;
        Ok(index)
    }

    /// Removes a pane. Its children move to the root canvas and later panes
    /// shift down by one.
    pub fn remove_pane(&mut self, id: &WidgetId, index: usize) -> Result<(), SessionError> {
        let widget = self.pane_owner_mut(id)?;
        let count = widget.props.pane_names.len();
        if count <= 1 {
            return Err(SessionError::LastPane(id.clone()));
        }
        if index >= count {
            return Err(SessionError::PaneOutOfRange {
                parent: id.clone(),
                index,
                count,
            });
        }
        let kind = widget.kind;
        widget.props.pane_names.remove(index);
        if widget.props.active_pane > index {
            widget.props.active_pane -= 1;
        }
        widget.props.active_pane = widget.props.active_pane.min(count - 2);

        let slot = pane_slot(kind, index);
        let orphans = self.hierarchy.children_of(id, slot).to_vec();
        for child in &orphans {
            self.hierarchy.place(child, None, Slot::None)?;
        }
        self.hierarchy.close_gap(id, slot);
        debug!(widget = %id, index, relocated = orphans.len(), "removed pane");
        Ok(())
    }

    pub fn set_active_pane(&mut self, id: &WidgetId, index: usize) -> Result<(), SessionError> {
        let widget = self.pane_owner_mut(id)?;
        let count = widget.props.pane_names.len();
        if index >= count {
            return Err(SessionError::PaneOutOfRange {
                parent: id.clone(),
                index,
                count,
            });
        }
        widget.props.active_pane = index;
        Ok(())
    }

    pub fn rename_pane(
        &mut self,
        id: &WidgetId,
        index: usize,
        name: &str,
    ) -> Result<(), SessionError> {
        let widget = self.pane_owner_mut(id)?;
        let count = widget.props.pane_names.len();
        let entry = widget
            .props
            .pane_names
            .get_mut(index)
            .ok_or_else(|| SessionError::PaneOutOfRange {
                parent: id.clone(),
                index,
                count,
            })?;
        *entry = name.to_string();
        Ok(())
    }

    /// Parent-before-child order: roots in order, then each pane's children
    /// in pane index order, depth first.
    pub fn walk(&self) -> Vec<Visit<'_>> {
        let mut out = Vec::with_capacity(self.widgets.len());
        let mut seen = HashSet::new();
        for root in self.hierarchy.roots() {
            self.visit(root, 0, &mut seen, &mut out);
        }
        out
    }

    fn visit<'a>(
        &'a self,
        id: &'a WidgetId,
        depth: usize,
        seen: &mut HashSet<&'a WidgetId>,
        out: &mut Vec<Visit<'a>>,
    ) {
        if !seen.insert(id) {
            return;
        }
        let Some(widget) = self.widgets.get(id) else {
            return;
        };
        out.push(Visit {
            widget,
            placement: self.hierarchy.parent_info(id),
            depth,
        });
        for slot in child_slots(widget) {
            for child in self.hierarchy.children_of(id, slot) {
                self.visit(child, depth + 1, seen, out);
            }
        }
    }

    pub fn save_xml(&self) -> Result<String, SaveError> {
        serialize::save(self)
    }

    /// Replaces this session with the project in `xml`. On error nothing changes.
    pub fn load_xml(&mut self, xml: &str) -> Result<Vec<Diagnostic>, LoadError> {
        let outcome = serialize::load(xml)?;
        *self = outcome.session;
        info!(widgets = self.len(), diagnostics = outcome.diagnostics.len(), "project replaced");
        Ok(outcome.diagnostics)
    }

    pub fn generate_source(&self, options: &CodeGenOptions) -> Result<String, GenerationError> {
        codegen::generate(self, options)
    }

    /// Adds a widget read from a project file, on the root canvas.
    pub(crate) fn insert_loaded(&mut self, widget: Widget) {
        if let Some(n) = widget
            .id
            .as_str()
            .strip_prefix("widget_")
            .and_then(|n| n.parse::<u64>().ok())
        {
            self.next_id = self.next_id.max(n);
        }
        let id = widget.id.clone();
        self.widgets.insert(id.clone(), widget);
        self.hierarchy.insert_root(&id);
    }

    /// Gives every loaded widget a valid, unique variable name and drops
    /// macro aliases that are invalid or already taken.
    pub(crate) fn repair_names(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        for widget in self.widgets.values() {
            if naming::is_c_identifier(&widget.var_name) {
                self.names.observe(&widget.var_name);
            }
        }

        let mut seen_vars = HashSet::new();
        let mut seen_macros = HashSet::new();
        let mut rename = Vec::new();
        for widget in self.widgets.values_mut() {
            let var = std::mem::take(&mut widget.var_name);
            if !var.is_empty() && naming::is_c_identifier(&var) && seen_vars.insert(var.clone()) {
                widget.var_name = var;
            } else {
                rename.push((widget.id.clone(), widget.kind, var));
            }

            if let Some(name) = widget.macro_name.take() {
                let reason = if naming::is_reserved_macro(&name) {
                    Some("reserved by C or the Gooey headers")
                } else if !naming::is_macro_name(&name) {
                    Some("not an uppercase C identifier")
                } else if !seen_macros.insert(name.clone()) {
                    Some("already used by another widget")
                } else {
                    None
                };
                match reason {
                    None => widget.macro_name = Some(name),
                    Some(reason) => diagnostics.push(Diagnostic::DroppedMacro {
                        widget: widget.id.clone(),
                        name,
                        reason: reason.to_string(),
                    }),
                }
            }
        }

        for (id, kind, old) in rename {
            let name = self.allocate_name(kind);
            if !old.is_empty() {
                diagnostics.push(Diagnostic::RenamedVariable {
                    widget: id.clone(),
                    from: old,
                    to: name.clone(),
                });
            }
            if let Some(widget) = self.widgets.get_mut(&id) {
                widget.var_name = name;
            }
        }
    }

    fn get(&self, id: &WidgetId) -> Result<&Widget, SessionError> {
        self.widgets
            .get(id)
            .ok_or_else(|| SessionError::UnknownWidget(id.clone()))
    }

    fn get_mut(&mut self, id: &WidgetId) -> Result<&mut Widget, SessionError> {
        self.widgets
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownWidget(id.clone()))
    }

    fn pane_owner_mut(&mut self, id: &WidgetId) -> Result<&mut Widget, SessionError> {
        let widget = self.get_mut(id)?;
        if !widget.kind.has_panes() {
            return Err(SessionError::NoPanes(id.clone()));
        }
        Ok(widget)
    }

    /// Checks that `parent` exists and can hold a child in `slot`.
    pub(crate) fn check_slot(&self, parent: &WidgetId, slot: Slot) -> Result<(), SessionError> {
        let widget = self.get(parent)?;
        match (widget.kind, slot) {
            (WidgetKind::Container, Slot::Pane(index)) | (WidgetKind::Tabs, Slot::Tab(index)) => {
                let count = widget.pane_count();
                if index >= count {
                    return Err(SessionError::PaneOutOfRange {
                        parent: parent.clone(),
                        index,
                        count,
                    });
                }
                Ok(())
            }
            (kind, Slot::None) if kind.is_layout() => Ok(()),
            (kind, slot) => Err(SessionError::WrongParentKind {
                parent: parent.clone(),
                kind,
                slot,
            }),
        }
    }

    fn fresh_id(&mut self) -> WidgetId {
        loop {
            self.next_id += 1;
            let id = WidgetId::new(format!("widget_{}", self.next_id));
            if !self.widgets.contains_key(&id) {
                return id;
            }
        }
    }

    fn allocate_name(&mut self, kind: WidgetKind) -> String {
        let widgets = &self.widgets;
        self.names
            .allocate(kind, |name| widgets.values().any(|w| w.var_name == name))
    }
}

/// The slot type a Container or Tabs widget uses for pane `index`.
pub fn pane_slot(kind: WidgetKind, index: usize) -> Slot {
    match kind {
        WidgetKind::Tabs => Slot::Tab(index),
        _ => Slot::Pane(index),
    }
}

/// Slots that can hold children of `widget`, in traversal order.
pub fn child_slots(widget: &Widget) -> Vec<Slot> {
    match widget.kind {
        WidgetKind::Container | WidgetKind::Tabs => (0..widget.pane_count())
            .map(|i| pane_slot(widget.kind, i))
            .collect(),
        kind if kind.is_layout() => vec![Slot::None],
        _ => Vec::new(),
    }
}
