//! XML project files.
//!
//! The document is a flat list of `<widget>` elements with back references
//! (`parentId`, `containerId`, `tabId`) rather than nested elements. Saving
//! emits each parent before the children of its panes; loading instantiates
//! every widget first and attaches them in a second pass.

pub mod attrs;
mod load;
mod save;

pub use load::load;
pub use save::save;

use crate::session::EditorSession;
use crate::widget::WidgetId;
use attrs::AttributeError;
use std::fmt;
use thiserror::Error;

/// Structural failures. The session being loaded into is left untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed project file at byte {position}: {source}")]
    Xml {
        position: usize,
        source: quick_xml::Error,
    },
    #[error("project file has no <widgets> element")]
    MissingWidgets,
    #[error("project file ended inside <{0}>")]
    UnexpectedEof(String),
    #[error("widget #{index} has no `{attribute}` attribute")]
    MissingAttribute {
        index: usize,
        attribute: &'static str,
    },
    #[error("widget {id} has unknown type `{kind}`")]
    UnknownType { id: String, kind: String },
    #[error("widget id `{0}` appears more than once")]
    DuplicateId(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to write project XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("failed to write project XML: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode widget attribute: {0}")]
    Json(#[from] serde_json::Error),
    #[error("project XML is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Something the loader repaired instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Declared parent does not exist; the widget was put on the root canvas.
    OrphanedWidget { widget: WidgetId, parent: WidgetId },
    /// Parent exists but cannot hold the widget where declared; moved to root.
    InvalidPlacement {
        widget: WidgetId,
        parent: WidgetId,
        reason: String,
    },
    RenamedVariable {
        widget: WidgetId,
        from: String,
        to: String,
    },
    DroppedMacro {
        widget: WidgetId,
        name: String,
        reason: String,
    },
    DroppedCallback { widget: WidgetId, detail: String },
    InvalidAttribute {
        widget: WidgetId,
        error: AttributeError,
    },
    InvalidWindowAttribute(AttributeError),
    /// An older file layout was read and will be written in the current schema.
    Migrated(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OrphanedWidget { widget, parent } => write!(
                f,
                "widget {widget} references missing parent {parent}; placed on the root canvas"
            ),
            Diagnostic::InvalidPlacement {
                widget,
                parent,
                reason,
            } => write!(
                f,
                "widget {widget} cannot be placed in {parent} ({reason}); placed on the root canvas"
            ),
            Diagnostic::RenamedVariable { widget, from, to } => {
                write!(f, "widget {widget}: variable `{from}` renamed to `{to}`")
            }
            Diagnostic::DroppedMacro {
                widget,
                name,
                reason,
            } => write!(f, "widget {widget}: macro `{name}` dropped ({reason})"),
            Diagnostic::DroppedCallback { widget, detail } => {
                write!(f, "widget {widget}: callback data dropped ({detail})")
            }
            Diagnostic::InvalidAttribute { widget, error } => {
                write!(f, "widget {widget}: {error}; default kept")
            }
            Diagnostic::InvalidWindowAttribute(error) => write!(f, "window: {error}; default kept"),
            Diagnostic::Migrated(detail) => write!(f, "migrated: {detail}"),
        }
    }
}

/// A freshly loaded session plus everything that was repaired on the way.
#[derive(Debug)]
pub struct LoadOutcome {
    pub session: EditorSession,
    pub diagnostics: Vec<Diagnostic>,
    /// Schema version declared by the file, if any.
    pub version: Option<String>,
}

impl LoadOutcome {
    pub fn was_migrated(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Migrated(_)))
    }
}
