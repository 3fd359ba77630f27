//! Core of the Gooey RAD builder: the widget hierarchy, XML project files
//! and C code generation for the Gooey GUI toolkit.
//!
//! A designer surface drives an [`EditorSession`]; the session owns all
//! widgets and their placements and is the only way to change them.

pub mod codegen;
pub mod config;
pub mod hierarchy;
pub mod highlight;
pub mod naming;
pub mod project;
pub mod runner;
pub mod serialize;
pub mod session;
pub mod widget;

pub use codegen::{CodeGenFormat, CodeGenOptions, GenerationError};
pub use hierarchy::{Placement, Slot};
pub use serialize::{Diagnostic, LoadError, LoadOutcome, SaveError};
pub use session::{EditorSession, SessionError, Visit};
pub use widget::{EventKind, Geometry, Widget, WidgetId, WidgetKind};
