use super::attrs::{self, AttributeError};
use super::{Diagnostic, LoadError, LoadOutcome};
use crate::hierarchy::Slot;
use crate::project::SCHEMA_VERSION;
use crate::session::{EditorSession, pane_slot};
use crate::widget::{Callback, EventKind, Widget, WidgetId, WidgetKind};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Attributes every widget element carries; the rest are type specific.
const COMMON_KEYS: &[&str] = &[
    "type",
    "id",
    "widgetVar",
    "macro",
    "parentId",
    "containerId",
    "tabId",
    "x",
    "y",
    "width",
    "height",
];

type Attrs = Vec<(String, String)>;

#[derive(Debug, Default)]
struct RawCallback {
    name: String,
    code: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct RawWidget {
    attrs: Attrs,
    callback: Option<RawCallback>,
}

#[derive(Debug, Default)]
struct RawProject {
    project: Attrs,
    window: Option<Attrs>,
    saw_widgets: bool,
    widgets: Vec<RawWidget>,
}

/// Where a loaded widget wants to go, resolved after every widget exists.
struct Link {
    widget: WidgetId,
    parent: WidgetId,
    container: Option<String>,
    tab: Option<String>,
}

/// Reads a project document into a brand new session.
pub fn load(xml: &str) -> Result<LoadOutcome, LoadError> {
    let raw = parse(xml)?;
    if !raw.saw_widgets {
        return Err(LoadError::MissingWidgets);
    }

    let mut session = EditorSession::new();
    let mut diagnostics = Vec::new();
    let mut notes = Notes::default();

    let version = get(&raw.project, "version").map(str::to_string);
    match version.as_deref() {
        None => notes.add("project has no schema version"),
        Some(v) if v != SCHEMA_VERSION => {
            warn!(
                version = v,
                "project declares an unknown schema version; reading as {SCHEMA_VERSION}"
            )
        }
        Some(_) => {}
    }
    for (key, value) in &raw.project {
        match key.as_str() {
            "platform" => session.project.platform = value.clone(),
            "language" => session.project.language = value.clone(),
            "name" => session.project.name = value.clone(),
            _ => {}
        }
    }
    if let Some(window) = &raw.window {
        read_window(&mut session, window, &mut diagnostics, &mut notes);
    }

    let mut links = Vec::new();
    for (index, raw_widget) in raw.widgets.into_iter().enumerate() {
        let (widget, link) = read_widget(index, raw_widget, &mut diagnostics, &mut notes)?;
        if session.widget(&widget.id).is_some() {
            return Err(LoadError::DuplicateId(widget.id.to_string()));
        }
        session.insert_loaded(widget);
        links.extend(link);
    }

    session.repair_names(&mut diagnostics);

    for link in links {
        attach(&mut session, link, &mut diagnostics);
    }

    diagnostics.extend(notes.into_diagnostics());
    info!(
        widgets = session.len(),
        diagnostics = diagnostics.len(),
        "loaded project"
    );
    Ok(LoadOutcome {
        session,
        diagnostics,
        version,
    })
}

fn attach(session: &mut EditorSession, link: Link, diagnostics: &mut Vec<Diagnostic>) {
    let Link {
        widget,
        parent,
        container,
        tab,
    } = link;

    let Some(parent_kind) = session.widget(&parent).map(|w| w.kind) else {
        warn!(widget = %widget, parent = %parent, "parent not found; placing on root canvas");
        diagnostics.push(Diagnostic::OrphanedWidget { widget, parent });
        return;
    };

    let slot = match parent_kind {
        WidgetKind::Container | WidgetKind::Tabs => {
            let (key, value) = match parent_kind {
                WidgetKind::Tabs => ("tabId", tab),
                _ => ("containerId", container),
            };
            match value.as_deref().map(str::trim).map(str::parse::<usize>) {
                Some(Ok(index)) => Ok(pane_slot(parent_kind, index)),
                Some(Err(_)) => Err(format!("`{key}` is not a pane index")),
                None => Err(format!("`{key}` is missing")),
            }
        }
        _ => Ok(Slot::None),
    };

    let result = slot.and_then(|slot| {
        session
            .place(&widget, Some(&parent), slot)
            .map_err(|e| e.to_string())
    });
    if let Err(reason) = result {
        warn!(
            widget = %widget,
            parent = %parent,
            %reason,
            "invalid placement; placing on root canvas"
        );
        diagnostics.push(Diagnostic::InvalidPlacement {
            widget,
            parent,
            reason,
        });
    }
}

fn read_widget(
    index: usize,
    raw: RawWidget,
    diagnostics: &mut Vec<Diagnostic>,
    notes: &mut Notes,
) -> Result<(Widget, Option<Link>), LoadError> {
    let attrs = &raw.attrs;
    let id = get(attrs, "id")
        .filter(|id| !id.trim().is_empty())
        .ok_or(LoadError::MissingAttribute {
            index,
            attribute: "id",
        })?;
    let type_name = get(attrs, "type").ok_or(LoadError::MissingAttribute {
        index,
        attribute: "type",
    })?;
    let kind = WidgetKind::parse(type_name).ok_or_else(|| LoadError::UnknownType {
        id: id.to_string(),
        kind: type_name.to_string(),
    })?;
    if type_name != kind.as_str() {
        notes.add(format!("widget type `{type_name}` read as `{kind}`"));
    }

    let id = WidgetId::new(id);
    let mut widget = Widget::new(id.clone(), kind, 0, 0);

    for key in ["x", "y", "width", "height"] {
        let Some(value) = get(attrs, key) else {
            continue;
        };
        if value.trim_end().ends_with("px") {
            notes.add("geometry with `px` units");
        }
        let target = match key {
            "x" => &mut widget.geometry.x,
            "y" => &mut widget.geometry.y,
            "width" => &mut widget.geometry.width,
            _ => &mut widget.geometry.height,
        };
        match attrs::parse_px(key, value) {
            Ok(v) => *target = v,
            Err(error) => diagnostics.push(Diagnostic::InvalidAttribute {
                widget: id.clone(),
                error,
            }),
        }
    }

    widget.var_name = get(attrs, "widgetVar").unwrap_or_default().trim().to_string();
    widget.macro_name = get(attrs, "macro")
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let typed = attrs
        .iter()
        .filter(|(key, _)| !COMMON_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.as_str(), value.as_str()));
    let applied = attrs::apply(kind, &mut widget.props, typed);
    for error in applied.errors {
        diagnostics.push(Diagnostic::InvalidAttribute {
            widget: id.clone(),
            error,
        });
    }
    for key in applied.unknown {
        debug!(widget = %id, %kind, key = %key, "ignoring attribute");
    }
    if applied.resized_panes {
        notes.add("pane names that disagree with the pane count");
    }

    if let Some(raw_callback) = raw.callback {
        widget.callback = read_callback(&id, kind, raw_callback, diagnostics);
    }

    let link = get(attrs, "parentId")
        .filter(|p| !p.trim().is_empty())
        .map(|parent| Link {
            widget: id.clone(),
            parent: WidgetId::new(parent),
            container: get(attrs, "containerId").map(str::to_string),
            tab: get(attrs, "tabId").map(str::to_string),
        });
    Ok((widget, link))
}

fn read_callback(
    id: &WidgetId,
    kind: WidgetKind,
    raw: RawCallback,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Callback> {
    let Some(event) = kind.event_kind() else {
        if !raw.name.trim().is_empty() || raw.code.iter().any(|(_, c)| !c.is_empty()) {
            diagnostics.push(Diagnostic::DroppedCallback {
                widget: id.clone(),
                detail: format!("{kind} widgets do not raise events"),
            });
        }
        return None;
    };

    let mut code = BTreeMap::new();
    for (tag, text) in raw.code {
        match EventKind::from_code_tag(&tag) {
            Some(found) if found == event => {
                if !text.is_empty() {
                    code.insert(found, text);
                }
            }
            Some(found) => diagnostics.push(Diagnostic::DroppedCallback {
                widget: id.clone(),
                detail: format!("{kind} widgets do not raise {found} events"),
            }),
            None => diagnostics.push(Diagnostic::DroppedCallback {
                widget: id.clone(),
                detail: format!("unknown element <{tag}>"),
            }),
        }
    }

    let callback = Callback {
        name: raw.name.trim().to_string(),
        code,
    };
    (!callback.is_empty()).then_some(callback)
}

fn read_window(
    session: &mut EditorSession,
    attrs: &Attrs,
    diagnostics: &mut Vec<Diagnostic>,
    notes: &mut Notes,
) {
    let window = &mut session.window;
    for (key, value) in attrs {
        let result: Result<(), AttributeError> = match key.as_str() {
            "title" => {
                window.title = value.clone();
                Ok(())
            }
            "width" | "height" | "x" | "y" => {
                if value.trim_end().ends_with("px") {
                    notes.add("window size with `px` units");
                }
                attrs::parse_px(key, value).map(|v| match key.as_str() {
                    "width" => window.width = v,
                    "height" => window.height = v,
                    "x" => window.x = v,
                    _ => window.y = v,
                })
            }
            "debug_overlay" => attrs::parse_bool(key, value).map(|v| window.debug_overlay = v),
            "cont_redraw" => attrs::parse_bool(key, value).map(|v| window.continuous_redraw = v),
            "is_visible" => attrs::parse_bool(key, value).map(|v| window.visible = v),
            "is_resizable" => attrs::parse_bool(key, value).map(|v| window.resizable = v),
            _ => Ok(()),
        };
        if let Err(error) = result {
            diagnostics.push(Diagnostic::InvalidWindowAttribute(error));
        }
    }
}

/// Parses the document into raw elements without interpreting them.
fn parse(xml: &str) -> Result<RawProject, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut raw = RawProject::default();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<RawWidget> = None;
    let mut code: Option<(String, String)> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| LoadError::Xml {
                position: reader.buffer_position(),
                source,
            })?;
        let at = reader.buffer_position();
        let xml_error = |source| LoadError::Xml {
            position: at,
            source,
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let name = tag_name(e.name());
                let parent = stack.last().map(String::as_str);
                match (parent, name.as_str()) {
                    (None, "project") => raw.project = attributes(e).map_err(xml_error)?,
                    (Some("project"), "window") => {
                        raw.window = Some(attributes(e).map_err(xml_error)?)
                    }
                    (Some("project"), "widgets") => raw.saw_widgets = true,
                    (Some("widgets"), "widget") => {
                        let widget = RawWidget {
                            attrs: attributes(e).map_err(xml_error)?,
                            callback: None,
                        };
                        if empty {
                            raw.widgets.push(widget);
                        } else {
                            current = Some(widget);
                        }
                    }
                    (Some("widget"), "callback") => {
                        if let Some(widget) = current.as_mut() {
                            let attrs = attributes(e).map_err(xml_error)?;
                            widget.callback = Some(RawCallback {
                                name: get(&attrs, "callbackName")
                                    .unwrap_or_default()
                                    .to_string(),
                                code: Vec::new(),
                            });
                        }
                    }
                    (Some("callback"), tag) => {
                        if empty {
                            push_code(&mut current, tag.to_string(), String::new());
                        } else {
                            code = Some((tag.to_string(), String::new()));
                        }
                    }
                    (_, other) => debug!(element = other, "skipping element"),
                }
                if !empty {
                    stack.push(name);
                }
            }
            Event::End(ref e) => {
                let name = tag_name(e.name().as_ref());
                stack.pop();
                match name.as_str() {
                    "widget" if stack.last().map(String::as_str) == Some("widgets") => {
                        raw.widgets.extend(current.take());
                    }
                    _ => {
                        if let Some((tag, text)) = code.take_if(|(tag, _)| *tag == name) {
                            push_code(&mut current, tag, text);
                        }
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some((_, text)) = code.as_mut() {
                    text.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(ref c) => {
                if let Some((_, text)) = code.as_mut() {
                    text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(LoadError::UnexpectedEof(open));
    }
    Ok(raw)
}

fn push_code(current: &mut Option<RawWidget>, tag: String, text: String) {
    if let Some(callback) = current.as_mut().and_then(|w| w.callback.as_mut()) {
        callback.code.push((tag, text));
    }
}

fn tag_name(name: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> Result<Attrs, quick_xml::Error> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn get<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Collects migration notes once per kind of legacy construct.
#[derive(Default)]
struct Notes(Vec<String>);

impl Notes {
    fn add(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !self.0.contains(&note) {
            self.0.push(note);
        }
    }

    fn into_diagnostics(self) -> impl Iterator<Item = Diagnostic> {
        self.0.into_iter().map(Diagnostic::Migrated)
    }
}
