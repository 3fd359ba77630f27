use super::SaveError;
use super::attrs;
use crate::hierarchy::{Placement, Slot};
use crate::project::{SCHEMA_VERSION, WindowSettings};
use crate::session::EditorSession;
use crate::widget::Widget;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::HashSet;
use tracing::info;

/// Writes the session as a project document in the current schema.
pub fn save(session: &EditorSession) -> Result<String, SaveError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut project = BytesStart::new("project");
    project.push_attribute(("version", SCHEMA_VERSION));
    project.push_attribute(("platform", session.project.platform.as_str()));
    project.push_attribute(("language", session.project.language.as_str()));
    project.push_attribute(("name", session.project.name.as_str()));
    writer.write_event(Event::Start(project))?;

    writer.write_event(Event::Empty(window_element(&session.window)))?;

    writer.write_event(Event::Start(BytesStart::new("widgets")))?;
    let mut written = HashSet::new();
    for visit in session.walk() {
        if written.insert(&visit.widget.id) {
            write_widget(&mut writer, visit.widget, visit.placement)?;
        }
    }
    // Widgets the walk cannot reach still belong to the project.
    for widget in session.widgets() {
        if written.insert(&widget.id) {
            write_widget(
                &mut writer,
                widget,
                session.hierarchy().parent_info(&widget.id),
            )?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("widgets")))?;
    writer.write_event(Event::End(BytesEnd::new("project")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    info!(widgets = written.len(), "saved project");
    Ok(String::from_utf8(bytes)?)
}

fn window_element(window: &WindowSettings) -> BytesStart<'static> {
    let mut el = BytesStart::new("window");
    el.push_attribute(("title", window.title.as_str()));
    el.push_attribute(("width", window.width.to_string().as_str()));
    el.push_attribute(("height", window.height.to_string().as_str()));
    el.push_attribute(("x", window.x.to_string().as_str()));
    el.push_attribute(("y", window.y.to_string().as_str()));
    el.push_attribute(("debug_overlay", bool_str(window.debug_overlay)));
    el.push_attribute(("cont_redraw", bool_str(window.continuous_redraw)));
    el.push_attribute(("is_visible", bool_str(window.visible)));
    el.push_attribute(("is_resizable", bool_str(window.resizable)));
    el
}

fn write_widget(
    writer: &mut Writer<Vec<u8>>,
    widget: &Widget,
    placement: Option<&Placement>,
) -> Result<(), SaveError> {
    let mut el = BytesStart::new("widget");
    el.push_attribute(("type", widget.kind.as_str()));
    el.push_attribute(("id", widget.id.as_str()));
    el.push_attribute(("widgetVar", widget.var_name.as_str()));
    if let Some(name) = &widget.macro_name {
        el.push_attribute(("macro", name.as_str()));
    }
    if let Some(placement) = placement {
        el.push_attribute(("parentId", placement.parent.as_str()));
        match placement.slot {
            Slot::Pane(i) => el.push_attribute(("containerId", i.to_string().as_str())),
            Slot::Tab(i) => el.push_attribute(("tabId", i.to_string().as_str())),
            Slot::None => {}
        }
    }
    let g = widget.geometry;
    el.push_attribute(("x", g.x.to_string().as_str()));
    el.push_attribute(("y", g.y.to_string().as_str()));
    el.push_attribute(("width", g.width.to_string().as_str()));
    el.push_attribute(("height", g.height.to_string().as_str()));
    for (key, value) in attrs::encode(widget.kind, &widget.props)? {
        el.push_attribute((key, value.as_str()));
    }

    let Some(callback) = widget.callback.as_ref().filter(|c| !c.is_empty()) else {
        writer.write_event(Event::Empty(el))?;
        return Ok(());
    };

    writer.write_event(Event::Start(el))?;
    let mut cb = BytesStart::new("callback");
    cb.push_attribute(("callbackName", callback.name.as_str()));
    if callback.code.is_empty() {
        writer.write_event(Event::Empty(cb))?;
    } else {
        writer.write_event(Event::Start(cb))?;
        for (kind, code) in &callback.code {
            let tag = kind.code_tag();
            writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
            writer.write_event(Event::Text(BytesText::new(code)))?;
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new("callback")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("widget")))?;
    Ok(())
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
