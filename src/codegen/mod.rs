//! C source generation for the Gooey toolkit.
//!
//! Output is a single translation unit: includes, macro aliases, global
//! widget pointers, static data, callbacks, `init_ui()` and (for full
//! programs) `main()`. Everything is ordered by the session's stored
//! traversal order, so generating twice from the same session yields the
//! same bytes.

pub mod api;

use crate::hierarchy::Slot;
use crate::naming;
use crate::session::{EditorSession, Visit};
use crate::widget::{EventKind, Widget, WidgetId, WidgetKind, escape};
use api::ApiFunction;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

const WINDOW_VAR: &str = "win";
const LABEL_FONT_SIZE: &str = "14.0f";
/// Vertical distance between the buttons of a radio group.
const RADIO_SPACING: i32 = 25;

static FLOAT_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?[fF]?$").expect("float pattern compiles")
});

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?([0-9a-fA-F]{6})$").expect("color pattern compiles"));

/// Code generation output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeGenFormat {
    /// Complete program including `main()`
    #[default]
    Full,
    /// Everything except `main()`, for embedding into an existing program
    InitOnly,
}

impl CodeGenFormat {
    pub const fn display_name(&self) -> &'static str {
        match self {
            CodeGenFormat::Full => "Full program",
            CodeGenFormat::InitOnly => "init_ui() only",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeGenOptions {
    pub format: CodeGenFormat,
    /// Add comments to generated code
    pub comments: bool,
}

impl Default for CodeGenOptions {
    fn default() -> Self {
        Self {
            format: CodeGenFormat::Full,
            comments: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("project has no widgets")]
    EmptyProject,
    #[error("widget {widget} references missing parent {parent}")]
    DanglingParent { widget: WidgetId, parent: WidgetId },
    #[error("widget {widget} has an invalid placement in {parent}: {reason}")]
    InvalidSlot {
        widget: WidgetId,
        parent: WidgetId,
        reason: String,
    },
    #[error("widget {0} is not reachable from the root canvas")]
    Unreachable(WidgetId),
    #[error("symbol `{0}` is defined more than once")]
    DuplicateSymbol(String),
    #[error("widget {widget}: `{name}` is not a usable C identifier")]
    InvalidIdentifier { widget: WidgetId, name: String },
    #[error("widget {0} has a callback but its type raises no events")]
    UnsupportedCallback(WidgetId),
    #[error("widget {widget}: `{key}` value `{value}` cannot be generated ({reason})")]
    InvalidAttribute {
        widget: WidgetId,
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error(transparent)]
    Api(#[from] api::ArityError),
}

/// Generates a C translation unit for the session.
pub fn generate(
    session: &EditorSession,
    options: &CodeGenOptions,
) -> Result<String, GenerationError> {
    if session.is_empty() {
        return Err(GenerationError::EmptyProject);
    }
    validate_placements(session)?;

    let order = session.walk();
    if order.len() != session.len() {
        let reached: HashSet<&WidgetId> = order.iter().map(|v| &v.widget.id).collect();
        if let Some(widget) = session.widgets().find(|w| !reached.contains(&w.id)) {
            return Err(GenerationError::Unreachable(widget.id.clone()));
        }
    }
    let callbacks = resolve_symbols(&order)?;

    let mut generator = Generator {
        session,
        options: *options,
        order,
        callbacks,
        out: String::new(),
    };
    generator.header();
    generator.aliases();
    generator.globals();
    generator.static_data()?;
    generator.callbacks();
    generator.init_ui()?;
    if options.format == CodeGenFormat::Full {
        generator.main()?;
    }

    info!(
        widgets = generator.order.len(),
        bytes = generator.out.len(),
        format = options.format.display_name(),
        "generated C source"
    );
    Ok(generator.out)
}

fn validate_placements(session: &EditorSession) -> Result<(), GenerationError> {
    for widget in session.widgets() {
        let Some(placement) = session.parent_info(&widget.id) else {
            continue;
        };
        if session.widget(&placement.parent).is_none() {
            return Err(GenerationError::DanglingParent {
                widget: widget.id.clone(),
                parent: placement.parent.clone(),
            });
        }
        session
            .check_slot(&placement.parent, placement.slot)
            .map_err(|e| GenerationError::InvalidSlot {
                widget: widget.id.clone(),
                parent: placement.parent.clone(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

/// Checks that every emitted symbol is a unique C identifier and returns
/// the callback function name of each widget in `order`.
fn resolve_symbols(order: &[Visit<'_>]) -> Result<Vec<Option<String>>, GenerationError> {
    let mut symbols = HashSet::new();
    let mut claim = |symbol: String| {
        if symbols.insert(symbol.clone()) {
            Ok(symbol)
        } else {
            Err(GenerationError::DuplicateSymbol(symbol))
        }
    };

    let mut callbacks = Vec::with_capacity(order.len());
    for visit in order {
        let w = visit.widget;
        if !naming::is_c_identifier(&w.var_name) {
            return Err(GenerationError::InvalidIdentifier {
                widget: w.id.clone(),
                name: w.var_name.clone(),
            });
        }
        claim(w.var_name.clone())?;
        for symbol in data_symbols(w) {
            claim(symbol)?;
        }
        if let Some(name) = &w.macro_name {
            if !naming::is_macro_name(name) {
                return Err(GenerationError::InvalidIdentifier {
                    widget: w.id.clone(),
                    name: name.clone(),
                });
            }
            claim(name.clone())?;
        }

        let callback = match &w.callback {
            None => None,
            Some(cb) => {
                let event = w
                    .kind
                    .event_kind()
                    .ok_or_else(|| GenerationError::UnsupportedCallback(w.id.clone()))?;
                let name = if cb.name.is_empty() {
                    format!("on_{}_{}", w.var_name, event)
                } else {
                    cb.name.clone()
                };
                if !naming::is_c_identifier(&name) {
                    return Err(GenerationError::InvalidIdentifier {
                        widget: w.id.clone(),
                        name,
                    });
                }
                Some(claim(name)?)
            }
        };
        callbacks.push(callback);
    }
    Ok(callbacks)
}

/// Names of the static arrays emitted for a widget.
fn data_symbols(w: &Widget) -> Vec<String> {
    match w.kind {
        WidgetKind::Dropdown => vec![format!("{}_options", w.var_name)],
        WidgetKind::Plot => vec![
            format!("{}_x", w.var_name),
            format!("{}_y", w.var_name),
            format!("{}_data", w.var_name),
        ],
        _ => Vec::new(),
    }
}

struct Generator<'a> {
    session: &'a EditorSession,
    options: CodeGenOptions,
    order: Vec<Visit<'a>>,
    callbacks: Vec<Option<String>>,
    out: String,
}

impl Generator<'_> {
    fn section(&mut self, title: &str) {
        if self.options.comments {
            self.out.push_str(&format!("// ---- {title} ----\n"));
        }
    }

    fn header(&mut self) {
        let project = &self.session.project;
        if self.options.comments {
            let rule = format!("// {}\n", "=".repeat(77));
            self.out.push_str(&rule);
            self.out.push_str(&format!("// {}\n", project.name));
            self.out.push_str(&format!(
                "// Generated by Gooey RAD Builder for the Gooey widget API ({})\n",
                api::API_REVISION
            ));
            self.out.push_str(&format!(
                "// Target: {} / {}\n",
                project.platform, project.language
            ));
            self.out.push_str(&rule);
            self.out.push('\n');
        } else {
            self.out.push_str("// --- generated by Gooey RAD Builder ---\n");
        }
        self.out.push_str("#include <Gooey/gooey.h>\n");
        self.out.push_str("#include <stdbool.h>\n");
        self.out.push_str("#include <stdio.h>\n\n");
    }

    fn aliases(&mut self) {
        let aliases: Vec<(String, String)> = self
            .order
            .iter()
            .filter_map(|v| {
                v.widget
                    .macro_name
                    .as_ref()
                    .map(|m| (m.clone(), v.widget.var_name.clone()))
            })
            .collect();
        if aliases.is_empty() {
            return;
        }
        self.section("Widget aliases");
        for (name, var) in aliases {
            self.out.push_str(&format!("#define {name} {var}\n"));
        }
        self.out.push('\n');
    }

    fn globals(&mut self) {
        self.section("Widgets");
        self.out.push_str(&format!("GooeyWindow *{WINDOW_VAR} = NULL;\n"));
        for visit in &self.order {
            let w = visit.widget;
            self.out.push_str(&format!(
                "{} *{} = NULL;\n",
                api::c_type(w.kind),
                w.var_name
            ));
        }
        self.out.push('\n');
    }

    fn static_data(&mut self) -> Result<(), GenerationError> {
        let mut data = String::new();
        for visit in &self.order {
            let w = visit.widget;
            let p = &w.props;
            match w.kind {
                WidgetKind::Dropdown if !p.options.is_empty() => {
                    let items: Vec<String> = p.options.iter().map(|o| c_string(o)).collect();
                    data.push_str(&format!(
                        "static const char *{}_options[] = {{{}}};\n",
                        w.var_name,
                        items.join(", ")
                    ));
                }
                WidgetKind::Plot => {
                    let x = plot_values(w, "xAxisDataList", &p.x_data)?;
                    let y = plot_values(w, "yAxisDataList", &p.y_data)?;
                    let count = x.len().min(y.len());
                    if x.len() != y.len() {
                        debug!(
                            widget = %w.id,
                            x = x.len(),
                            y = y.len(),
                            "plot axes differ in length"
                        );
                    }
                    let x_ptr = float_array(&mut data, &format!("{}_x", w.var_name), &x);
                    let y_ptr = float_array(&mut data, &format!("{}_y", w.var_name), &y);
                    data.push_str(&format!("static GooeyPlotData {}_data = {{\n", w.var_name));
                    data.push_str(&format!("    .x_data = {x_ptr},\n"));
                    data.push_str(&format!("    .y_data = {y_ptr},\n"));
                    data.push_str(&format!("    .data_count = {count},\n"));
                    data.push_str(&format!("    .title = {},\n", c_string(&p.title)));
                    data.push_str(&format!("    .x_label = {},\n", c_string(&p.x_label)));
                    data.push_str(&format!("    .y_label = {},\n", c_string(&p.y_label)));
                    data.push_str("};\n");
                }
                _ => {}
            }
        }
        if !data.is_empty() {
            self.section("Static data");
            self.out.push_str(&data);
            self.out.push('\n');
        }
        Ok(())
    }

    fn callbacks(&mut self) {
        let mut defs = Vec::new();
        for (visit, name) in self.order.iter().zip(&self.callbacks) {
            let (Some(name), Some(event), Some(cb)) = (
                name,
                visit.widget.kind.event_kind(),
                visit.widget.callback.as_ref(),
            ) else {
                continue;
            };
            defs.push(callback_definition(
                name,
                event,
                cb.code.get(&event).map(String::as_str),
            ));
        }
        if defs.is_empty() {
            return;
        }
        self.section("Callbacks");
        for def in defs {
            self.out.push_str(&def);
            self.out.push('\n');
        }
    }

    fn init_ui(&mut self) -> Result<(), GenerationError> {
        let window = &self.session.window;
        let mut body = Vec::new();
        body.push(format!(
            "{WINDOW_VAR} = {};",
            api::WINDOW_CREATE.call(&[
                c_string(&window.title),
                window.x.to_string(),
                window.y.to_string(),
                window.width.to_string(),
                window.height.to_string(),
            ])?
        ));
        body.push(statement(
            api::WINDOW_MAKE_VISIBLE,
            &[WINDOW_VAR, c_bool(window.visible)],
        )?);
        body.push(statement(
            api::WINDOW_MAKE_RESIZABLE,
            &[WINDOW_VAR, c_bool(window.resizable)],
        )?);
        if window.debug_overlay {
            body.push(statement(
                api::WINDOW_ENABLE_DEBUG_OVERLAY,
                &[WINDOW_VAR, "true"],
            )?);
        }
        if window.continuous_redraw {
            body.push(statement(api::WINDOW_SET_CONTINUOUS_REDRAW, &[WINDOW_VAR])?);
        }

        // Layouts are built once all of their descendants are attached.
        let mut open_layouts: Vec<(usize, &str)> = Vec::new();
        for (visit, callback) in self.order.iter().zip(&self.callbacks) {
            while let Some(&(depth, var)) = open_layouts.last()
                && depth >= visit.depth
            {
                body.push(statement(api::LAYOUT_BUILD, &[var])?);
                open_layouts.pop();
            }

            let w = visit.widget;
            body.push(String::new());
            if self.options.comments {
                body.push(format!("// {} ({})", w.var_name, w.kind));
            }
            body.extend(create_statements(w, callback.as_deref())?);
            if let Some(attach) = self.attach_statement(visit)? {
                body.push(attach);
            }
            if w.kind.is_layout() {
                open_layouts.push((visit.depth, w.var_name.as_str()));
            }
        }
        while let Some((_, var)) = open_layouts.pop() {
            body.push(statement(api::LAYOUT_BUILD, &[var])?);
        }

        self.section("UI setup");
        self.out.push_str("void init_ui(void)\n{\n");
        for line in body {
            if line.is_empty() {
                self.out.push('\n');
            } else {
                self.out.push_str(&format!("    {line}\n"));
            }
        }
        self.out.push_str("}\n");
        Ok(())
    }

    fn attach_statement(&self, visit: &Visit<'_>) -> Result<Option<String>, GenerationError> {
        let w = visit.widget;
        if w.kind == WidgetKind::Menu {
            return Ok(None);
        }
        let var = w.var_name.as_str();
        let Some(placement) = visit.placement else {
            return statement(api::WINDOW_REGISTER_WIDGET, &[WINDOW_VAR, var]).map(Some);
        };
        let parent = self
            .session
            .widget(&placement.parent)
            .map(|p| p.var_name.as_str())
            .ok_or_else(|| GenerationError::DanglingParent {
                widget: w.id.clone(),
                parent: placement.parent.clone(),
            })?;
        let call = match placement.slot {
            Slot::Pane(i) => statement(
                api::CONTAINER_ADD_WIDGET,
                &[WINDOW_VAR, parent, &i.to_string(), var],
            )?,
            Slot::Tab(i) => statement(
                api::TABS_ADD_WIDGET,
                &[WINDOW_VAR, parent, &i.to_string(), var],
            )?,
            Slot::None => statement(api::LAYOUT_ADD_CHILD, &[WINDOW_VAR, parent, var])?,
        };
        Ok(Some(call))
    }

    fn main(&mut self) -> Result<(), GenerationError> {
        self.out.push('\n');
        self.out.push_str("int main(void)\n{\n");
        for line in [
            statement::<&str>(api::GOOEY_INIT, &[])?,
            "init_ui();".to_string(),
            statement(api::WINDOW_RUN, &["1", WINDOW_VAR])?,
            statement(api::WINDOW_CLEANUP, &["1", WINDOW_VAR])?,
            "return 0;".to_string(),
        ] {
            self.out.push_str(&format!("    {line}\n"));
        }
        self.out.push_str("}\n");
        Ok(())
    }
}

/// Creation call plus follow-up mutators for one widget.
fn create_statements(w: &Widget, callback: Option<&str>) -> Result<Vec<String>, GenerationError> {
    let p = &w.props;
    let g = w.geometry;
    let (x, y, width, height) = (
        g.x.to_string(),
        g.y.to_string(),
        g.width.to_string(),
        g.height.to_string(),
    );
    let cb = callback.unwrap_or("NULL").to_string();
    let null = "NULL".to_string();
    let var = w.var_name.as_str();
    let assign = |f: ApiFunction, args: Vec<String>| -> Result<String, GenerationError> {
        Ok(format!("{var} = {};", f.call(&args)?))
    };

    let mut lines = Vec::new();
    match w.kind {
        WidgetKind::Button => lines.push(assign(
            api::BUTTON_CREATE,
            vec![c_string(&p.text), x, y, width, height, cb, null],
        )?),
        WidgetKind::Label => lines.push(assign(
            api::LABEL_CREATE,
            vec![c_string(&p.text), LABEL_FONT_SIZE.to_string(), x, y],
        )?),
        WidgetKind::Input => lines.push(assign(
            api::TEXTBOX_CREATE,
            vec![
                x,
                y,
                width,
                height,
                c_string(&p.text),
                c_bool(false).to_string(),
                cb,
                null,
            ],
        )?),
        WidgetKind::Checkbox => {
            lines.push(assign(
                api::CHECKBOX_CREATE,
                vec![x, y, c_string(&p.text), cb, null],
            )?);
            if p.checked {
                lines.push(statement(api::CHECKBOX_SET_CHECKED, &[var, "true"])?);
            }
        }
        WidgetKind::Radio => lines.push(assign(
            api::RADIOBUTTON_CREATE,
            vec![x, y, c_string(&p.text), cb, null],
        )?),
        WidgetKind::RadioButtonGroup => {
            lines.push(assign(api::RADIOGROUP_CREATE, Vec::new())?);
            for (i, option) in p.options.iter().enumerate() {
                let offset = i32::try_from(i)
                    .ok()
                    .and_then(|i| RADIO_SPACING.checked_mul(i))
                    .and_then(|d| g.y.checked_add(d))
                    .ok_or_else(|| GenerationError::InvalidAttribute {
                        widget: w.id.clone(),
                        key: "y",
                        value: g.y.to_string(),
                        reason: "radio button offsets overflow",
                    })?;
                lines.push(statement(
                    api::RADIOGROUP_ADD_CHILD,
                    &[
                        WINDOW_VAR,
                        var,
                        &x,
                        &offset.to_string(),
                        &c_string(option),
                        &cb,
                        "NULL",
                    ],
                )?);
            }
        }
        WidgetKind::Slider => {
            lines.push(assign(
                api::SLIDER_CREATE,
                vec![
                    x,
                    y,
                    width,
                    p.min.to_string(),
                    p.max.to_string(),
                    c_bool(p.show_hints).to_string(),
                    cb,
                    null,
                ],
            )?);
            lines.push(statement(api::SLIDER_SET_VALUE, &[var, &p.value.to_string()])?);
        }
        WidgetKind::Image => lines.push(assign(
            api::IMAGE_CREATE,
            vec![c_string(&p.path), x, y, width, height, cb, null],
        )?),
        WidgetKind::DropSurface => lines.push(assign(
            api::DROPSURFACE_CREATE,
            vec![x, y, width, height, c_string(&p.message), cb, null],
        )?),
        WidgetKind::Dropdown => {
            let options = if p.options.is_empty() {
                "NULL".to_string()
            } else {
                format!("{var}_options")
            };
            lines.push(assign(
                api::DROPDOWN_CREATE,
                vec![x, y, width, height, options, p.options.len().to_string(), cb, null],
            )?);
        }
        WidgetKind::List => {
            lines.push(assign(
                api::LIST_CREATE,
                vec![x, y, width, height, cb, null],
            )?);
            for item in &p.list_items {
                lines.push(statement(
                    api::LIST_ADD_ITEM,
                    &[var, &c_string(&item.name), &c_string(&item.description)],
                )?);
            }
        }
        WidgetKind::Progressbar => lines.push(assign(
            api::PROGRESSBAR_CREATE,
            vec![x, y, width, height, p.value.to_string()],
        )?),
        WidgetKind::Meter => lines.push(assign(
            api::METER_CREATE,
            vec![x, y, width, height, p.value.to_string(), c_string(&p.label)],
        )?),
        WidgetKind::GSwitch => lines.push(assign(
            api::SWITCH_CREATE,
            vec![
                x,
                y,
                c_bool(p.checked).to_string(),
                c_bool(p.show_hints).to_string(),
                cb,
                null,
            ],
        )?),
        WidgetKind::Tabs => {
            lines.push(assign(
                api::TABS_CREATE,
                vec![x, y, width, height, c_bool(p.sidebar).to_string()],
            )?);
            for name in &p.pane_names {
                lines.push(statement(api::TABS_INSERT_TAB, &[var, &c_string(name)])?);
            }
            lines.push(statement(
                api::TABS_SET_ACTIVE_TAB,
                &[var, &p.active_pane.to_string()],
            )?);
        }
        WidgetKind::Container => {
            lines.push(assign(api::CONTAINER_CREATE, vec![x, y, width, height])?);
            for _ in &p.pane_names {
                lines.push(statement(api::CONTAINER_INSERT_CONTAINER, &[var])?);
            }
            lines.push(statement(
                api::CONTAINER_SET_ACTIVE_CONTAINER,
                &[var, &p.active_pane.to_string()],
            )?);
        }
        WidgetKind::Plot => {
            let plot_type = api::plot_type_constant(&p.plot_type).ok_or_else(|| {
                GenerationError::InvalidAttribute {
                    widget: w.id.clone(),
                    key: "plotType",
                    value: p.plot_type.clone(),
                    reason: "expected line, bar or scatter",
                }
            })?;
            lines.push(assign(
                api::PLOT_CREATE,
                vec![
                    plot_type.to_string(),
                    format!("&{var}_data"),
                    x,
                    y,
                    width,
                    height,
                ],
            )?);
        }
        WidgetKind::Canvas => {
            lines.push(assign(
                api::CANVAS_CREATE,
                vec![x, y, width.clone(), height.clone(), cb, null],
            )?);
            if !p.bg_color.is_empty() {
                let color = HEX_COLOR
                    .captures(&p.bg_color)
                    .and_then(|c| c.get(1))
                    .map(|m| format!("0x{}", m.as_str().to_lowercase()))
                    .ok_or_else(|| GenerationError::InvalidAttribute {
                        widget: w.id.clone(),
                        key: "bgColor",
                        value: p.bg_color.clone(),
                        reason: "expected a #rrggbb color",
                    })?;
                lines.push(statement(
                    api::CANVAS_DRAW_RECTANGLE,
                    &[
                        var, "0", "0", &width, &height, &color, "true", "1.0f", "false", "0.0f",
                    ],
                )?);
            }
        }
        WidgetKind::Overlay => lines.push(assign(
            api::OVERLAY_CREATE,
            vec![x, y, width, height, p.opacity.to_string()],
        )?),
        WidgetKind::Menu => lines.push(assign(api::MENU_SET, vec![WINDOW_VAR.to_string()])?),
        WidgetKind::VerticalLayout | WidgetKind::HorizontalLayout => lines.push(assign(
            api::LAYOUT_CREATE,
            vec![
                api::layout_type_constant(w.kind).to_string(),
                x,
                y,
                width,
                height,
            ],
        )?),
    }
    Ok(lines)
}

/// A callback definition. Stored text that already is a complete definition
/// of `name` is emitted as is; otherwise it becomes the function body.
fn callback_definition(name: &str, event: EventKind, code: Option<&str>) -> String {
    let signature = format!("void {name}({})", event.c_params());
    match code {
        Some(code) if is_definition_of(code, name) => {
            let mut def = code.trim().to_string();
            def.push('\n');
            def
        }
        Some(code) => {
            let newline = if code.ends_with('\n') { "" } else { "\n" };
            format!("{signature}\n{{\n{code}{newline}}}\n")
        }
        None => format!("{signature}\n{{\n    /* {event} event handler */\n}}\n"),
    }
}

fn is_definition_of(code: &str, name: &str) -> bool {
    code.trim_start()
        .strip_prefix("void")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(|rest| rest.trim_start())
        .and_then(|rest| rest.strip_prefix(name))
        .is_some_and(|rest| rest.trim_start().starts_with('('))
}

fn plot_values(w: &Widget, key: &'static str, list: &str) -> Result<Vec<String>, GenerationError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|token| {
            if FLOAT_LITERAL.is_match(token) {
                Ok(token.to_string())
            } else {
                Err(GenerationError::InvalidAttribute {
                    widget: w.id.clone(),
                    key,
                    value: list.to_string(),
                    reason: "expected comma-separated numbers",
                })
            }
        })
        .collect()
}

/// Emits `static float name[]` and returns the pointer expression for it.
fn float_array(out: &mut String, name: &str, values: &[String]) -> String {
    if values.is_empty() {
        return "NULL".to_string();
    }
    out.push_str(&format!(
        "static float {name}[] = {{{}}};\n",
        values.join(", ")
    ));
    name.to_string()
}

fn statement<S: AsRef<str>>(f: ApiFunction, args: &[S]) -> Result<String, GenerationError> {
    Ok(format!("{};", f.call(args)?))
}

fn c_string(s: &str) -> String {
    format!("\"{}\"", escape(s))
}

fn c_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Geometry;
    use pretty_assertions::assert_eq;

    /// 1 Container with 2 children in pane 0, 1 Button with a callback, 1 Label.
    fn five_widgets() -> EditorSession {
        let mut session = EditorSession::new();
        let container = session
            .create_widget(WidgetKind::Container, 10, 10, None)
            .unwrap();
        session
            .create_widget(WidgetKind::Button, 5, 5, Some((&container, Slot::Pane(0))))
            .unwrap();
        session
            .create_widget(WidgetKind::Slider, 5, 50, Some((&container, Slot::Pane(0))))
            .unwrap();
        let button = session
            .create_widget(WidgetKind::Button, 300, 10, None)
            .unwrap();
        session.set_callback_name(&button, "on_ok_clicked").unwrap();
        session
            .set_callback_code(&button, EventKind::Button, "    printf(\"ok\\n\");\n")
            .unwrap();
        session
            .create_widget(WidgetKind::Label, 300, 60, None)
            .unwrap();
        session
    }

    fn position(source: &str, needle: &str) -> usize {
        source
            .find(needle)
            .unwrap_or_else(|| panic!("`{needle}` not found in:\n{source}"))
    }

    #[test]
    fn test_empty_project_is_an_error() {
        let session = EditorSession::new();
        assert!(matches!(
            generate(&session, &CodeGenOptions::default()),
            Err(GenerationError::EmptyProject)
        ));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let session = five_widgets();
        let first = generate(&session, &CodeGenOptions::default()).unwrap();
        let second = generate(&session, &CodeGenOptions::default()).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_five_widget_program() {
        let session = five_widgets();
        let source = generate(
            &session,
            &CodeGenOptions {
                format: CodeGenFormat::Full,
                comments: false,
            },
        )
        .unwrap();

        let expected = "\
// --- generated by Gooey RAD Builder ---
#include <Gooey/gooey.h>
#include <stdbool.h>
#include <stdio.h>

GooeyWindow *win = NULL;
GooeyContainers *container_1 = NULL;
GooeyButton *button_2 = NULL;
GooeySlider *slider_3 = NULL;
GooeyButton *button_4 = NULL;
GooeyLabel *label_5 = NULL;

void on_ok_clicked(void *user_data)
{
    printf(\"ok\\n\");
}

void init_ui(void)
{
    win = GooeyWindow_Create(\"My Window\", 0, 0, 800, 600);
    GooeyWindow_MakeVisible(win, true);
    GooeyWindow_MakeResizable(win, true);

    container_1 = GooeyContainer_Create(10, 10, 200, 200);
    GooeyContainer_InsertContainer(container_1);
    GooeyContainer_SetActiveContainer(container_1, 0);
    GooeyWindow_RegisterWidget(win, container_1);

    button_2 = GooeyButton_Create(\"Button\", 5, 5, 100, 30, NULL, NULL);
    GooeyContainer_AddWidget(win, container_1, 0, button_2);

    slider_3 = GooeySlider_Create(5, 50, 150, 0, 100, false, NULL, NULL);
    GooeySlider_SetValue(slider_3, 50);
    GooeyContainer_AddWidget(win, container_1, 0, slider_3);

    button_4 = GooeyButton_Create(\"Button\", 300, 10, 100, 30, on_ok_clicked, NULL);
    GooeyWindow_RegisterWidget(win, button_4);

    label_5 = GooeyLabel_Create(\"Label\", 14.0f, 300, 60);
    GooeyWindow_RegisterWidget(win, label_5);
}

int main(void)
{
    Gooey_Init();
    init_ui();
    GooeyWindow_Run(1, win);
    GooeyWindow_Cleanup(1, win);
    return 0;
}
";
        assert_eq!(source, expected);
    }

    #[test]
    fn test_parents_are_created_before_children() {
        let mut session = EditorSession::new();
        let container = session
            .create_widget(WidgetKind::Container, 0, 0, None)
            .unwrap();
        let tabs = session.create_widget(WidgetKind::Tabs, 0, 0, None).unwrap();
        // Placed in a different order than created.
        let a = session.create_widget(WidgetKind::Button, 0, 0, None).unwrap();
        let b = session.create_widget(WidgetKind::Button, 0, 0, None).unwrap();
        let l = session.create_widget(WidgetKind::Label, 0, 0, None).unwrap();
        session.place(&l, Some(&tabs), Slot::Tab(1)).unwrap();
        session.place(&a, Some(&container), Slot::Pane(0)).unwrap();
        session.place(&b, Some(&container), Slot::Pane(0)).unwrap();

        let source = generate(&session, &CodeGenOptions::default()).unwrap();
        let container_at = position(&source, "container_1 = GooeyContainer_Create");
        let tabs_at = position(&source, "tabs_2 = GooeyTabs_Create");
        assert!(container_at < position(&source, "button_3 = GooeyButton_Create"));
        assert!(container_at < position(&source, "button_4 = GooeyButton_Create"));
        assert!(tabs_at < position(&source, "label_5 = GooeyLabel_Create"));
        assert!(source.contains("GooeyTabs_AddWidget(win, tabs_2, 1, label_5);"));
    }

    #[test]
    fn test_layouts_are_built_after_their_children() {
        let mut session = EditorSession::new();
        let layout = session
            .create_widget(WidgetKind::HorizontalLayout, 0, 0, None)
            .unwrap();
        session
            .create_widget(WidgetKind::Button, 0, 0, Some((&layout, Slot::None)))
            .unwrap();
        session
            .create_widget(WidgetKind::Label, 0, 0, None)
            .unwrap();

        let source = generate(&session, &CodeGenOptions::default()).unwrap();
        assert!(source.contains("GooeyLayout_Create(LAYOUT_HORIZONTAL, 0, 0, 200, 150)"));
        let child = position(&source, "GooeyLayout_AddChild(win, horizontallayout_1, button_2);");
        let build = position(&source, "GooeyLayout_Build(horizontallayout_1);");
        let label = position(&source, "label_3 = GooeyLabel_Create");
        assert!(child < build);
        assert!(build < label);
    }

    #[test]
    fn test_callback_signatures_follow_event_kind() {
        let mut session = EditorSession::new();
        let slider = session
            .create_widget(WidgetKind::Slider, 0, 0, None)
            .unwrap();
        session
            .set_callback_code(&slider, EventKind::Slider, "    printf(\"%ld\\n\", value);")
            .unwrap();
        let drop = session
            .create_widget(WidgetKind::DropSurface, 0, 0, None)
            .unwrap();
        session.set_callback_name(&drop, "on_drop").unwrap();

        let source = generate(&session, &CodeGenOptions::default()).unwrap();
        assert!(source.contains(
            "void on_slider_1_slider(long value, void *user_data)\n{\n    printf(\"%ld\\n\", value);\n}\n"
        ));
        assert!(source.contains(
            "void on_drop(char *mime, char *file_path, void *user_data)\n{\n    /* dropsurface event handler */\n}\n"
        ));
        assert!(source.contains(
            "GooeySlider_Create(0, 0, 150, 0, 100, false, on_slider_1_slider, NULL)"
        ));
    }

    #[test]
    fn test_complete_definitions_are_emitted_verbatim() {
        let def = "void on_apply(void *user_data)\n{\n    puts(\"apply\");\n}";
        assert_eq!(
            callback_definition("on_apply", EventKind::Button, Some(def)),
            format!("{def}\n")
        );
        assert!(!is_definition_of("void on_apply_later(void)", "on_apply"));
        assert!(!is_definition_of("voidon_apply(", "on_apply"));
        assert!(is_definition_of("  void  on_apply (void *p) {}", "on_apply"));
    }

    #[test]
    fn test_macros_and_static_data() {
        let mut session = EditorSession::new();
        let dropdown = session
            .create_widget(WidgetKind::Dropdown, 0, 0, None)
            .unwrap();
        session
            .apply_attributes(&dropdown, &[("dropdownOptions", "Red,Green")])
            .unwrap();
        session.set_macro(&dropdown, "COLOR_PICK").unwrap();
        session
            .create_widget(WidgetKind::Plot, 0, 0, None)
            .unwrap();

        let source = generate(&session, &CodeGenOptions::default()).unwrap();
        assert!(source.contains("#define COLOR_PICK dropdown_1\n"));
        assert!(source.contains("static const char *dropdown_1_options[] = {\"Red\", \"Green\"};"));
        assert!(source.contains("dropdown_1_options, 2, NULL, NULL"));
        assert!(source.contains("static float plot_2_x[] = {1.0f, 2.0f, 3.0f};"));
        assert!(source.contains("    .data_count = 3,\n"));
        assert!(source.contains(
            "plot_2 = GooeyPlot_Create(GOOEY_PLOT_LINE, &plot_2_data, 0, 0, 200, 150);"
        ));
    }

    #[test]
    fn test_init_only_has_no_main() {
        let session = five_widgets();
        let source = generate(
            &session,
            &CodeGenOptions {
                format: CodeGenFormat::InitOnly,
                comments: true,
            },
        )
        .unwrap();
        assert!(source.contains("void init_ui(void)"));
        assert!(!source.contains("int main"));
        assert!(source.contains("// ---- Callbacks ----"));
        assert!(source.contains("// button_4 (Button)"));
    }

    #[test]
    fn test_invalid_state_is_rejected() {
        let mut session = EditorSession::new();
        let plot = session
            .create_widget(WidgetKind::Plot, 0, 0, None)
            .unwrap();
        session
            .apply_attributes(&plot, &[("plotType", "pie")])
            .unwrap();
        assert!(matches!(
            generate(&session, &CodeGenOptions::default()),
            Err(GenerationError::InvalidAttribute { key: "plotType", .. })
        ));

        let mut session = EditorSession::new();
        session
            .create_widget(WidgetKind::Button, 0, 0, None)
            .unwrap();
        let other = session
            .create_widget(WidgetKind::Button, 0, 0, None)
            .unwrap();
        session.set_callback_name(&other, "button_1").unwrap();
        assert!(matches!(
            generate(&session, &CodeGenOptions::default()),
            Err(GenerationError::DuplicateSymbol(name)) if name == "button_1"
        ));
    }

    #[test]
    fn test_reserved_macro_is_rejected() {
        let mut session = EditorSession::new();
        let mut button = Widget::new(WidgetId::new("widget_1"), WidgetKind::Button, 0, 0);
        button.var_name = "button_1".into();
        button.macro_name = Some("NULL".into());
        session.insert_loaded(button);

        assert!(matches!(
            generate(&session, &CodeGenOptions::default()),
            Err(GenerationError::InvalidIdentifier { name, .. }) if name == "NULL"
        ));
    }

    #[test]
    fn test_radio_offsets_overflow_is_an_error() {
        let mut session = EditorSession::new();
        let group = session
            .create_widget(WidgetKind::RadioButtonGroup, 0, 0, None)
            .unwrap();
        session
            .apply_attributes(&group, &[("radioOptions", r#"["a","b","c"]"#)])
            .unwrap();
        session
            .set_geometry(&group, Geometry::new(0, 2_147_483_640, 150, 100))
            .unwrap();

        assert!(matches!(
            generate(&session, &CodeGenOptions::default()),
            Err(GenerationError::InvalidAttribute { key: "y", .. })
        ));

        // The last offset still fits.
        session
            .set_geometry(&group, Geometry::new(0, i32::MAX - 50, 150, 100))
            .unwrap();
        let source = generate(&session, &CodeGenOptions::default()).unwrap();
        assert!(source.contains(&format!("{}, \"c\"", i32::MAX)));
    }

    #[test]
    fn test_geometry_and_window_flags() {
        let mut session = five_widgets();
        session.window.debug_overlay = true;
        session.window.continuous_redraw = true;
        session.window.title = "Quote \"me\"".into();
        let label = session.find_by_var("label_5").unwrap().id.clone();
        session
            .set_geometry(&label, Geometry::new(-3, 7, 80, 16))
            .unwrap();

        let source = generate(&session, &CodeGenOptions::default()).unwrap();
        assert!(source.contains("win = GooeyWindow_Create(\"Quote \\\"me\\\"\", 0, 0, 800, 600);"));
        assert!(source.contains("GooeyWindow_EnableDebugOverlay(win, true);"));
        assert!(source.contains("GooeyWindow_SetContinuousRedraw(win);"));
        assert!(source.contains("GooeyLabel_Create(\"Label\", 14.0f, -3, 7)"));
    }
}
