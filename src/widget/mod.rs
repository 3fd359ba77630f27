use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for WidgetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Position and size in pixels. `x`/`y` are relative to the widget's immediate
/// placement context: the canvas, a container pane or a tab pane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WidgetKind {
    Button,
    Label,
    Input,
    Checkbox,
    Radio,
    RadioButtonGroup,
    Slider,
    Image,
    DropSurface,
    Dropdown,
    List,
    Progressbar,
    Meter,
    GSwitch,
    Tabs,
    Container,
    Plot,
    Canvas,
    Overlay,
    Menu,
    VerticalLayout,
    HorizontalLayout,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 22] = [
        WidgetKind::Button,
        WidgetKind::Label,
        WidgetKind::Input,
        WidgetKind::Checkbox,
        WidgetKind::Radio,
        WidgetKind::RadioButtonGroup,
        WidgetKind::Slider,
        WidgetKind::Image,
        WidgetKind::DropSurface,
        WidgetKind::Dropdown,
        WidgetKind::List,
        WidgetKind::Progressbar,
        WidgetKind::Meter,
        WidgetKind::GSwitch,
        WidgetKind::Tabs,
        WidgetKind::Container,
        WidgetKind::Plot,
        WidgetKind::Canvas,
        WidgetKind::Overlay,
        WidgetKind::Menu,
        WidgetKind::VerticalLayout,
        WidgetKind::HorizontalLayout,
    ];

    /// Name used in project files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Button => "Button",
            WidgetKind::Label => "Label",
            WidgetKind::Input => "Input",
            WidgetKind::Checkbox => "Checkbox",
            WidgetKind::Radio => "Radio",
            WidgetKind::RadioButtonGroup => "RadioButtonGroup",
            WidgetKind::Slider => "Slider",
            WidgetKind::Image => "Image",
            WidgetKind::DropSurface => "DropSurface",
            WidgetKind::Dropdown => "Dropdown",
            WidgetKind::List => "List",
            WidgetKind::Progressbar => "Progressbar",
            WidgetKind::Meter => "Meter",
            WidgetKind::GSwitch => "GSwitch",
            WidgetKind::Tabs => "Tabs",
            WidgetKind::Container => "Container",
            WidgetKind::Plot => "Plot",
            WidgetKind::Canvas => "Canvas",
            WidgetKind::Overlay => "Overlay",
            WidgetKind::Menu => "Menu",
            WidgetKind::VerticalLayout => "VerticalLayout",
            WidgetKind::HorizontalLayout => "HorizontalLayout",
        }
    }

    /// Parses a project-file type name. `Textbox` is accepted as an alias of `Input`.
    pub fn parse(name: &str) -> Option<Self> {
        if name == "Textbox" {
            return Some(WidgetKind::Input);
        }
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Prefix of generated variable names.
    pub fn var_prefix(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Container and Tabs own numbered panes.
    pub const fn has_panes(&self) -> bool {
        matches!(self, WidgetKind::Container | WidgetKind::Tabs)
    }

    pub const fn is_layout(&self) -> bool {
        matches!(
            self,
            WidgetKind::VerticalLayout | WidgetKind::HorizontalLayout
        )
    }

    /// Whether widgets can be placed inside this one at all.
    pub const fn is_parent_kind(&self) -> bool {
        self.has_panes() || self.is_layout()
    }

    /// The single event kind a widget of this type can raise, if any.
    pub const fn event_kind(&self) -> Option<EventKind> {
        match self {
            WidgetKind::Button => Some(EventKind::Button),
            WidgetKind::Slider => Some(EventKind::Slider),
            WidgetKind::Checkbox => Some(EventKind::Checkbox),
            WidgetKind::Input => Some(EventKind::Input),
            WidgetKind::Image => Some(EventKind::Image),
            WidgetKind::Dropdown => Some(EventKind::Dropdown),
            WidgetKind::DropSurface => Some(EventKind::DropSurface),
            WidgetKind::List => Some(EventKind::List),
            WidgetKind::GSwitch => Some(EventKind::Switch),
            WidgetKind::Radio | WidgetKind::RadioButtonGroup => Some(EventKind::RadioButton),
            WidgetKind::Canvas => Some(EventKind::Canvas),
            WidgetKind::Plot => Some(EventKind::Plot),
            WidgetKind::Tabs => Some(EventKind::Tabs),
            WidgetKind::Container => Some(EventKind::Container),
            WidgetKind::Label
            | WidgetKind::Progressbar
            | WidgetKind::Meter
            | WidgetKind::Overlay
            | WidgetKind::Menu
            | WidgetKind::VerticalLayout
            | WidgetKind::HorizontalLayout => None,
        }
    }

    /// Returns the default size for a widget of this kind.
    pub const fn default_size(&self) -> (i32, i32) {
        match self {
            WidgetKind::Button => (100, 30),
            WidgetKind::Label => (100, 20),
            WidgetKind::Input => (150, 24),
            WidgetKind::Checkbox => (16, 16),
            WidgetKind::Radio => (100, 30),
            WidgetKind::RadioButtonGroup => (150, 100),
            WidgetKind::Slider => (150, 5),
            WidgetKind::Image => (150, 150),
            WidgetKind::DropSurface => (200, 150),
            WidgetKind::Dropdown => (100, 30),
            WidgetKind::List => (200, 200),
            WidgetKind::Progressbar => (150, 10),
            WidgetKind::Meter => (100, 100),
            WidgetKind::GSwitch => (40, 20),
            WidgetKind::Tabs => (200, 150),
            WidgetKind::Container => (200, 200),
            WidgetKind::Plot => (200, 150),
            WidgetKind::Canvas => (200, 150),
            WidgetKind::Overlay => (200, 150),
            WidgetKind::Menu => (100, 30),
            WidgetKind::VerticalLayout => (200, 150),
            WidgetKind::HorizontalLayout => (200, 150),
        }
    }

    /// Returns the default properties for a widget of this kind.
    /// Only the fields persisted for the kind are set; everything else stays at
    /// `WidgetProps::default()`.
    pub fn default_props(&self) -> WidgetProps {
        match self {
            WidgetKind::Button => WidgetProps {
                text: "Button".into(),
                ..Default::default()
            },
            WidgetKind::Label => WidgetProps {
                text: "Label".into(),
                ..Default::default()
            },
            WidgetKind::Input => WidgetProps::default(),
            WidgetKind::Checkbox => WidgetProps {
                text: "Checkbox".into(),
                ..Default::default()
            },
            WidgetKind::Radio => WidgetProps {
                text: "Radio".into(),
                ..Default::default()
            },
            WidgetKind::RadioButtonGroup => WidgetProps::default(),
            WidgetKind::Slider => WidgetProps {
                min: 0,
                max: 100,
                value: 50,
                ..Default::default()
            },
            WidgetKind::Image => WidgetProps {
                path: "./assets/example.png".into(),
                ..Default::default()
            },
            WidgetKind::DropSurface => WidgetProps {
                message: "Drop files here..".into(),
                ..Default::default()
            },
            WidgetKind::Dropdown => WidgetProps::default(),
            WidgetKind::List => WidgetProps::default(),
            WidgetKind::Progressbar => WidgetProps {
                value: 50,
                ..Default::default()
            },
            WidgetKind::Meter => WidgetProps {
                value: 50,
                label: "Meter".into(),
                ..Default::default()
            },
            WidgetKind::GSwitch => WidgetProps::default(),
            WidgetKind::Tabs => WidgetProps {
                pane_names: vec!["Tab 1".into(), "Tab 2".into()],
                ..Default::default()
            },
            WidgetKind::Container => WidgetProps {
                border_width: 1,
                border_radius: 4,
                pane_names: vec!["Container 0".into()],
                ..Default::default()
            },
            WidgetKind::Plot => WidgetProps {
                plot_type: "line".into(),
                x_data: "1.0f,2.0f,3.0f".into(),
                y_data: "1.0f,2.0f,3.0f".into(),
                x_label: "X-Axis Label".into(),
                y_label: "Y-Axis Label".into(),
                title: "Plot Title".into(),
                ..Default::default()
            },
            WidgetKind::Canvas => WidgetProps {
                bg_color: "#ffffff".into(),
                ..Default::default()
            },
            WidgetKind::Overlay => WidgetProps {
                opacity: 70,
                ..Default::default()
            },
            WidgetKind::Menu | WidgetKind::VerticalLayout | WidgetKind::HorizontalLayout => {
                WidgetProps::default()
            }
        }
    }

    /// Name given to pane `index` when a pane is added to a Container or Tabs widget.
    pub fn default_pane_name(&self, index: usize) -> String {
        match self {
            WidgetKind::Tabs => format!("Tab {}", index + 1),
            _ => format!("Container {index}"),
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of user events a callback can be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Button,
    Slider,
    Checkbox,
    Input,
    Image,
    Dropdown,
    DropSurface,
    List,
    Switch,
    RadioButton,
    Canvas,
    Plot,
    Tabs,
    Container,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::Button,
        EventKind::Slider,
        EventKind::Checkbox,
        EventKind::Input,
        EventKind::Image,
        EventKind::Dropdown,
        EventKind::DropSurface,
        EventKind::List,
        EventKind::Switch,
        EventKind::RadioButton,
        EventKind::Canvas,
        EventKind::Plot,
        EventKind::Tabs,
        EventKind::Container,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::Button => "button",
            EventKind::Slider => "slider",
            EventKind::Checkbox => "checkbox",
            EventKind::Input => "input",
            EventKind::Image => "image",
            EventKind::Dropdown => "dropdown",
            EventKind::DropSurface => "dropsurface",
            EventKind::List => "list",
            EventKind::Switch => "switch",
            EventKind::RadioButton => "radiobutton",
            EventKind::Canvas => "canvas",
            EventKind::Plot => "plot",
            EventKind::Tabs => "tabs",
            EventKind::Container => "container",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Element name holding the code for this event kind in project files.
    pub fn code_tag(&self) -> String {
        format!("{}_code", self.as_str())
    }

    /// Parses a `<kind>_code` element name.
    pub fn from_code_tag(tag: &str) -> Option<Self> {
        tag.strip_suffix("_code").and_then(Self::parse)
    }

    /// C parameter list of the handler for this event kind.
    pub const fn c_params(&self) -> &'static str {
        match self {
            EventKind::Button | EventKind::Image | EventKind::Plot => "void *user_data",
            EventKind::Slider => "long value, void *user_data",
            EventKind::Checkbox => "bool checked, void *user_data",
            EventKind::Input => "char *text, void *user_data",
            EventKind::Dropdown | EventKind::List => "int selected_index, void *user_data",
            EventKind::DropSurface => "char *mime, char *file_path, void *user_data",
            EventKind::Switch => "bool state, void *user_data",
            EventKind::RadioButton => "bool selected, void *user_data",
            EventKind::Canvas => "int x, int y, void *user_data",
            EventKind::Tabs => "int tab_index, void *user_data",
            EventKind::Container => "int container_index, void *user_data",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback registration for a widget: a C function name plus handler code per event kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub name: String,
    pub code: BTreeMap<EventKind, String>,
}

impl Callback {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.code.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub name: String,
    pub description: String,
}

/// Property bag shared by every widget kind. Which fields are meaningful (and
/// persisted) depends on the kind; see `serialize::attrs`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetProps {
    pub text: String,  // button/label/input/checkbox/radio
    pub checked: bool, // checkbox, switch state
    pub show_hints: bool,
    pub min: i64,
    pub max: i64,
    pub value: i64, // slider/progressbar/meter
    // dropdown + radio group options
    pub options: Vec<String>,
    pub selected: usize,
    pub list_items: Vec<ListItem>,
    pub path: String,    // image
    pub message: String, // drop surface
    pub label: String,   // meter
    // tabs / container panes
    pub pane_names: Vec<String>,
    pub active_pane: usize,
    pub sidebar: bool,
    pub border_width: u32,
    pub border_radius: u32,
    // plot
    pub plot_type: String,
    pub x_data: String,
    pub y_data: String,
    pub x_label: String,
    pub y_label: String,
    pub title: String,
    // canvas
    pub bg_color: String,
    pub show_grid: bool,
    pub opacity: u8, // overlay, percent
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub geometry: Geometry,
    /// C variable name, unique across the project.
    pub var_name: String,
    pub macro_name: Option<String>,
    pub props: WidgetProps,
    pub callback: Option<Callback>,
}

impl Widget {
    /// A widget of `kind` at `(x, y)` with the kind's default size and properties.
    pub fn new(id: WidgetId, kind: WidgetKind, x: i32, y: i32) -> Self {
        let (width, height) = kind.default_size();
        Self {
            id,
            kind,
            geometry: Geometry::new(x, y, width, height),
            var_name: String::new(),
            macro_name: None,
            props: kind.default_props(),
            callback: None,
        }
    }

    pub fn pane_count(&self) -> usize {
        if self.kind.has_panes() {
            self.props.pane_names.len()
        } else {
            0
        }
    }
}

/// Escapes text for use inside a C string literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
