//! The Gooey C widget API the generator emits calls against.
//!
//! Each entry fixes a function's name and parameter order. Calls are only
//! built through [`ApiFunction::call`], which refuses arity mismatches, so a
//! change to this table is the only way the emitted call shapes change.

use crate::widget::WidgetKind;
use thiserror::Error;

/// Revision of the widget API this table describes.
pub const API_REVISION: &str = "gooey-1.0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{function} takes {expected} arguments, {found} given")]
pub struct ArityError {
    pub function: &'static str,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiFunction {
    pub name: &'static str,
    pub params: &'static [&'static str],
}

impl ApiFunction {
    const fn new(name: &'static str, params: &'static [&'static str]) -> Self {
        Self { name, params }
    }

    /// Formats a call expression (without trailing `;`).
    pub fn call<S: AsRef<str>>(&self, args: &[S]) -> Result<String, ArityError> {
        if args.len() != self.params.len() {
            return Err(ArityError {
                function: self.name,
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        Ok(format!("{}({})", self.name, args.join(", ")))
    }
}

pub const GOOEY_INIT: ApiFunction = ApiFunction::new("Gooey_Init", &[]);

pub const WINDOW_CREATE: ApiFunction =
    ApiFunction::new("GooeyWindow_Create", &["title", "x", "y", "width", "height"]);
pub const WINDOW_MAKE_VISIBLE: ApiFunction =
    ApiFunction::new("GooeyWindow_MakeVisible", &["win", "visible"]);
pub const WINDOW_MAKE_RESIZABLE: ApiFunction =
    ApiFunction::new("GooeyWindow_MakeResizable", &["win", "resizable"]);
pub const WINDOW_ENABLE_DEBUG_OVERLAY: ApiFunction =
    ApiFunction::new("GooeyWindow_EnableDebugOverlay", &["win", "enable"]);
pub const WINDOW_SET_CONTINUOUS_REDRAW: ApiFunction =
    ApiFunction::new("GooeyWindow_SetContinuousRedraw", &["win"]);
pub const WINDOW_REGISTER_WIDGET: ApiFunction =
    ApiFunction::new("GooeyWindow_RegisterWidget", &["win", "widget"]);
pub const WINDOW_RUN: ApiFunction = ApiFunction::new("GooeyWindow_Run", &["count", "win"]);
pub const WINDOW_CLEANUP: ApiFunction = ApiFunction::new("GooeyWindow_Cleanup", &["count", "win"]);

pub const BUTTON_CREATE: ApiFunction = ApiFunction::new(
    "GooeyButton_Create",
    &["label", "x", "y", "width", "height", "callback", "user_data"],
);
pub const LABEL_CREATE: ApiFunction =
    ApiFunction::new("GooeyLabel_Create", &["text", "font_size", "x", "y"]);
pub const TEXTBOX_CREATE: ApiFunction = ApiFunction::new(
    "GooeyTextBox_Create",
    &[
        "x",
        "y",
        "width",
        "height",
        "placeholder",
        "is_password",
        "callback",
        "user_data",
    ],
);
pub const CHECKBOX_CREATE: ApiFunction = ApiFunction::new(
    "GooeyCheckbox_Create",
    &["x", "y", "label", "callback", "user_data"],
);
pub const CHECKBOX_SET_CHECKED: ApiFunction =
    ApiFunction::new("GooeyCheckbox_SetChecked", &["checkbox", "checked"]);
pub const RADIOBUTTON_CREATE: ApiFunction = ApiFunction::new(
    "GooeyRadioButton_Create",
    &["x", "y", "label", "callback", "user_data"],
);
pub const RADIOGROUP_CREATE: ApiFunction = ApiFunction::new("GooeyRadioButtonGroup_Create", &[]);
pub const RADIOGROUP_ADD_CHILD: ApiFunction = ApiFunction::new(
    "GooeyRadioButtonGroup_AddChild",
    &["win", "group", "x", "y", "label", "callback", "user_data"],
);
pub const SLIDER_CREATE: ApiFunction = ApiFunction::new(
    "GooeySlider_Create",
    &[
        "x",
        "y",
        "width",
        "min_value",
        "max_value",
        "show_hints",
        "callback",
        "user_data",
    ],
);
pub const SLIDER_SET_VALUE: ApiFunction =
    ApiFunction::new("GooeySlider_SetValue", &["slider", "value"]);
pub const IMAGE_CREATE: ApiFunction = ApiFunction::new(
    "GooeyImage_Create",
    &["path", "x", "y", "width", "height", "callback", "user_data"],
);
pub const DROPSURFACE_CREATE: ApiFunction = ApiFunction::new(
    "GooeyDropSurface_Create",
    &["x", "y", "width", "height", "message", "callback", "user_data"],
);
pub const DROPDOWN_CREATE: ApiFunction = ApiFunction::new(
    "GooeyDropdown_Create",
    &[
        "x",
        "y",
        "width",
        "height",
        "options",
        "num_options",
        "callback",
        "user_data",
    ],
);
pub const LIST_CREATE: ApiFunction = ApiFunction::new(
    "GooeyList_Create",
    &["x", "y", "width", "height", "callback", "user_data"],
);
pub const LIST_ADD_ITEM: ApiFunction =
    ApiFunction::new("GooeyList_AddItem", &["list", "title", "description"]);
pub const PROGRESSBAR_CREATE: ApiFunction = ApiFunction::new(
    "GooeyProgressBar_Create",
    &["x", "y", "width", "height", "initial_value"],
);
pub const METER_CREATE: ApiFunction = ApiFunction::new(
    "GooeyMeter_Create",
    &["x", "y", "width", "height", "initial_value", "label"],
);
pub const SWITCH_CREATE: ApiFunction = ApiFunction::new(
    "GooeySwitch_Create",
    &["x", "y", "is_toggled", "show_hints", "callback", "user_data"],
);
pub const TABS_CREATE: ApiFunction = ApiFunction::new(
    "GooeyTabs_Create",
    &["x", "y", "width", "height", "is_sidebar"],
);
pub const TABS_INSERT_TAB: ApiFunction = ApiFunction::new("GooeyTabs_InsertTab", &["tabs", "name"]);
pub const TABS_SET_ACTIVE_TAB: ApiFunction =
    ApiFunction::new("GooeyTabs_SetActiveTab", &["tabs", "tab_id"]);
pub const TABS_ADD_WIDGET: ApiFunction = ApiFunction::new(
    "GooeyTabs_AddWidget",
    &["win", "tabs", "tab_id", "widget"],
);
pub const CONTAINER_CREATE: ApiFunction = ApiFunction::new(
    "GooeyContainer_Create",
    &["x", "y", "width", "height"],
);
pub const CONTAINER_INSERT_CONTAINER: ApiFunction =
    ApiFunction::new("GooeyContainer_InsertContainer", &["container"]);
pub const CONTAINER_SET_ACTIVE_CONTAINER: ApiFunction = ApiFunction::new(
    "GooeyContainer_SetActiveContainer",
    &["container", "container_id"],
);
pub const CONTAINER_ADD_WIDGET: ApiFunction = ApiFunction::new(
    "GooeyContainer_AddWidget",
    &["win", "container", "container_id", "widget"],
);
pub const LAYOUT_CREATE: ApiFunction = ApiFunction::new(
    "GooeyLayout_Create",
    &["layout_type", "x", "y", "width", "height"],
);
pub const LAYOUT_ADD_CHILD: ApiFunction =
    ApiFunction::new("GooeyLayout_AddChild", &["win", "layout", "widget"]);
pub const LAYOUT_BUILD: ApiFunction = ApiFunction::new("GooeyLayout_Build", &["layout"]);
pub const PLOT_CREATE: ApiFunction = ApiFunction::new(
    "GooeyPlot_Create",
    &["plot_type", "data", "x", "y", "width", "height"],
);
pub const CANVAS_CREATE: ApiFunction = ApiFunction::new(
    "GooeyCanvas_Create",
    &["x", "y", "width", "height", "callback", "user_data"],
);
pub const CANVAS_DRAW_RECTANGLE: ApiFunction = ApiFunction::new(
    "GooeyCanvas_DrawRectangle",
    &[
        "canvas",
        "x",
        "y",
        "width",
        "height",
        "color",
        "is_filled",
        "thickness",
        "is_rounded",
        "corner_radius",
    ],
);
pub const OVERLAY_CREATE: ApiFunction = ApiFunction::new(
    "GooeyOverlay_Create",
    &["x", "y", "width", "height", "opacity"],
);
pub const MENU_SET: ApiFunction = ApiFunction::new("GooeyMenu_Set", &["win"]);

/// C pointer type for a widget kind.
pub const fn c_type(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Button => "GooeyButton",
        WidgetKind::Label => "GooeyLabel",
        WidgetKind::Input => "GooeyTextbox",
        WidgetKind::Checkbox => "GooeyCheckbox",
        WidgetKind::Radio => "GooeyRadioButton",
        WidgetKind::RadioButtonGroup => "GooeyRadioButtonGroup",
        WidgetKind::Slider => "GooeySlider",
        WidgetKind::Image => "GooeyImage",
        WidgetKind::DropSurface => "GooeyDropSurface",
        WidgetKind::Dropdown => "GooeyDropdown",
        WidgetKind::List => "GooeyList",
        WidgetKind::Progressbar => "GooeyProgressBar",
        WidgetKind::Meter => "GooeyMeter",
        WidgetKind::GSwitch => "GooeySwitch",
        WidgetKind::Tabs => "GooeyTabs",
        WidgetKind::Container => "GooeyContainers",
        WidgetKind::Plot => "GooeyPlot",
        WidgetKind::Canvas => "GooeyCanvas",
        WidgetKind::Overlay => "GooeyOverlay",
        WidgetKind::Menu => "GooeyMenu",
        WidgetKind::VerticalLayout | WidgetKind::HorizontalLayout => "GooeyLayout",
    }
}

/// Plot type constant for a stored `plotType` value.
pub fn plot_type_constant(plot_type: &str) -> Option<&'static str> {
    match plot_type {
        "line" => Some("GOOEY_PLOT_LINE"),
        "bar" => Some("GOOEY_PLOT_BAR"),
        "scatter" => Some("GOOEY_PLOT_SCATTER"),
        _ => None,
    }
}

pub const fn layout_type_constant(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::HorizontalLayout => "LAYOUT_HORIZONTAL",
        _ => "LAYOUT_VERTICAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_formats_arguments_in_order() {
        let call = BUTTON_CREATE
            .call(&["\"OK\"", "10", "20", "100", "30", "on_ok", "NULL"])
            .unwrap();
        assert_eq!(call, "GooeyButton_Create(\"OK\", 10, 20, 100, 30, on_ok, NULL)");
        assert_eq!(GOOEY_INIT.call::<&str>(&[]).unwrap(), "Gooey_Init()");
    }

    #[test]
    fn test_call_rejects_wrong_arity() {
        let err = LABEL_CREATE.call(&["\"x\"", "1", "2"]).unwrap_err();
        assert_eq!(err.function, "GooeyLabel_Create");
        assert_eq!(err.expected, 4);
        assert_eq!(err.found, 3);
    }

    #[test]
    fn test_canvas_rectangle_takes_ten_parameters() {
        assert_eq!(CANVAS_DRAW_RECTANGLE.params.len(), 10);
    }

    #[test]
    fn test_every_kind_has_a_c_type() {
        for kind in WidgetKind::ALL {
            assert!(c_type(kind).starts_with("Gooey"), "{kind}");
        }
    }

    #[test]
    fn test_plot_types() {
        assert_eq!(plot_type_constant("bar"), Some("GOOEY_PLOT_BAR"));
        assert_eq!(plot_type_constant("pie"), None);
    }
}
