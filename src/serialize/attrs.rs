//! Type-specific widget attributes as they appear in project files.
//!
//! One table drives both directions: `encode` produces the attribute list
//! written for a widget, `apply` parses attributes back into `WidgetProps`.

use crate::widget::{ListItem, WidgetKind, WidgetProps};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value `{value}` for attribute `{key}`: {reason}")]
pub struct AttributeError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl AttributeError {
    fn new(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result of applying a batch of attributes.
#[derive(Debug, Default)]
pub struct Applied {
    /// Values that could not be parsed; the property keeps its previous value.
    pub errors: Vec<AttributeError>,
    /// Keys that do not belong to the widget kind.
    pub unknown: Vec<String>,
    /// Pane names were padded or truncated to match the declared count.
    pub resized_panes: bool,
}

/// Attributes written for a widget of `kind`, in file order.
pub fn encode(
    kind: WidgetKind,
    p: &WidgetProps,
) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
    use WidgetKind::*;

    let attrs = match kind {
        Button | Label | Input | Radio => vec![("text", p.text.clone())],
        Checkbox => vec![("text", p.text.clone()), ("checked", p.checked.to_string())],
        RadioButtonGroup => vec![("radioOptions", serde_json::to_string(&p.options)?)],
        Slider => vec![
            ("minValue", p.min.to_string()),
            ("maxValue", p.max.to_string()),
            ("showHints", p.show_hints.to_string()),
            ("value", p.value.to_string()),
        ],
        Image => vec![("relativePath", p.path.clone())],
        DropSurface => vec![("dropsurfaceMessage", p.message.clone())],
        Dropdown => vec![
            ("dropdownOptions", p.options.join(",")),
            ("selectedIndex", p.selected.to_string()),
        ],
        List => vec![("listOptions", serde_json::to_string(&p.list_items)?)],
        Progressbar => vec![("value", p.value.to_string())],
        Meter => vec![("value", p.value.to_string()), ("label", p.label.clone())],
        GSwitch => vec![
            ("showHints", p.show_hints.to_string()),
            ("state", p.checked.to_string()),
        ],
        Tabs => vec![
            ("isSidebar", p.sidebar.to_string()),
            ("tabCount", p.pane_names.len().to_string()),
            ("activeTab", p.active_pane.to_string()),
            ("tabNames", serde_json::to_string(&p.pane_names)?),
        ],
        Container => vec![
            ("borderWidth", p.border_width.to_string()),
            ("borderRadius", p.border_radius.to_string()),
            ("containerCount", p.pane_names.len().to_string()),
            ("activeContainer", p.active_pane.to_string()),
            ("containerNames", serde_json::to_string(&p.pane_names)?),
        ],
        Plot => vec![
            ("plotType", p.plot_type.clone()),
            ("xAxisDataList", p.x_data.clone()),
            ("yAxisDataList", p.y_data.clone()),
            ("xAxisLabel", p.x_label.clone()),
            ("yAxisLabel", p.y_label.clone()),
            ("plotTitle", p.title.clone()),
        ],
        Canvas => vec![
            ("bgColor", p.bg_color.clone()),
            ("showGrid", p.show_grid.to_string()),
        ],
        Overlay => vec![("opacity", p.opacity.to_string())],
        Menu | VerticalLayout | HorizontalLayout => Vec::new(),
    };
    Ok(attrs)
}

/// Parses `attrs` into `props`. Bad values are collected rather than
/// aborting, so a loader can keep going; callers wanting all-or-nothing
/// semantics apply to a copy and check `errors`.
pub fn apply<'a>(
    kind: WidgetKind,
    props: &mut WidgetProps,
    attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Applied {
    let mut applied = Applied::default();
    let mut pane_count = None;

    for (key, value) in attrs {
        match apply_one(kind, props, key, value, &mut pane_count) {
            Ok(true) => {}
            Ok(false) => applied.unknown.push(key.to_string()),
            Err(e) => applied.errors.push(e),
        }
    }

    if kind.has_panes() {
        if let Some(count) = pane_count
            && count != props.pane_names.len()
        {
            let names = &mut props.pane_names;
            names.truncate(count);
            while names.len() < count {
                names.push(kind.default_pane_name(names.len()));
            }
            applied.resized_panes = true;
        }
        if props.pane_names.is_empty() {
            applied.errors.push(AttributeError::new(
                pane_names_key(kind),
                "[]",
                "at least one pane is required",
            ));
            props.pane_names = kind.default_props().pane_names;
        }
        if props.active_pane >= props.pane_names.len() {
            props.active_pane = props.pane_names.len() - 1;
        }
    }

    applied
}

fn apply_one(
    kind: WidgetKind,
    p: &mut WidgetProps,
    key: &str,
    value: &str,
    pane_count: &mut Option<usize>,
) -> Result<bool, AttributeError> {
    use WidgetKind::*;

    match (kind, key) {
        (Button | Label | Input | Checkbox | Radio, "text") => p.text = value.to_string(),
        (Checkbox, "checked") | (GSwitch, "state") => p.checked = parse_bool(key, value)?,
        (Slider | GSwitch, "showHints") => p.show_hints = parse_bool(key, value)?,
        (Slider, "minValue") => p.min = parse_number(key, value)?,
        (Slider, "maxValue") => p.max = parse_number(key, value)?,
        (Slider | Progressbar | Meter, "value") => p.value = parse_number(key, value)?,
        (Image, "relativePath") => p.path = value.to_string(),
        (DropSurface, "dropsurfaceMessage") => p.message = value.to_string(),
        (Dropdown, "dropdownOptions") => p.options = split_options(value),
        (Dropdown, "selectedIndex") => p.selected = parse_number(key, value)?,
        (List, "listOptions") => p.list_items = parse_list_items(key, value)?,
        (RadioButtonGroup, "radioOptions") => p.options = parse_json(key, value)?,
        (Meter, "label") => p.label = value.to_string(),
        (Tabs, "isSidebar") => p.sidebar = parse_bool(key, value)?,
        (Tabs, "tabCount") | (Container, "containerCount") => {
            *pane_count = Some(parse_number(key, value)?)
        }
        (Tabs, "activeTab") | (Container, "activeContainer") => {
            p.active_pane = parse_number(key, value)?
        }
        (Tabs, "tabNames") | (Container, "containerNames") => {
            p.pane_names = parse_json(key, value)?
        }
        (Container, "borderWidth") => p.border_width = parse_number(key, value)?,
        (Container, "borderRadius") => p.border_radius = parse_number(key, value)?,
        (Plot, "plotType") => p.plot_type = value.to_string(),
        (Plot, "xAxisDataList") => p.x_data = value.to_string(),
        (Plot, "yAxisDataList") => p.y_data = value.to_string(),
        (Plot, "xAxisLabel") => p.x_label = value.to_string(),
        (Plot, "yAxisLabel") => p.y_label = value.to_string(),
        (Plot, "plotTitle") => p.title = value.to_string(),
        (Canvas, "bgColor") => p.bg_color = value.to_string(),
        (Canvas, "showGrid") => p.show_grid = parse_bool(key, value)?,
        (Overlay, "opacity") => {
            let opacity: u8 = parse_number(key, value)?;
            if opacity > 100 {
                return Err(AttributeError::new(key, value, "opacity is a percentage"));
            }
            p.opacity = opacity;
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn pane_names_key(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Tabs => "tabNames",
        _ => "containerNames",
    }
}

/// Parses a pixel value. Older files carry a `px` suffix and fractional
/// values from drag positions; both are accepted.
pub fn parse_px(key: &str, value: &str) -> Result<i32, AttributeError> {
    let trimmed = value.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    if let Ok(n) = number.parse::<i32>() {
        return Ok(n);
    }
    match number.parse::<f64>() {
        Ok(n) if n.is_finite() && n.abs() < i32::MAX as f64 => Ok(n.round() as i32),
        _ => Err(AttributeError::new(key, value, "expected a pixel value")),
    }
}

pub fn parse_bool(key: &str, value: &str) -> Result<bool, AttributeError> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(AttributeError::new(key, value, "expected true or false")),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AttributeError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| AttributeError::new(key, value, e.to_string()))
}

fn parse_json<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T, AttributeError> {
    serde_json::from_str(value).map_err(|e| AttributeError::new(key, value, e.to_string()))
}

/// List entries are `{name, description}` objects; plain strings are
/// accepted as names without a description.
fn parse_list_items(key: &str, value: &str) -> Result<Vec<ListItem>, AttributeError> {
    if let Ok(items) = serde_json::from_str::<Vec<ListItem>>(value) {
        return Ok(items);
    }
    let names: Vec<String> = parse_json(key, value)?;
    Ok(names
        .into_iter()
        .map(|name| ListItem {
            name,
            description: String::new(),
        })
        .collect())
}

/// Splits comma-joined dropdown options, dropping blank entries.
pub fn split_options(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(kind: WidgetKind, attrs: &[(&str, &str)]) -> (WidgetProps, Applied) {
        let mut props = kind.default_props();
        let applied = apply(kind, &mut props, attrs.iter().copied());
        (props, applied)
    }

    #[test]
    fn test_encode_slider() {
        let props = WidgetKind::Slider.default_props();
        let attrs = encode(WidgetKind::Slider, &props).unwrap();
        assert_eq!(
            attrs,
            vec![
                ("minValue", "0".to_string()),
                ("maxValue", "100".to_string()),
                ("showHints", "false".to_string()),
                ("value", "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_encoded_attributes_apply_back_for_every_kind() {
        for kind in WidgetKind::ALL {
            let mut props = kind.default_props();
            props.text = "Hello, \"world\"".into();
            props.list_items = vec![ListItem {
                name: "a".into(),
                description: "first".into(),
            }];
            props.options = vec!["x".into(), "y".into()];
            let encoded = encode(kind, &props).unwrap();

            let mut restored = kind.default_props();
            let applied = apply(
                kind,
                &mut restored,
                encoded.iter().map(|(k, v)| (*k, v.as_str())),
            );
            assert!(applied.errors.is_empty(), "{kind}: {:?}", applied.errors);
            assert!(applied.unknown.is_empty(), "{kind}: {:?}", applied.unknown);
            assert_eq!(encode(kind, &restored).unwrap(), encoded, "{kind}");
        }
    }

    #[test]
    fn test_dropdown_options_drop_blanks() {
        let (props, _) = decode(
            WidgetKind::Dropdown,
            &[("dropdownOptions", "Red, ,Green,,Blue ")],
        );
        assert_eq!(props.options, vec!["Red", "Green", "Blue"]);
    }

    #[test]
    fn test_list_items_accept_plain_strings() {
        let (props, applied) = decode(WidgetKind::List, &[("listOptions", r#"["one","two"]"#)]);
        assert!(applied.errors.is_empty());
        assert_eq!(props.list_items.len(), 2);
        assert_eq!(props.list_items[1].name, "two");
        assert_eq!(props.list_items[1].description, "");
    }

    #[test]
    fn test_pane_count_pads_and_truncates_names() {
        let (props, applied) = decode(
            WidgetKind::Tabs,
            &[("tabCount", "3"), ("tabNames", r#"["Main"]"#)],
        );
        assert!(applied.resized_panes);
        assert_eq!(props.pane_names, vec!["Main", "Tab 2", "Tab 3"]);

        let (props, _) = decode(
            WidgetKind::Container,
            &[
                ("containerNames", r#"["A","B","C"]"#),
                ("containerCount", "2"),
                ("activeContainer", "2"),
            ],
        );
        assert_eq!(props.pane_names, vec!["A", "B"]);
        assert_eq!(props.active_pane, 1);
    }

    #[test]
    fn test_zero_panes_is_an_error() {
        let (props, applied) = decode(WidgetKind::Container, &[("containerCount", "0")]);
        assert_eq!(applied.errors.len(), 1);
        assert_eq!(props.pane_names, vec!["Container 0"]);
    }

    #[test]
    fn test_bad_values_are_collected() {
        let (props, applied) = decode(
            WidgetKind::Slider,
            &[("minValue", "low"), ("maxValue", "10"), ("showHints", "yes")],
        );
        assert_eq!(applied.errors.len(), 2);
        assert_eq!(applied.errors[0].key, "minValue");
        assert_eq!(props.min, 0);
        assert_eq!(props.max, 10);
    }

    #[test]
    fn test_unknown_keys_are_reported() {
        let (_, applied) = decode(WidgetKind::Menu, &[("text", "File")]);
        assert_eq!(applied.unknown, vec!["text"]);
    }

    #[test]
    fn test_overlay_opacity_range() {
        let (_, applied) = decode(WidgetKind::Overlay, &[("opacity", "150")]);
        assert_eq!(applied.errors.len(), 1);
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("x", "100px"), Ok(100));
        assert_eq!(parse_px("x", " 42 "), Ok(42));
        assert_eq!(parse_px("x", "12.6px"), Ok(13));
        assert_eq!(parse_px("x", "-5"), Ok(-5));
        assert!(parse_px("x", "wide").is_err());
    }
}
