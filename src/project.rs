use serde::{Deserialize, Serialize};

/// Current project file schema version.
pub const SCHEMA_VERSION: &str = "1.0";

/// Settings of the generated application window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub debug_overlay: bool,
    pub continuous_redraw: bool,
    pub visible: bool,
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "My Window".into(),
            x: 0,
            y: 0,
            width: 800,
            height: 600,
            debug_overlay: false,
            continuous_redraw: false,
            visible: true,
            resizable: true,
        }
    }
}

/// Project metadata stored on the root element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    pub platform: String,
    pub language: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            name: "Untitled".into(),
            platform: "desktop".into(),
            language: "c".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_is_visible_and_resizable() {
        let w = WindowSettings::default();
        assert!(w.visible);
        assert!(w.resizable);
        assert!(!w.debug_overlay);
        assert_eq!((w.width, w.height), (800, 600));
    }

    #[test]
    fn test_default_project_targets_c() {
        let p = ProjectSettings::default();
        assert_eq!(p.language, "c");
        assert_eq!(p.platform, "desktop");
    }
}
