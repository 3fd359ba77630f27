//! Variable names and macro aliases for widgets.
//!
//! Variable names follow `<lowercase type>_<counter>` with `_2`, `_3`, ...
//! appended on collision. The counter only ever grows within a session.

use crate::widget::WidgetKind;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static MACRO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("macro pattern compiles"));

static C_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles")
});

const C_KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "char", "const", "continue", "default", "do", "double",
    "else", "enum", "extern", "false", "float", "for", "goto", "if", "inline", "int", "long",
    "init_ui", "main", "register", "restrict", "return", "short", "signed", "sizeof", "static",
    "struct", "switch", "true", "typedef", "union", "unsigned", "void", "volatile", "while",
    "win",
];

/// Macros that the generated unit's headers define or that it uses itself.
const RESERVED_MACROS: &[&str] = &[
    "BUFSIZ", "EOF", "EXIT_FAILURE", "EXIT_SUCCESS", "FILENAME_MAX", "FOPEN_MAX", "L_TMPNAM",
    "NULL", "RAND_MAX", "SEEK_CUR", "SEEK_END", "SEEK_SET", "TMP_MAX",
];

/// `_` covers the identifiers C reserves for the implementation.
const RESERVED_MACRO_PREFIXES: &[&str] = &["_", "GOOEY_", "GLPS_", "LAYOUT_"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroError {
    #[error("macro name `{0}` must match ^[A-Z_][A-Z0-9_]*$")]
    Invalid(String),
    #[error("macro name `{0}` is reserved by C or the Gooey headers")]
    Reserved(String),
    #[error("macro name `{name}` is already used by widget {owner}")]
    Duplicate { name: String, owner: String },
}

/// Allocates widget variable names for one editing session.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    counter: u64,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Returns a fresh name for `kind`. `taken` reports whether a name is
    /// already used by a live widget.
    pub fn allocate(&mut self, kind: WidgetKind, taken: impl Fn(&str) -> bool) -> String {
        self.counter += 1;
        let base = format!("{}_{}", kind.var_prefix(), self.counter);
        if !taken(&base) {
            return base;
        }
        let mut suffix = 2u64;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Moves the counter past the numeric part of an existing name so names
    /// allocated later never reuse a loaded base name.
    pub fn observe(&mut self, name: &str) {
        let number = name
            .split('_')
            .skip(1)
            .find(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|part| part.parse::<u64>().ok());
        if let Some(n) = number
            && n > self.counter
        {
            self.counter = n;
        }
    }
}

/// Trims and uppercases user input. `Ok(None)` means the macro is cleared.
pub fn normalize_macro(input: &str) -> Result<Option<String>, MacroError> {
    let name = input.trim().to_uppercase();
    if name.is_empty() {
        return Ok(None);
    }
    if !MACRO_PATTERN.is_match(&name) {
        return Err(MacroError::Invalid(name));
    }
    if is_reserved_macro(&name) {
        return Err(MacroError::Reserved(name));
    }
    Ok(Some(name))
}

/// True for names that would redefine something the generated source relies on.
pub fn is_reserved_macro(name: &str) -> bool {
    RESERVED_MACROS.contains(&name) || RESERVED_MACRO_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// True for macro aliases that can be emitted as `#define NAME var`.
pub fn is_macro_name(name: &str) -> bool {
    MACRO_PATTERN.is_match(name) && !is_reserved_macro(name)
}

/// True for names usable as C identifiers in generated code.
pub fn is_c_identifier(name: &str) -> bool {
    C_IDENTIFIER.is_match(name) && !C_KEYWORDS.contains(&name)
}
