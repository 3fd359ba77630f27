//! Syntax highlighting for generated C code using syntect.

use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};
use tracing::warn;

/// Foreground used for spans that could not be highlighted.
pub const PLAIN: Rgb = Rgb(0xc0, 0xc5, 0xce);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Cached syntax highlighting resources.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: "base16-ocean.dark".to_string(),
        }
    }

    fn theme(&self) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
    }

    fn styled_lines<'a>(&self, code: &'a str) -> Option<Vec<Vec<(Style, &'a str)>>> {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension("c")
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let theme = self.theme()?;
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => lines.push(ranges),
                Err(err) => {
                    warn!(%err, "highlighting failed, falling back to plain text");
                    return None;
                }
            }
        }
        Some(lines)
    }

    /// Highlight C code and return a list of (text, color) spans.
    pub fn highlight_c(&self, code: &str) -> Vec<(String, Rgb)> {
        match self.styled_lines(code) {
            Some(lines) => lines
                .into_iter()
                .flatten()
                .map(|(style, text)| (text.to_string(), style_to_rgb(style)))
                .collect(),
            None => vec![(code.to_string(), PLAIN)],
        }
    }

    /// Render C code with 24-bit terminal color escapes.
    pub fn to_ansi(&self, code: &str) -> String {
        let Some(lines) = self.styled_lines(code) else {
            return code.to_string();
        };
        let mut out = String::with_capacity(code.len() * 2);
        for ranges in &lines {
            out.push_str(&as_24_bit_terminal_escaped(ranges, false));
        }
        // Reset so the shell prompt keeps its colors.
        out.push_str("\x1b[0m");
        out
    }
}

fn style_to_rgb(style: Style) -> Rgb {
    Rgb(style.foreground.r, style.foreground.g, style.foreground.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "#include <stdio.h>\n\nint main(void)\n{\n    return 0;\n}\n";

    #[test]
    fn test_highlight_c_covers_input() {
        let highlighter = Highlighter::new();
        let spans = highlighter.highlight_c(SAMPLE);
        assert!(spans.len() > 1);
        let text: String = spans.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(text, SAMPLE);
    }

    #[test]
    fn test_keywords_are_colored() {
        let highlighter = Highlighter::new();
        let spans = highlighter.highlight_c("int main(void) { return 0; }\n");
        let colors: std::collections::HashSet<Rgb> = spans.iter().map(|(_, c)| *c).collect();
        assert!(colors.len() > 1);
    }

    #[test]
    fn test_to_ansi() {
        let highlighter = Highlighter::new();
        let colored = highlighter.to_ansi(SAMPLE);
        assert!(colored.contains("\x1b[38;2;"));
        assert!(colored.ends_with("\x1b[0m"));
        assert!(colored.contains("main"));
    }

    #[test]
    fn test_empty_input() {
        let highlighter = Highlighter::new();
        assert!(highlighter.highlight_c("").is_empty());
        assert_eq!(highlighter.to_ansi(""), "\x1b[0m");
    }
}
