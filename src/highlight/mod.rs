use ratatui::{
    style::{Color, Style},
    text::Span,
};
use std::path::Path;
use syntect::{
    easy::HighlightLines,
    highlighting::{Color as SyntectColor, Theme, ThemeSet},
    parsing::SyntaxSet,
};

/// Maximum line length for syntax highlighting (skip longer lines for performance).
const MAX_LINE_LENGTH: usize = 10_000;

/// Syntax highlighter for blamed file content.
///
/// This struct is immutable and can be shared. Use `for_path()` to create
/// a stateful highlighter session for one file revision.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    /// Create a new Highlighter with default syntax and theme sets.
    ///
    /// This loads all bundled syntaxes and themes, which takes ~250ms.
    /// The cost is paid once at startup.
    pub fn new() -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get("base16-ocean.dark")
            .or_else(|| theme_set.themes.values().next())
            .cloned()
            .unwrap_or_default();

        Self { syntax_set, theme }
    }

    /// Create a file-scoped session keyed on the extension of `path`.
    ///
    /// Lines must be fed in order so multi-line constructs (block comments,
    /// raw strings) carry their parse state.
    pub fn for_path(&self, path: &Path) -> FileHighlighter<'_> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.for_file(ext)
    }

    /// Create a file-scoped session for an extension or syntax name.
    pub fn for_file(&self, file_ext: &str) -> FileHighlighter<'_> {
        FileHighlighter::new(&self.syntax_set, &self.theme, file_ext)
    }

    /// Convert syntect Color to ratatui Color.
    fn syntect_to_ratatui(color: SyntectColor) -> Color {
        Color::Rgb(color.r, color.g, color.b)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Maintains HighlightLines state across the lines of a single file.
pub struct FileHighlighter<'a> {
    highlighter: Option<HighlightLines<'a>>,
    syntax_set: &'a SyntaxSet,
}

impl<'a> FileHighlighter<'a> {
    fn new(syntax_set: &'a SyntaxSet, theme: &'a Theme, file_ext: &str) -> Self {
        let syntax = syntax_set
            .find_syntax_by_extension(file_ext)
            .or_else(|| syntax_set.find_syntax_by_name(file_ext));

        let highlighter = syntax.map(|s| HighlightLines::new(s, theme));

        Self {
            highlighter,
            syntax_set,
        }
    }

    /// Highlight one source line (without its trailing newline).
    ///
    /// Unknown file types, very long lines and highlighting errors fall
    /// back to a single unstyled span.
    pub fn highlight_line(&mut self, line: &str) -> Vec<Span<'static>> {
        if line.len() > MAX_LINE_LENGTH {
            return vec![Span::raw(line.to_string())];
        }

        let Some(ref mut highlighter) = self.highlighter else {
            return vec![Span::raw(line.to_string())];
        };

        // The syntax set is loaded in newline mode; blank lines are still fed
        // through so parse state stays in step with the file.
        let with_newline = format!("{line}\n");
        let spans: Vec<Span<'static>> =
            match highlighter.highlight_line(&with_newline, self.syntax_set) {
                Ok(regions) => regions
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches('\n');
                        (!text.is_empty()).then(|| {
                            Span::styled(
                                text.to_string(),
                                Style::default()
                                    .fg(Highlighter::syntect_to_ratatui(style.foreground)),
                            )
                        })
                    })
                    .collect(),
                Err(_) => return vec![Span::raw(line.to_string())],
            };

        if spans.is_empty() {
            vec![Span::raw(String::new())]
        } else {
            spans
        }
    }
}
