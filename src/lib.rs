pub mod bindings;
pub mod cli;
pub mod cursor;
pub mod git;
pub mod highlight;
pub mod logging;
pub mod parser;
pub mod tui;

/// Number of leading characters of a revision id used for display and matching.
pub const ABBREV_LEN: usize = 8;

/// Opaque revision identifier as reported by git (a full hex object id).
pub type RevisionId = String;

/// Shorten a revision id to its display/matching prefix.
pub fn abbrev(revision: &str) -> &str {
    revision.get(..ABBREV_LEN).unwrap_or(revision)
}

/// Whether two revision ids name the same commit, compared by abbreviated prefix.
pub fn same_revision(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && abbrev(a) == abbrev(b)
}

/// A single line of a file as of some revision, with the revision that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    pub revision: RevisionId,
    /// 1-based line number in the blamed revision.
    pub line_number: usize,
    pub author: String,
    /// Author time in unix seconds.
    pub author_time: Option<i64>,
    pub summary: String,
    pub text: String,
}

impl AnnotatedLine {
    /// Abbreviated introducing revision.
    pub fn short_revision(&self) -> &str {
        abbrev(&self.revision)
    }

    /// Author date as `YYYY-MM-DD`, or blanks when git reported no time.
    pub fn date(&self) -> String {
        self.author_time
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| " ".repeat(10))
    }

    /// Fixed-width annotation shown before the line text.
    pub fn gutter(&self) -> String {
        let author: String = self.author.chars().take(12).collect();
        format!(
            "{} {:<12} {} {:>5} │ ",
            self.short_revision(),
            author,
            self.date(),
            self.line_number
        )
    }
}
