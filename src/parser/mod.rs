use crate::{AnnotatedLine, RevisionId};
use std::collections::HashMap;
use tracing::warn;

/// Full object id lengths: SHA-1 and SHA-256 repositories.
const OID_LENS: [usize; 2] = [40, 64];

/// Parse `git rev-list` output into revision ids, preserving order.
///
/// Blank lines are ignored. Lines that are not hex object ids are skipped
/// with a warning.
pub fn parse_rev_list(input: &str) -> Vec<RevisionId> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            if is_hex(line) {
                Some(line.to_string())
            } else {
                warn!(line, "skipping malformed rev-list entry");
                None
            }
        })
        .collect()
}

/// Per-commit metadata that porcelain output prints only once per commit.
#[derive(Debug, Default, Clone)]
struct CommitInfo {
    author: String,
    author_time: Option<i64>,
    summary: String,
}

/// Result of parsing blame output: the lines that parsed, and how many
/// records were skipped as malformed.
#[derive(Debug, Default)]
pub struct BlameParse {
    pub lines: Vec<AnnotatedLine>,
    pub skipped: usize,
}

/// Parse `git blame --porcelain` output.
///
/// Each record is a header `<hex-oid> <orig-line> <final-line> [<count>]`,
/// optional `key value` metadata lines (only on a commit's first appearance),
/// and a tab-prefixed content line. A malformed record is skipped and
/// parsing resumes at the next header.
pub fn parse_blame(input: &str) -> BlameParse {
    let mut result = BlameParse::default();
    let mut commits: HashMap<String, CommitInfo> = HashMap::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let Some((revision, line_number)) = parse_header(line) else {
            warn!(line, "skipping malformed blame record");
            result.skipped += 1;
            // Resync: drop everything up to and including the next content line.
            for rest in lines.by_ref() {
                if rest.starts_with('\t') {
                    break;
                }
            }
            continue;
        };

        let info = commits.entry(revision.clone()).or_default();
        let mut text = None;
        for meta in lines.by_ref() {
            if let Some(content) = meta.strip_prefix('\t') {
                text = Some(content);
                break;
            }
            let (key, value) = meta.split_once(' ').unwrap_or((meta, ""));
            match key {
                "author" => info.author = value.to_string(),
                "author-time" => info.author_time = value.parse().ok(),
                "summary" => info.summary = value.to_string(),
                _ => {}
            }
        }

        let Some(text) = text else {
            warn!(revision = %revision, "blame record ended without content line");
            result.skipped += 1;
            break;
        };

        let info = info.clone();
        result.lines.push(AnnotatedLine {
            revision,
            line_number,
            author: info.author,
            author_time: info.author_time,
            summary: info.summary,
            text: text.trim_end().to_string(),
        });
    }

    result
}

/// Parse a porcelain header line into (revision, final line number).
fn parse_header(line: &str) -> Option<(String, usize)> {
    let mut fields = line.split(' ');
    let oid = fields.next()?;
    if !OID_LENS.contains(&oid.len()) || !is_hex(oid) {
        return None;
    }
    let _orig: usize = fields.next()?.parse().ok()?;
    let final_line: usize = fields.next()?.parse().ok()?;
    Some((oid.to_string(), final_line))
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}
