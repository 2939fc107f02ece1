use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use tracing::{info, warn};

use crate::git::{GitError, History};
use crate::{AnnotatedLine, RevisionId, abbrev, same_revision};

/// Change notifications emitted at the end of each mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEvent {
    FileChanged,
    RevisionChanged,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved,
    Unchanged,
    /// The requested revision prefix is not in the file's history.
    NotFound,
}

/// Everything derived from one revision, fetched before any cursor field is touched.
struct RevisionView {
    index: usize,
    lines: Vec<AnnotatedLine>,
    description: String,
    first_changed_line: Option<usize>,
}

/// Navigable pointer into a file's revision history.
///
/// `current_index` is `Some` iff `revisions` is non-empty, and `lines`,
/// `description` and `first_changed_line` always belong to
/// `revisions[current_index]`.
pub struct Cursor<H> {
    history: H,
    path: Option<PathBuf>,
    revisions: Vec<RevisionId>,
    current_index: Option<usize>,
    lines: Vec<AnnotatedLine>,
    description: String,
    first_changed_line: Option<usize>,
    subscribers: Vec<Sender<CursorEvent>>,
}

impl<H: History> Cursor<H> {
    /// Create an empty cursor with no file loaded.
    pub fn new(history: H) -> Self {
        Self {
            history,
            path: None,
            revisions: Vec::new(),
            current_index: None,
            lines: Vec::new(),
            description: String::new(),
            first_changed_line: None,
            subscribers: Vec::new(),
        }
    }

    /// Register for change notifications.
    pub fn subscribe(&mut self) -> Receiver<CursorEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Load `path` and jump to its most recent revision.
    ///
    /// On failure the cursor is left empty (no revisions, no index), both
    /// notifications still fire, and the error is returned for display.
    pub fn load_file(&mut self, path: &Path) -> Result<(), GitError> {
        info!(path = %path.display(), "loading file");
        self.path = Some(path.to_path_buf());

        let loaded = self.history.revisions(path).and_then(|revisions| {
            let last = revisions.len().checked_sub(1);
            let view = match last {
                Some(index) => Some(self.fetch(path, &revisions, index)?),
                None => None,
            };
            Ok((revisions, view))
        });

        let result = match loaded {
            Ok((revisions, view)) => {
                self.revisions = revisions;
                match view {
                    Some(view) => self.commit(view),
                    None => self.clear_view(),
                }
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load file history");
                self.revisions.clear();
                self.clear_view();
                Err(e)
            }
        };

        self.notify(CursorEvent::FileChanged);
        self.notify(CursorEvent::RevisionChanged);
        result
    }

    /// Move to `revisions[index]`, reloading lines and description.
    ///
    /// Does nothing if `index` is the current one or out of range.
    pub fn go_to_index(&mut self, index: usize) -> Result<Navigation, GitError> {
        if Some(index) == self.current_index || index >= self.revisions.len() {
            return Ok(Navigation::Unchanged);
        }
        let Some(path) = self.path.clone() else {
            return Ok(Navigation::Unchanged);
        };

        let view = self.fetch(&path, &self.revisions, index)?;
        self.commit(view);
        info!(
            index,
            revision = abbrev(&self.revisions[index]),
            "moved to revision"
        );
        self.notify(CursorEvent::RevisionChanged);
        Ok(Navigation::Moved)
    }

    /// Move to the first revision (oldest first) whose id starts with `prefix`.
    pub fn go_to_revision_prefix(&mut self, prefix: &str) -> Result<Navigation, GitError> {
        let found = if prefix.is_empty() {
            None
        } else {
            self.revisions.iter().position(|rev| rev.starts_with(prefix))
        };

        match found {
            Some(index) => self.go_to_index(index),
            None => {
                warn!(prefix, "revision not found in file history");
                Ok(Navigation::NotFound)
            }
        }
    }

    /// Drill down from the line at `line_index`.
    ///
    /// A line introduced by the current revision shows the revision before it;
    /// any other line shows the revision that introduced it.
    pub fn invoke_line_action(&mut self, line_index: usize) -> Result<Navigation, GitError> {
        let Some(line) = self.lines.get(line_index) else {
            return Ok(Navigation::Unchanged);
        };

        if self.is_current_revision(line) {
            match self.current_index {
                Some(index) if index > 0 => self.go_to_index(index - 1),
                _ => Ok(Navigation::Unchanged),
            }
        } else {
            let prefix = line.revision.clone();
            self.go_to_revision_prefix(&prefix)
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn revisions(&self) -> &[RevisionId] {
        &self.revisions
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_revision(&self) -> Option<&str> {
        self.current_index
            .and_then(|index| self.revisions.get(index))
            .map(String::as_str)
    }

    pub fn lines(&self) -> &[AnnotatedLine] {
        &self.lines
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn first_changed_line(&self) -> Option<usize> {
        self.first_changed_line
    }

    /// Whether `line` was introduced by the revision currently shown.
    pub fn is_current_revision(&self, line: &AnnotatedLine) -> bool {
        self.current_revision()
            .is_some_and(|current| same_revision(&line.revision, current))
    }

    fn fetch(
        &self,
        path: &Path,
        revisions: &[RevisionId],
        index: usize,
    ) -> Result<RevisionView, GitError> {
        let revision = &revisions[index];
        let lines = self.history.blame(path, revision)?;
        let description = self.history.describe(path, revision)?;
        let first_changed_line = first_changed_line(&lines, revision);
        Ok(RevisionView {
            index,
            lines,
            description,
            first_changed_line,
        })
    }

    fn commit(&mut self, view: RevisionView) {
        self.current_index = Some(view.index);
        self.lines = view.lines;
        self.description = view.description;
        self.first_changed_line = view.first_changed_line;
    }

    fn clear_view(&mut self) {
        self.current_index = None;
        self.lines.clear();
        self.description.clear();
        self.first_changed_line = None;
    }

    fn notify(&mut self, event: CursorEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

/// Position of the first line introduced by `revision`, scanning from the top.
pub fn first_changed_line(lines: &[AnnotatedLine], revision: &str) -> Option<usize> {
    lines
        .iter()
        .position(|line| same_revision(&line.revision, revision))
}
