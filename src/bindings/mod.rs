//! Toolkit-independent view state mirroring a [`Cursor`].
//!
//! Each binding owns a cursor subscription and only changes in response to
//! cursor notifications (plus local scrolling/selection). Rendering lives in
//! the `tui` module.

use std::sync::mpsc::Receiver;

use crate::cursor::{Cursor, CursorEvent};
use crate::git::History;

/// Revision slider over `[0, len - 1]`.
pub struct RevisionSlider {
    events: Receiver<CursorEvent>,
    len: usize,
    value: Option<usize>,
}

impl RevisionSlider {
    pub fn new<H: History>(cursor: &mut Cursor<H>) -> Self {
        Self {
            events: cursor.subscribe(),
            len: cursor.revisions().len(),
            value: cursor.current_index(),
        }
    }

    /// Apply pending cursor notifications.
    pub fn sync<H: History>(&mut self, cursor: &Cursor<H>) -> bool {
        let changed = self.events.try_iter().count() > 0;
        if changed {
            self.len = cursor.revisions().len();
            self.value = cursor.current_index();
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn value(&self) -> Option<usize> {
        self.value
    }

    /// Column of `index` on a track `width` cells wide.
    pub fn column_of(&self, index: usize, width: u16) -> u16 {
        if self.len <= 1 || width <= 1 {
            return 0;
        }
        let span = (width - 1) as usize;
        ((index.min(self.len - 1) * span + (self.len - 1) / 2) / (self.len - 1)) as u16
    }

    /// Revision index nearest to `column` on a track `width` cells wide.
    pub fn index_at(&self, column: u16, width: u16) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        if self.len == 1 || width <= 1 {
            return Some(0);
        }
        let span = (width - 1) as usize;
        let column = (column as usize).min(span);
        Some((column * (self.len - 1) + span / 2) / span)
    }
}

/// Selection and scroll state over the cursor's annotated lines.
pub struct BlameList {
    events: Receiver<CursorEvent>,
    len: usize,
    selected: usize,
    offset: usize,
    scroll_target: Option<usize>,
}

impl BlameList {
    pub fn new<H: History>(cursor: &mut Cursor<H>) -> Self {
        Self {
            events: cursor.subscribe(),
            len: cursor.lines().len(),
            selected: cursor.first_changed_line().unwrap_or(0),
            offset: 0,
            scroll_target: cursor.first_changed_line(),
        }
    }

    /// Apply pending cursor notifications. A new revision selects its first
    /// changed line and asks for it to be scrolled into view.
    pub fn sync<H: History>(&mut self, cursor: &Cursor<H>) -> bool {
        let mut changed = false;
        for event in self.events.try_iter() {
            changed = true;
            match event {
                CursorEvent::FileChanged => {
                    self.selected = 0;
                    self.offset = 0;
                    self.scroll_target = None;
                }
                CursorEvent::RevisionChanged => {
                    self.len = cursor.lines().len();
                    match cursor.first_changed_line() {
                        Some(first) => {
                            self.selected = first;
                            self.scroll_target = Some(first);
                        }
                        None => {
                            self.selected = self.selected.min(self.len.saturating_sub(1));
                        }
                    }
                }
            }
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn selected(&self) -> Option<usize> {
        (self.len > 0).then_some(self.selected)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn select(&mut self, row: usize) {
        if self.len > 0 {
            self.selected = row.min(self.len - 1);
        }
    }

    pub fn select_next(&mut self, step: usize) {
        self.select(self.selected.saturating_add(step));
    }

    pub fn select_prev(&mut self, step: usize) {
        self.select(self.selected.saturating_sub(step));
    }

    pub fn select_first(&mut self) {
        self.select(0);
    }

    pub fn select_last(&mut self) {
        self.select(self.len.saturating_sub(1));
    }

    /// Settle the scroll offset for a viewport of `height` rows.
    ///
    /// A pending scroll target is placed a third of the way down the viewport;
    /// otherwise the offset only moves as far as needed to keep the selection
    /// visible.
    pub fn scroll_into_view(&mut self, height: usize) -> usize {
        if height == 0 || self.len == 0 {
            self.offset = 0;
            self.scroll_target = None;
            return self.offset;
        }

        if let Some(target) = self.scroll_target.take() {
            self.offset = target.saturating_sub(height / 3);
        }
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + height {
            self.offset = self.selected + 1 - height;
        }
        self.offset = self.offset.min(self.len.saturating_sub(height));
        self.offset
    }

    /// Line index under viewport row `row`, if any.
    pub fn row_at(&self, row: usize) -> Option<usize> {
        let index = self.offset + row;
        (index < self.len).then_some(index)
    }
}

/// Read-only text pane mirroring the current commit description.
pub struct DescriptionPane {
    events: Receiver<CursorEvent>,
    text: String,
    scroll: u16,
}

impl DescriptionPane {
    pub fn new<H: History>(cursor: &mut Cursor<H>) -> Self {
        Self {
            events: cursor.subscribe(),
            text: cursor.description().to_string(),
            scroll: 0,
        }
    }

    pub fn sync<H: History>(&mut self, cursor: &Cursor<H>) -> bool {
        let changed = self.events.try_iter().count() > 0;
        if changed {
            self.text = cursor.description().to_string();
            self.scroll = 0;
        }
        changed
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn scroll_down(&mut self, rows: u16) {
        let last = self.text.lines().count().saturating_sub(1);
        let max = u16::try_from(last).unwrap_or(u16::MAX);
        self.scroll = self.scroll.saturating_add(rows).min(max);
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll = self.scroll.saturating_sub(rows);
    }
}
