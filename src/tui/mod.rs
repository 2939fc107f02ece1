use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::abbrev;
use crate::bindings::{BlameList, DescriptionPane, RevisionSlider};
use crate::cursor::{Cursor, Navigation};
use crate::git::{GitError, History};
use crate::highlight::Highlighter;

/// Background of lines introduced by the revision being shown.
const CHANGED_BG: Color = Color::Rgb(0x1f, 0x3d, 0x1f);

/// Two clicks on the same row within this window count as a double-click.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

const DESCRIPTION_HEIGHT: u16 = 10;

/// Application state for the TUI.
pub struct App<H: History> {
    cursor: Cursor<H>,
    slider: RevisionSlider,
    list: BlameList,
    description: DescriptionPane,
    highlighter: Highlighter,
    /// Syntax-highlighted text of `cursor.lines()`, rebuilt on every revision change.
    highlighted: Vec<Vec<Span<'static>>>,
    should_quit: bool,
    show_help: bool,
    /// Path being typed into the open-file prompt.
    prompt: Option<String>,
    /// Error shown in a modal until any key is pressed.
    notice: Option<String>,
    status_message: Option<(String, Instant)>,
    pending_title: Option<String>,
    last_click: Option<(usize, Instant)>,
    slider_area: Rect,
    list_area: Rect,
}

impl<H: History> App<H> {
    /// Wrap a cursor; bindings subscribe to it here.
    pub fn new(mut cursor: Cursor<H>) -> Self {
        let slider = RevisionSlider::new(&mut cursor);
        let list = BlameList::new(&mut cursor);
        let description = DescriptionPane::new(&mut cursor);

        Self {
            cursor,
            slider,
            list,
            description,
            highlighter: Highlighter::new(),
            highlighted: Vec::new(),
            should_quit: false,
            show_help: false,
            prompt: None,
            notice: None,
            status_message: None,
            pending_title: Some("git-rewind".to_string()),
            last_click: None,
            slider_area: Rect::default(),
            list_area: Rect::default(),
        }
    }

    /// Load `path` into the cursor. Failures become a dismissible notice.
    pub fn open(&mut self, path: PathBuf) {
        let result = self.cursor.load_file(&path);
        self.sync_bindings();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.pending_title = Some(format!("git-rewind - {}", name));

        if let Err(e) = result {
            self.notice = Some(format!("Could not load {}\n\n{}", path.display(), e));
        }
    }

    pub fn cursor(&self) -> &Cursor<H> {
        &self.cursor
    }

    /// Drain cursor notifications into the bindings.
    fn sync_bindings(&mut self) {
        self.slider.sync(&self.cursor);
        self.description.sync(&self.cursor);
        if self.list.sync(&self.cursor) {
            self.refresh_highlights();
        }
    }

    fn refresh_highlights(&mut self) {
        self.highlighted = match self.cursor.path() {
            Some(path) => {
                let mut fh = self.highlighter.for_path(path);
                self.cursor
                    .lines()
                    .iter()
                    .map(|line| fh.highlight_line(&line.text))
                    .collect()
            }
            None => Vec::new(),
        };
    }

    /// Record the outcome of a cursor operation; errors become a notice.
    fn apply(&mut self, result: Result<Navigation, GitError>) -> Option<Navigation> {
        let navigation = match result {
            Ok(navigation) => Some(navigation),
            Err(e) => {
                self.notice = Some(e.to_string());
                None
            }
        };
        self.sync_bindings();
        navigation
    }

    fn go_to(&mut self, index: usize) {
        let result = self.cursor.go_to_index(index);
        self.apply(result);
    }

    fn step_older(&mut self) {
        if let Some(index) = self.cursor.current_index()
            && index > 0
        {
            self.go_to(index - 1);
        }
    }

    fn step_newer(&mut self) {
        if let Some(index) = self.cursor.current_index() {
            self.go_to(index + 1);
        }
    }

    fn go_to_newest(&mut self) {
        if let Some(last) = self.cursor.revisions().len().checked_sub(1) {
            self.go_to(last);
        }
    }

    /// Drill down from `row`: to the revision before the change, or to the
    /// revision that introduced the line.
    fn drill_down(&mut self, row: usize) {
        let revision = self
            .cursor
            .lines()
            .get(row)
            .map(|line| line.short_revision().to_string());
        let result = self.cursor.invoke_line_action(row);
        if self.apply(result) == Some(Navigation::NotFound) {
            self.set_status(format!(
                "Revision {} is not in this file's history",
                revision.unwrap_or_default()
            ));
        }
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    fn start_prompt(&mut self) {
        let initial = self
            .cursor
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.prompt = Some(initial);
    }

    /// Handle keyboard input, overlays first.
    fn handle_input(&mut self, key: KeyEvent) {
        if self.notice.take().is_some() {
            // Any key dismisses the notice
            return;
        }

        if let Some(mut input) = self.prompt.take() {
            match key.code {
                KeyCode::Enter => {
                    let path = input.trim();
                    if !path.is_empty() {
                        self.open(PathBuf::from(path));
                    }
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    input.pop();
                    self.prompt = Some(input);
                }
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    input.push(c);
                    self.prompt = Some(input);
                }
                _ => self.prompt = Some(input),
            }
            return;
        }

        if self.show_help {
            // Any key closes help
            self.show_help = false;
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => self.should_quit = true,
            KeyCode::Char('o') if ctrl => self.start_prompt(),
            KeyCode::Char('d') if ctrl => self.description.scroll_down(5),
            KeyCode::Char('u') if ctrl => self.description.scroll_up(5),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('o') => self.start_prompt(),
            KeyCode::Char('h') | KeyCode::Left => self.step_older(),
            KeyCode::Char('l') | KeyCode::Right => self.step_newer(),
            KeyCode::Char('[') => self.go_to(0),
            KeyCode::Char(']') => self.go_to_newest(),
            KeyCode::Char('j') | KeyCode::Down => self.list.select_next(1),
            KeyCode::Char('k') | KeyCode::Up => self.list.select_prev(1),
            KeyCode::PageDown => self.list.select_next(self.page_size()),
            KeyCode::PageUp => self.list.select_prev(self.page_size()),
            KeyCode::Home => self.list.select_first(),
            KeyCode::End => self.list.select_last(),
            KeyCode::Enter => {
                if let Some(row) = self.list.selected() {
                    self.drill_down(row);
                }
            }
            _ => {}
        }
    }

    /// Handle mouse input: slider clicks, row selection, double-click drill-down.
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.notice.is_some() || self.prompt.is_some() || self.show_help {
            return;
        }

        let pos = Position::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.slider_area.contains(pos) {
                    let column = mouse.column - self.slider_area.x;
                    if let Some(index) = self.slider.index_at(column, self.slider_area.width) {
                        self.go_to(index);
                    }
                } else if self.list_area.contains(pos) {
                    let Some(row) = self.list.row_at((mouse.row - self.list_area.y) as usize)
                    else {
                        return;
                    };
                    self.list.select(row);

                    let now = Instant::now();
                    let is_double = matches!(
                        self.last_click,
                        Some((last_row, at)) if last_row == row && now.duration_since(at) <= DOUBLE_CLICK
                    );
                    if is_double {
                        self.last_click = None;
                        self.drill_down(row);
                    } else {
                        self.last_click = Some((row, now));
                    }
                }
            }
            MouseEventKind::ScrollDown if self.list_area.contains(pos) => self.list.select_next(3),
            MouseEventKind::ScrollUp if self.list_area.contains(pos) => self.list.select_prev(3),
            _ => {}
        }
    }

    fn page_size(&self) -> usize {
        (self.list_area.height as usize).max(1)
    }

    /// Render the UI.
    fn render(&mut self, frame: &mut Frame) {
        // Expire old status messages
        let expired = self
            .status_message
            .as_ref()
            .map(|(_, time)| time.elapsed() >= Duration::from_secs(3))
            .unwrap_or(false);
        if expired {
            self.status_message = None;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(DESCRIPTION_HEIGHT),
                Constraint::Length(3),
            ])
            .split(frame.area());

        self.render_slider(frame, chunks[0]);
        self.render_blame(frame, chunks[1]);
        self.render_description(frame, chunks[2]);
        self.render_status_bar(frame, chunks[3]);

        if self.show_help {
            self.render_help(frame);
        }
        if self.prompt.is_some() {
            self.render_prompt(frame);
        }
        if self.notice.is_some() {
            self.render_notice(frame);
        }
    }

    /// Render the revision slider with one tick per revision when they fit.
    fn render_slider(&mut self, frame: &mut Frame, area: Rect) {
        let title = match (self.slider.value(), self.cursor.current_revision()) {
            (Some(index), Some(revision)) => format!(
                " Revision {}/{} · {} ",
                index + 1,
                self.slider.len(),
                abbrev(revision)
            ),
            _ => " Revisions ".to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.slider_area = inner;

        if inner.width == 0 || inner.height == 0 || self.slider.is_empty() {
            return;
        }

        let width = inner.width;
        let mut track = vec!['─'; width as usize];
        if self.slider.len() * 2 <= width as usize {
            for index in 0..self.slider.len() {
                track[self.slider.column_of(index, width) as usize] = '┼';
            }
        }

        let knob = self
            .slider
            .value()
            .map(|value| self.slider.column_of(value, width) as usize);
        let track_style = Style::default().fg(Color::DarkGray);
        let line = match knob {
            Some(col) => Line::from(vec![
                Span::styled(track[..col].iter().collect::<String>(), track_style),
                Span::styled(
                    "●",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(track[col + 1..].iter().collect::<String>(), track_style),
            ]),
            None => Line::styled(track.iter().collect::<String>(), track_style),
        };

        frame.render_widget(Paragraph::new(line), inner);
    }

    /// Render the annotated lines of the current revision.
    fn render_blame(&mut self, frame: &mut Frame, area: Rect) {
        let title = match self.cursor.path() {
            Some(path) => format!(" {} ", path.display()),
            None => " Blame ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_bottom(" Enter/double-click: drill down ");
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.list_area = inner;

        if self.cursor.lines().is_empty() {
            let message = match self.cursor.path() {
                None => "No file loaded. Press o to open a file.",
                Some(_) => "No history to show for this file.",
            };
            let paragraph = Paragraph::new(message).style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, inner);
            return;
        }

        let height = inner.height as usize;
        let offset = self.list.scroll_into_view(height);
        let selected = self.list.selected();

        let items: Vec<ListItem> = self
            .cursor
            .lines()
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, line)| {
                let changed = self.cursor.is_current_revision(line);
                let gutter_style = if changed {
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };

                let mut spans = vec![Span::styled(line.gutter(), gutter_style)];
                match self.highlighted.get(i) {
                    Some(highlighted) => spans.extend(highlighted.iter().cloned()),
                    None => spans.push(Span::raw(line.text.clone())),
                }

                let mut style = Style::default();
                if changed {
                    style = style.bg(CHANGED_BG);
                }
                if Some(i) == selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                ListItem::new(Line::from(spans)).style(style)
            })
            .collect();

        frame.render_widget(List::new(items), inner);
    }

    /// Render the commit description pane.
    fn render_description(&self, frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(self.description.text())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Description (Ctrl+d/Ctrl+u) "),
            )
            .wrap(Wrap { trim: false })
            .scroll((self.description.scroll(), 0));

        frame.render_widget(paragraph, area);
    }

    /// Render the status bar.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let status_text = match &self.status_message {
            Some((msg, _)) => msg.clone(),
            None => {
                let changed = self
                    .cursor
                    .lines()
                    .iter()
                    .filter(|line| self.cursor.is_current_revision(line))
                    .count();
                format!(
                    "{} lines, {} changed | h/l: revision  j/k: line  Enter: drill down  o: open  ?: help  q: quit",
                    self.cursor.lines().len(),
                    changed
                )
            }
        };

        let paragraph = Paragraph::new(status_text)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }

    /// Render the help overlay.
    fn render_help(&self, frame: &mut Frame) {
        let help_text = [
            "git-rewind - Keyboard Shortcuts",
            "",
            "Revisions:",
            "  h / Left      - Older revision",
            "  l / Right     - Newer revision",
            "  [ / ]         - Oldest / newest revision",
            "  Click slider  - Jump to revision",
            "",
            "Lines:",
            "  j / Down      - Next line",
            "  k / Up        - Previous line",
            "  PgDn / PgUp   - Page down / up",
            "  Home / End    - First / last line",
            "",
            "Drill-down (Enter or double-click):",
            "  On a highlighted line - show the revision before it changed",
            "  On any other line     - show the revision that introduced it",
            "",
            "Other:",
            "  Ctrl+d/Ctrl+u - Scroll description",
            "  o / Ctrl+o    - Open a file",
            "  ?             - Show this help",
            "  q / Esc       - Quit",
            "",
            "Press any key to close this help",
        ];

        let text = Text::from(help_text.iter().map(|&s| Line::from(s)).collect::<Vec<_>>());

        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });

        let area = centered_rect(60, 80, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }

    /// Render the open-file prompt.
    fn render_prompt(&self, frame: &mut Frame) {
        let input = self.prompt.as_deref().unwrap_or_default();
        let paragraph = Paragraph::new(format!("Path: {}_", input))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Open file (Enter to load, Esc to cancel)"),
            )
            .wrap(Wrap { trim: false });

        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }

    /// Render the error notice modal.
    fn render_notice(&self, frame: &mut Frame) {
        let Some(notice) = &self.notice else {
            return;
        };

        let paragraph = Paragraph::new(format!("{}\n\nPress any key to dismiss", notice))
            .block(Block::default().borders(Borders::ALL).title("Error"))
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::Yellow));

        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Setup the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Launch the interactive blame viewer.
pub fn run_tui<H: History>(mut app: App<H>) -> Result<()> {
    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;

    // Main event loop
    let result = (|| -> Result<()> {
        loop {
            if let Some(title) = app.pending_title.take() {
                execute!(terminal.backend_mut(), SetTitle(title))
                    .context("Failed to set terminal title")?;
            }

            terminal
                .draw(|f| app.render(f))
                .context("Failed to draw frame")?;

            if app.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(200)).context("Failed to poll events")? {
                match event::read().context("Failed to read event")? {
                    // Ignore key release events
                    Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                        app.handle_input(key);
                    }
                    Event::Mouse(mouse) => app.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    })();

    // Restore terminal in all cases
    restore_terminal(&mut terminal)?;

    result
}
