use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use time::{Date, OffsetDateTime};

use crate::config::AppConfig;
use crate::entry::now_for_form;
use crate::store::EntryStore;
use crate::ui;

mod actions;
pub mod state;

pub use state::{AppState, FormState, ListRow, Screen};

use actions::EntryActions;
use state::FormMode;

type Backend = CrosstermBackend<Stdout>;

/// Key presses translate into one of these before anything mutates state, so
/// the bindings stay readable in one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    OpenActive,
    StartSearch,
    NewEntry,
    EditActive,
    DeleteActive,
    Refresh,
}

pub struct App {
    config: Arc<AppConfig>,
    store: EntryStore,
    state: AppState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: EntryStore) -> Self {
        let mut state = AppState::new();
        state.refresh(&store);
        Self {
            config,
            store,
            state,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = self.setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        self.restore_terminal(&mut terminal)?;
        result
    }

    fn setup_terminal(&self) -> Result<Terminal<Backend>> {
        enable_raw_mode().context("enabling raw mode")?;
        let mut stdout = io::stdout();
        if self.config.ui.mouse_capture {
            execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
                .context("entering alternate screen")?;
        } else {
            execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("creating terminal")?;
        terminal.hide_cursor().context("hiding cursor")?;
        Ok(terminal)
    }

    fn restore_terminal(&self, terminal: &mut Terminal<Backend>) -> Result<()> {
        disable_raw_mode().context("disabling raw mode")?;
        if self.config.ui.mouse_capture {
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture
            )
            .context("leaving alternate screen")?;
        } else {
            execute!(terminal.backend_mut(), LeaveAlternateScreen)
                .context("leaving alternate screen")?;
        }
        terminal.show_cursor().context("restoring cursor")?;
        Ok(())
    }

    fn event_loop(&mut self, terminal: &mut Terminal<Backend>) -> Result<()> {
        while !self.should_quit {
            let today = local_today();
            self.sync_list_selection(today);
            let preview_lines = self.config.ui.preview_lines as usize;
            terminal
                .draw(|frame| {
                    ui::draw_app(frame, &self.state, &mut self.list_state, today, preview_lines)
                })
                .context("drawing frame")?;

            if event::poll(self.tick_rate).context("polling terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => {
                        let area = terminal.size().context("reading terminal size")?;
                        self.handle_mouse(mouse, area);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Points the list widget's selection at the row holding the active
    /// entry, so the highlight and the scroll offset track it.
    fn sync_list_selection(&mut self, today: Date) {
        let rows = self.state.visible_rows(today);
        let selected = self.state.active_id.as_deref().and_then(|id| {
            rows.iter()
                .position(|row| matches!(row, ListRow::Entry(row_id) if row_id == id))
        });
        self.list_state.select(selected);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match &self.state.screen {
            Screen::Form(_) => self.handle_form_key(key),
            Screen::Detail { .. } => self.handle_detail_key(key),
            Screen::Browse => {
                if self.state.search_focused {
                    self.handle_search_key(key);
                } else if let Some(action) = browse_action(key) {
                    self.dispatch(action);
                }
            }
        }
    }

    /// While the search bar owns the keyboard every navigation binding is
    /// swallowed; only editing keys do anything.
    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            // Escape is two-step: first press clears a non-empty query,
            // second press drops focus back to the list.
            KeyCode::Esc => {
                if self.state.query.is_empty() {
                    self.state.finish_search();
                } else {
                    self.state.clear_query();
                }
            }
            KeyCode::Enter => self.state.finish_search(),
            KeyCode::Backspace => self.state.pop_query_char(),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.state.push_query_char(ch);
            }
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.state.screen = Screen::Browse;
            }
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('d') => {
                self.delete_active();
                self.state.screen = Screen::Browse;
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state.screen = Screen::Browse;
                self.state.set_status_message(Some("Edit canceled"));
            }
            KeyCode::Tab => {
                if let Some(form) = self.state.form_mut() {
                    form.focus_next();
                }
            }
            KeyCode::BackTab => {
                if let Some(form) = self.state.form_mut() {
                    form.focus_previous();
                }
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.submit_form();
            }
            KeyCode::Enter => {
                let multiline = self
                    .state
                    .form()
                    .is_some_and(FormState::focused_is_multiline);
                if multiline {
                    if let Some(form) = self.state.form_mut() {
                        form.focused_input_mut().insert_char('\n');
                    }
                } else {
                    self.submit_form();
                }
            }
            KeyCode::Backspace => {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().backspace();
                }
            }
            KeyCode::Delete => {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().delete();
                }
            }
            KeyCode::Left => {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().move_left();
                }
            }
            KeyCode::Right => {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().move_right();
                }
            }
            KeyCode::Home => {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().move_home();
                }
            }
            KeyCode::End => {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().move_end();
                }
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                if let Some(form) = self.state.form_mut() {
                    form.focused_input_mut().insert_char(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, area: Rect) {
        if !matches!(self.state.screen, Screen::Browse) {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => self.state.move_active(1),
            MouseEventKind::ScrollUp => self.state.move_active(-1),
            MouseEventKind::Moved | MouseEventKind::Down(MouseButton::Left) => {
                self.hover_at(mouse.column, mouse.row, area);
            }
            _ => {}
        }
    }

    /// Maps a pointer position back to a list row. The browse list renders
    /// one row per line inside its border, so the row index is the scroll
    /// offset plus the distance from the top of the inner area.
    fn hover_at(&mut self, column: u16, row: u16, area: Rect) {
        let layout = ui::browse_layout(area);
        let list = layout.list;
        if list.width < 3 || list.height < 3 {
            return;
        }
        let inner_x = list.x + 1..list.x + list.width - 1;
        let inner_y = list.y + 1..list.y + list.height - 1;
        if !inner_x.contains(&column) || !inner_y.contains(&row) {
            return;
        }
        let index = self.list_state.offset() + (row - (list.y + 1)) as usize;
        let rows = self.state.visible_rows(local_today());
        self.state.hover_row(&rows, index);
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.state.move_active(1),
            Action::SelectPrevious => self.state.move_active(-1),
            Action::OpenActive => self.open_active(),
            Action::StartSearch => self.state.begin_search(),
            Action::NewEntry => {
                self.state.screen = Screen::Form(FormState::create(now_for_form()));
            }
            Action::EditActive => self.open_edit_form(),
            Action::DeleteActive => self.delete_active(),
            Action::Refresh => {
                self.state.refresh(&self.store);
                self.state.set_status_message(Some("Reloaded"));
            }
        }
    }

    fn open_active(&mut self) {
        if let Some(entry) = self.state.active_entry() {
            self.state.screen = Screen::Detail {
                id: entry.id.clone(),
            };
        }
    }

    fn open_edit_form(&mut self) {
        if let Some(entry) = self.state.active_entry() {
            self.state.screen = Screen::Form(FormState::edit(entry));
        }
    }

    fn delete_active(&mut self) {
        let Some(id) = self.state.active_id.clone() else {
            return;
        };
        match EntryActions::new(&self.store).delete(&id) {
            Ok(()) => {
                self.state.refresh(&self.store);
                self.state.set_status_message(Some("Entry deleted"));
            }
            Err(err) => {
                tracing::error!(%err, id, "failed to delete entry");
                self.state.set_status_message(Some(err.to_string()));
            }
        }
    }

    /// Validates and persists the open form. On failure the form stays on
    /// screen with its values intact and the error inline.
    fn submit_form(&mut self) {
        let Some(form) = self.state.form() else {
            return;
        };
        if form.title.value.trim().is_empty() {
            if let Some(form) = self.state.form_mut() {
                form.error = Some("Title is required".to_string());
            }
            return;
        }
        let fields = form.to_fields();
        let mode = form.mode.clone();

        let actions = EntryActions::new(&self.store);
        let result = match &mode {
            FormMode::Create => actions.create(&fields),
            FormMode::Edit { id } => actions.update(id, &fields),
        };
        match result {
            Ok(entry) => {
                self.state.screen = Screen::Browse;
                self.state.refresh(&self.store);
                self.state.select_entry_by_id(&entry.id);
                self.state.set_status_message(Some("Entry saved"));
            }
            Err(err) => {
                tracing::error!(%err, "failed to save entry");
                if let Some(form) = self.state.form_mut() {
                    form.error = Some(err.to_string());
                }
            }
        }
    }
}

fn browse_action(key: KeyEvent) -> Option<Action> {
    let plain = !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::Refresh)
        }
        KeyCode::Char('q') if plain => Some(Action::Quit),
        KeyCode::Char('/') if plain => Some(Action::StartSearch),
        KeyCode::Down => Some(Action::SelectNext),
        KeyCode::Up => Some(Action::SelectPrevious),
        KeyCode::Char('j') if plain => Some(Action::SelectNext),
        KeyCode::Char('k') if plain => Some(Action::SelectPrevious),
        KeyCode::Enter => Some(Action::OpenActive),
        KeyCode::Char('n') if plain => Some(Action::NewEntry),
        KeyCode::Char('e') if plain => Some(Action::EditActive),
        KeyCode::Char('d') if plain => Some(Action::DeleteActive),
        _ => None,
    }
}

/// Today in the local timezone, falling back to UTC when the offset cannot
/// be determined.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
