use time::Date;
use unicode_segmentation::UnicodeSegmentation;

use crate::buckets::{bucket_entries, Bucket};
use crate::entry::Entry;
use crate::search::filter_entries;
use crate::store::{EntryFields, EntryStore};

/// Which view fills the main area.
#[derive(Debug, Clone)]
pub enum Screen {
    Browse,
    Detail { id: String },
    Form(FormState),
}

/// One row of the flattened browse list. Headers and entries share the list
/// so a terminal row maps straight back to what it shows, which is what the
/// mouse handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRow {
    Header(Bucket),
    Entry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Date,
    Title,
    Problem,
    Tech,
    Notes,
    Code,
}

impl FormField {
    pub const ORDER: [FormField; 6] = [
        FormField::Date,
        FormField::Title,
        FormField::Problem,
        FormField::Tech,
        FormField::Notes,
        FormField::Code,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Date => "Date",
            FormField::Title => "Title",
            FormField::Problem => "Problem",
            FormField::Tech => "Tech (comma separated)",
            FormField::Notes => "Notes",
            FormField::Code => "Code",
        }
    }
}

/// Single text input with a grapheme-aware cursor. Notes and code accept
/// embedded newlines; the other fields stay on one line.
#[derive(Debug, Clone, Default)]
pub struct FieldInput {
    pub value: String,
    pub cursor: usize,
}

impl FieldInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.value.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.value, self.cursor);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.value.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.value, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.value.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = prev_grapheme_boundary(&self.value, self.cursor);
    }

    pub fn move_right(&mut self) {
        self.cursor = next_grapheme_boundary(&self.value, self.cursor);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.len();
    }
}

#[derive(Debug, Clone)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub mode: FormMode,
    pub date: FieldInput,
    pub title: FieldInput,
    pub problem: FieldInput,
    pub tech: FieldInput,
    pub notes: FieldInput,
    pub code: FieldInput,
    pub focused: FormField,
    pub error: Option<String>,
}

impl FormState {
    /// Blank form for a new entry, dated to the current local minute.
    pub fn create(default_date: String) -> Self {
        Self {
            mode: FormMode::Create,
            date: FieldInput::with_value(default_date),
            title: FieldInput::default(),
            problem: FieldInput::default(),
            tech: FieldInput::default(),
            notes: FieldInput::default(),
            code: FieldInput::default(),
            focused: FormField::Title,
            error: None,
        }
    }

    /// Form pre-filled from an existing entry.
    pub fn edit(entry: &Entry) -> Self {
        Self {
            mode: FormMode::Edit {
                id: entry.id.clone(),
            },
            date: FieldInput::with_value(entry.date.clone()),
            title: FieldInput::with_value(entry.title.clone()),
            problem: FieldInput::with_value(entry.problem.clone()),
            tech: FieldInput::with_value(entry.tech.join(", ")),
            notes: FieldInput::with_value(entry.notes.clone()),
            code: FieldInput::with_value(entry.code.clone()),
            focused: FormField::Title,
            error: None,
        }
    }

    pub fn input(&self, field: FormField) -> &FieldInput {
        match field {
            FormField::Date => &self.date,
            FormField::Title => &self.title,
            FormField::Problem => &self.problem,
            FormField::Tech => &self.tech,
            FormField::Notes => &self.notes,
            FormField::Code => &self.code,
        }
    }

    pub fn focused_input_mut(&mut self) -> &mut FieldInput {
        match self.focused {
            FormField::Date => &mut self.date,
            FormField::Title => &mut self.title,
            FormField::Problem => &mut self.problem,
            FormField::Tech => &mut self.tech,
            FormField::Notes => &mut self.notes,
            FormField::Code => &mut self.code,
        }
    }

    pub fn focus_next(&mut self) {
        let idx = FormField::ORDER
            .iter()
            .position(|f| *f == self.focused)
            .unwrap_or(0);
        self.focused = FormField::ORDER[(idx + 1) % FormField::ORDER.len()];
    }

    pub fn focus_previous(&mut self) {
        let idx = FormField::ORDER
            .iter()
            .position(|f| *f == self.focused)
            .unwrap_or(0);
        let len = FormField::ORDER.len();
        self.focused = FormField::ORDER[(idx + len - 1) % len];
    }

    /// Multi-line fields take Enter as a newline; the rest treat it as
    /// submit.
    pub fn focused_is_multiline(&self) -> bool {
        matches!(self.focused, FormField::Notes | FormField::Code)
    }

    pub fn to_fields(&self) -> EntryFields {
        EntryFields {
            date: self.date.value.clone(),
            title: self.title.value.clone(),
            problem: self.problem.value.clone(),
            tech: vec![self.tech.value.clone()],
            notes: self.notes.value.clone(),
            code: self.code.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub entries: Vec<Entry>,
    pub query: String,
    pub search_focused: bool,
    pub active_id: Option<String>,
    pub screen: Screen,
    pub status_message: Option<String>,
    pub load_error: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            query: String::new(),
            search_focused: false,
            active_id: None,
            screen: Screen::Browse,
            status_message: None,
            load_error: None,
        }
    }

    /// Reloads entries from the store. On failure the error is kept for
    /// inline display and the previous entries stay visible.
    pub fn refresh(&mut self, store: &EntryStore) {
        match store.list_entries(None) {
            Ok(entries) => {
                self.entries = entries;
                self.load_error = None;
            }
            Err(err) => {
                tracing::error!(%err, "failed to load entries");
                self.load_error = Some(err.to_string());
            }
        }
        self.revalidate_active();
    }

    /// Entries passing the current query, in store order.
    pub fn filtered(&self) -> Vec<&Entry> {
        filter_entries(&self.entries, &self.query)
    }

    pub fn active_entry(&self) -> Option<&Entry> {
        let id = self.active_id.as_deref()?;
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Keeps the active id if it survived the last filter change, otherwise
    /// falls back to the first visible entry, or none.
    pub fn revalidate_active(&mut self) {
        let filtered = self.filtered();
        let still_visible = self
            .active_id
            .as_deref()
            .is_some_and(|id| filtered.iter().any(|entry| entry.id == id));
        if !still_visible {
            self.active_id = filtered.first().map(|entry| entry.id.clone());
        }
    }

    /// Moves the active selection by `delta`, clamped to the visible list.
    pub fn move_active(&mut self, delta: isize) {
        let filtered = self.filtered();
        if filtered.is_empty() {
            self.active_id = None;
            return;
        }
        let current = self
            .active_id
            .as_deref()
            .and_then(|id| filtered.iter().position(|entry| entry.id == id))
            .unwrap_or(0);
        let len = filtered.len() as isize;
        let mut next = current as isize + delta;
        if next < 0 {
            next = 0;
        } else if next >= len {
            next = len - 1;
        }
        self.active_id = Some(filtered[next as usize].id.clone());
    }

    pub fn select_entry_by_id(&mut self, id: &str) {
        if self.entries.iter().any(|entry| entry.id == id) {
            self.active_id = Some(id.to_string());
        }
        self.revalidate_active();
    }

    pub fn push_query_char(&mut self, ch: char) {
        self.query.push(ch);
        self.revalidate_active();
    }

    pub fn pop_query_char(&mut self) {
        if self.query.pop().is_some() {
            self.revalidate_active();
        }
    }

    /// Clears the query but keeps the search input focused. Escape on an
    /// already-empty search blurs instead, via `finish_search`.
    pub fn clear_query(&mut self) {
        self.query.clear();
        self.revalidate_active();
    }

    pub fn begin_search(&mut self) {
        self.search_focused = true;
    }

    pub fn finish_search(&mut self) {
        self.search_focused = false;
    }

    /// Navigation keys are swallowed while something is taking text input.
    pub fn is_typing(&self) -> bool {
        self.search_focused || matches!(self.screen, Screen::Form(_))
    }

    pub fn form(&self) -> Option<&FormState> {
        match &self.screen {
            Screen::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        match &mut self.screen {
            Screen::Form(form) => Some(form),
            _ => None,
        }
    }

    /// The browse list flattened into rows: a header per non-empty bucket,
    /// then that bucket's entries. Row index equals terminal row offset, so
    /// mouse position maps directly.
    pub fn visible_rows(&self, today: Date) -> Vec<ListRow> {
        let filtered = self.filtered();
        let buckets = bucket_entries(filtered.into_iter(), today);
        let mut rows = Vec::new();
        for bucket in Bucket::ALL {
            let entries = buckets.entries(bucket);
            if entries.is_empty() {
                continue;
            }
            rows.push(ListRow::Header(bucket));
            for entry in entries {
                rows.push(ListRow::Entry(entry.id.clone()));
            }
        }
        rows
    }

    /// Pointer hover over a list row makes that entry active. Header rows
    /// are ignored.
    pub fn hover_row(&mut self, rows: &[ListRow], index: usize) {
        if let Some(ListRow::Entry(id)) = rows.get(index) {
            self.active_id = Some(id.clone());
        }
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in text[..cursor].grapheme_indices(true) {
        last = idx;
    }
    last
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    let mut iter = text[cursor..].graphemes(true);
    if let Some(grapheme) = iter.next() {
        cursor + grapheme.len()
    } else {
        text.len()
    }
}
