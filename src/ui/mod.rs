use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::Date;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{FieldInput, FormField, FormMode, FormState};
use crate::app::{AppState, ListRow, Screen};
use crate::entry::{display_date, Entry};
use crate::highlight::{build_highlight_regex, highlight_fragments};
use crate::search::highlight_tokens;

/// Width reserved for the date column in the browse list, wide enough for
/// the `YYYY-MM-DD @ HH:MM` form plus a gap.
const DATE_COLUMN: usize = 18;

/// The browse screen's panes. The mouse handler uses the same rectangles to
/// map pointer positions back to list rows.
pub struct BrowseLayout {
    pub search: Rect,
    pub list: Rect,
    pub preview: Rect,
    pub status: Rect,
}

pub fn browse_layout(area: Rect) -> BrowseLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(4),
        ])
        .split(area);
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[1]);
    BrowseLayout {
        search: vertical[0],
        list: main[0],
        preview: main[1],
        status: vertical[2],
    }
}

pub fn draw_app(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    today: Date,
    preview_lines: usize,
) {
    match &state.screen {
        Screen::Browse => draw_browse(frame, state, list_state, today, preview_lines),
        Screen::Detail { id } => draw_detail(frame, state, id),
        Screen::Form(form) => draw_form(frame, form),
    }
}

fn draw_browse(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    today: Date,
    preview_lines: usize,
) {
    let layout = browse_layout(frame.size());
    let regex = build_highlight_regex(&highlight_tokens(&state.query));

    frame.render_widget(search_bar(state), layout.search);

    if let Some(err) = &state.load_error {
        let error = Paragraph::new(format!("Could not load entries: {err}"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Entries"));
        frame.render_widget(error, layout.list);
    } else {
        let rows = state.visible_rows(today);
        let items = list_items(state, &rows, regex.as_ref());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Entries"))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(list, layout.list, list_state);
    }

    let preview = match state.active_entry() {
        Some(entry) => preview_text(entry, regex.as_ref(), preview_lines),
        None => Text::from(Span::styled(
            "Nothing selected",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(
        Paragraph::new(preview)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Preview")),
        layout.preview,
    );

    frame.render_widget(status_bar(state), layout.status);
}

fn search_bar(state: &AppState) -> Paragraph<'static> {
    let (text, style) = if state.search_focused {
        (format!("{}▌", state.query), Style::default())
    } else if state.query.is_empty() {
        (
            "press / to search".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (state.query.clone(), Style::default())
    };
    let border = if state.search_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Paragraph::new(Span::styled(text, style)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Search"),
    )
}

fn list_items(state: &AppState, rows: &[ListRow], regex: Option<&Regex>) -> Vec<ListItem<'static>> {
    if rows.is_empty() {
        let message = if state.query.trim().is_empty() {
            "No entries yet. Press n to create one."
        } else {
            "No entries match the current search."
        };
        return vec![ListItem::new(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        ))];
    }

    rows.iter()
        .map(|row| match row {
            ListRow::Header(bucket) => ListItem::new(Line::from(Span::styled(
                bucket.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))),
            ListRow::Entry(id) => match state.entries.iter().find(|entry| entry.id == *id) {
                Some(entry) => ListItem::new(entry_line(entry, regex)),
                None => ListItem::new(Span::styled(
                    id.clone(),
                    Style::default().fg(Color::DarkGray),
                )),
            },
        })
        .collect()
}

/// One browse row: padded date column, highlighted title, then tech tags.
/// Everything stays on a single line so row indices track terminal rows.
fn entry_line(entry: &Entry, regex: Option<&Regex>) -> Line<'static> {
    let date = display_date(&entry.date);
    let pad = DATE_COLUMN.saturating_sub(UnicodeWidthStr::width(date.as_str()));
    let mut spans = vec![Span::styled(
        format!("{date}{}", " ".repeat(pad)),
        Style::default().fg(Color::DarkGray),
    )];
    spans.extend(highlight_spans(
        &entry.title,
        regex,
        match_style(),
        Style::default(),
    ));
    if !entry.tech.is_empty() {
        let tags = entry
            .tech
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        spans.push(Span::raw("  "));
        spans.push(Span::styled(tags, Style::default().fg(Color::Green)));
    }
    Line::from(spans)
}

fn preview_text(entry: &Entry, regex: Option<&Regex>, preview_lines: usize) -> Text<'static> {
    let mut lines = Vec::new();
    lines.push(Line::from(highlight_spans(
        &entry.title,
        regex,
        match_style(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        display_date(&entry.date),
        Style::default().fg(Color::DarkGray),
    )));
    if !entry.tech.is_empty() {
        let tags = entry
            .tech
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(Line::from(Span::styled(
            tags,
            Style::default().fg(Color::Green),
        )));
    }
    push_clipped_section(&mut lines, "Problem", &entry.problem, regex, preview_lines);
    push_clipped_section(&mut lines, "Notes", &entry.notes, regex, preview_lines);
    push_clipped_section(&mut lines, "Code", &entry.code, regex, preview_lines);
    Text::from(lines)
}

/// Appends a labeled section, clipped to `max_lines` lines of body text.
fn push_clipped_section(
    lines: &mut Vec<Line<'static>>,
    label: &'static str,
    body: &str,
    regex: Option<&Regex>,
    max_lines: usize,
) {
    if body.trim().is_empty() {
        return;
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        label,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let mut body_lines = body.lines();
    for line in body_lines.by_ref().take(max_lines) {
        lines.push(Line::from(highlight_spans(
            line,
            regex,
            match_style(),
            Style::default(),
        )));
    }
    if body_lines.next().is_some() {
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(Color::DarkGray),
        )));
    }
}

fn status_bar(state: &AppState) -> Paragraph<'static> {
    let shown = state.filtered().len();
    let total = state.entries.len();
    let mut summary = format!("{shown} of {total} entries");
    if let Some(message) = &state.status_message {
        summary.push_str("  |  ");
        summary.push_str(message);
    }
    let keys = if state.search_focused {
        "Enter keep filter | Esc clear | type to filter"
    } else {
        "/ search | ↑/↓ move | Enter open | n new | e edit | d delete | q quit"
    };
    let text = Text::from(vec![
        Line::from(Span::raw(summary)),
        Line::from(Span::styled(keys, Style::default().fg(Color::DarkGray))),
    ]);
    Paragraph::new(text).block(Block::default().borders(Borders::ALL))
}

fn draw_detail(frame: &mut Frame, state: &AppState, id: &str) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.size());

    let regex = build_highlight_regex(&highlight_tokens(&state.query));
    let body = match state.entries.iter().find(|entry| entry.id == id) {
        Some(entry) => detail_text(entry, regex.as_ref()),
        None => Text::from(Span::styled(
            "This entry no longer exists.",
            Style::default().fg(Color::Red),
        )),
    };
    frame.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Entry")),
        layout[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Esc back | e edit | d delete",
            Style::default().fg(Color::DarkGray),
        )),
        layout[1],
    );
}

fn detail_text(entry: &Entry, regex: Option<&Regex>) -> Text<'static> {
    let mut lines = Vec::new();
    lines.push(Line::from(highlight_spans(
        &entry.title,
        regex,
        match_style(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        display_date(&entry.date),
        Style::default().fg(Color::DarkGray),
    )));
    if !entry.tech.is_empty() {
        let tags = entry
            .tech
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(Line::from(Span::styled(
            tags,
            Style::default().fg(Color::Green),
        )));
    }
    push_section(&mut lines, "Problem", &entry.problem, regex);
    push_section(&mut lines, "Notes", &entry.notes, regex);
    push_section(&mut lines, "Code", &entry.code, regex);
    Text::from(lines)
}

fn push_section(
    lines: &mut Vec<Line<'static>>,
    label: &'static str,
    body: &str,
    regex: Option<&Regex>,
) {
    if body.trim().is_empty() {
        return;
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        label,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for line in body.lines() {
        lines.push(Line::from(highlight_spans(
            line,
            regex,
            match_style(),
            Style::default(),
        )));
    }
}

fn draw_form(frame: &mut Frame, form: &FormState) {
    let title = match form.mode {
        FormMode::Create => "New Entry",
        FormMode::Edit { .. } => "Edit Entry",
    };
    let outer = Block::default().borders(Borders::ALL).title(title);
    let inner = outer.inner(frame.size());
    frame.render_widget(outer, frame.size());

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(inner);

    for (field, area) in FormField::ORDER.into_iter().zip(layout.iter()) {
        let input = form.input(field);
        let focused = form.focused == field;
        let text = if focused {
            with_cursor(input)
        } else {
            input.value.clone()
        };
        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(text).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(field.label()),
            ),
            *area,
        );
    }

    let footer = match &form.error {
        Some(err) => Span::styled(err.clone(), Style::default().fg(Color::Red)),
        None => Span::styled(
            "Tab next field | Enter save (newline in Notes/Code) | Ctrl-s save | Esc cancel",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(footer), layout[6]);
}

/// Renders an input's value with an inline block cursor. The cursor sits on
/// a grapheme boundary, so inserting a char there is safe.
fn with_cursor(input: &FieldInput) -> String {
    let mut display = input.value.clone();
    display.insert(input.cursor, '▌');
    display
}

/// Splits text into styled spans around the query matches.
pub fn highlight_spans(
    text: &str,
    regex: Option<&Regex>,
    highlight: Style,
    base: Style,
) -> Vec<Span<'static>> {
    highlight_fragments(text, regex)
        .into_iter()
        .map(|fragment| {
            let style = if fragment.highlighted { highlight } else { base };
            Span::styled(fragment.text.to_string(), style)
        })
        .collect()
}

fn match_style() -> Style {
    Style::default().fg(Color::Black).bg(Color::Yellow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_texts(spans: &[Span<'_>]) -> Vec<String> {
        spans.iter().map(|span| span.content.to_string()).collect()
    }

    fn regex_for(query: &str) -> Option<Regex> {
        build_highlight_regex(&highlight_tokens(query))
    }

    #[test]
    fn highlight_spans_reconstruct_the_input() {
        let regex = regex_for("sql error");
        let spans = highlight_spans(
            "SQL gave an Error",
            regex.as_ref(),
            match_style(),
            Style::default(),
        );
        let joined: String = span_texts(&spans).concat();
        assert_eq!(joined, "SQL gave an Error");
        assert!(spans.iter().any(|span| span.style == match_style()));
    }

    #[test]
    fn highlight_spans_without_regex_yield_one_span() {
        let spans = highlight_spans("plain text", None, match_style(), Style::default());
        assert_eq!(span_texts(&spans), vec!["plain text"]);
        assert_eq!(spans[0].style, Style::default());
    }

    #[test]
    fn entry_line_pads_the_date_column() {
        let entry = Entry {
            id: "a".to_string(),
            date: "2024-06-15".to_string(),
            title: "Short".to_string(),
            problem: String::new(),
            tech: vec!["rust".to_string()],
            notes: String::new(),
            code: String::new(),
            created_at: 0,
            updated_at: 0,
        };
        let line = entry_line(&entry, None);
        let first = line.spans[0].content.to_string();
        assert_eq!(UnicodeWidthStr::width(first.as_str()), DATE_COLUMN);
        let joined: String = span_texts(&line.spans).concat();
        assert!(joined.contains("Short"));
        assert!(joined.contains("#rust"));
    }

    #[test]
    fn cursor_lands_inside_the_value() {
        let mut input = FieldInput::with_value("hello");
        input.move_home();
        input.move_right();
        assert_eq!(with_cursor(&input), "h▌ello");
        input.move_end();
        assert_eq!(with_cursor(&input), "hello▌");
    }

    #[test]
    fn preview_clips_long_bodies() {
        let entry = Entry {
            id: "a".to_string(),
            date: "2024-06-15".to_string(),
            title: "Title".to_string(),
            problem: String::new(),
            tech: Vec::new(),
            notes: "one\ntwo\nthree\nfour".to_string(),
            code: String::new(),
            created_at: 0,
            updated_at: 0,
        };
        let text = preview_text(&entry, None, 2);
        let rendered: Vec<String> = text
            .lines
            .iter()
            .map(|line| span_texts(&line.spans).concat())
            .collect();
        assert!(rendered.contains(&"two".to_string()));
        assert!(!rendered.contains(&"three".to_string()));
        assert!(rendered.contains(&"…".to_string()));
    }
}
