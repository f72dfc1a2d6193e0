use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use time::format_description::{self, FormatItem};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

static DATE_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[year]-[month]-[day]").expect("valid date format description")
});

static MINUTE_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[hour]:[minute]").expect("valid time format description")
});

static FORM_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[year]-[month]-[day]T[hour]:[minute]")
        .expect("valid date-time format description")
});

/// One diary entry as the rest of the crate sees it. The store owns `id`,
/// `created_at`, and `updated_at`; every other field comes from the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    /// Raw date string as stored: either `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`.
    /// Older entries carry the bare-date form, so both must parse.
    pub date: String,
    pub title: String,
    /// Added in a later schema revision; missing values load as empty text.
    pub problem: String,
    pub tech: Vec<String>,
    pub notes: String,
    pub code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An entry date at either of its two historical precisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDate {
    Day(Date),
    Minute(PrimitiveDateTime),
}

impl EntryDate {
    /// Parses a stored date string. Accepts a bare calendar date or a
    /// date-time; anything past minute precision is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some((day, clock)) = trimmed.split_once('T') {
            let date = Date::parse(day, &DATE_FORMAT).ok()?;
            let time = Time::parse(clock.get(..5)?, &MINUTE_FORMAT).ok()?;
            return Some(EntryDate::Minute(PrimitiveDateTime::new(date, time)));
        }
        Date::parse(trimmed, &DATE_FORMAT).ok().map(EntryDate::Day)
    }

    pub fn calendar_date(&self) -> Date {
        match self {
            EntryDate::Day(date) => *date,
            EntryDate::Minute(dt) => dt.date(),
        }
    }

    /// Display form: bare dates stay as-is, date-times render as
    /// `YYYY-MM-DD @ HH:MM`.
    pub fn display(&self) -> String {
        match self {
            EntryDate::Day(date) => date
                .format(&DATE_FORMAT)
                .unwrap_or_else(|_| date.to_string()),
            EntryDate::Minute(dt) => {
                let day = dt
                    .date()
                    .format(&DATE_FORMAT)
                    .unwrap_or_else(|_| dt.date().to_string());
                let clock = dt
                    .time()
                    .format(&MINUTE_FORMAT)
                    .unwrap_or_else(|_| dt.time().to_string());
                format!("{day} @ {clock}")
            }
        }
    }
}

/// Formats a raw stored date for display, falling back to the raw string when
/// it does not parse.
pub fn display_date(raw: &str) -> String {
    EntryDate::parse(raw)
        .map(|date| date.display())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Current local minute, formatted the way new-entry forms default their
/// date field. Falls back to UTC when the local offset is unavailable.
pub fn now_for_form() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
        .format(&FORM_FORMAT)
        .unwrap_or_else(|_| now.date().to_string())
}

/// Canonical tag normalization: split on commas, trim, drop empties.
/// Tolerates both storage shapes (one delimited string, or a sequence whose
/// items may themselves still contain commas).
pub fn normalize_tech(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn normalize_tech_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags = Vec::new();
    for item in items {
        tags.extend(normalize_tech(item.as_ref()));
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn parses_bare_date() {
        let parsed = EntryDate::parse("2024-01-15").expect("parse");
        assert_eq!(
            parsed.calendar_date(),
            Date::from_calendar_date(2024, Month::January, 15).unwrap()
        );
        assert_eq!(parsed.display(), "2024-01-15");
    }

    #[test]
    fn parses_minute_precision_datetime() {
        let parsed = EntryDate::parse("2024-01-15T09:30").expect("parse");
        assert_eq!(
            parsed.calendar_date(),
            Date::from_calendar_date(2024, Month::January, 15).unwrap()
        );
        assert_eq!(parsed.display(), "2024-01-15 @ 09:30");
    }

    #[test]
    fn tolerates_seconds_past_minute_precision() {
        let parsed = EntryDate::parse("2024-01-15T09:30:45").expect("parse");
        assert_eq!(parsed.display(), "2024-01-15 @ 09:30");
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(EntryDate::parse("not a date").is_none());
        assert!(EntryDate::parse("2024-13-01").is_none());
        assert!(EntryDate::parse("").is_none());
    }

    #[test]
    fn display_date_falls_back_to_raw() {
        assert_eq!(display_date("sometime last week"), "sometime last week");
    }

    #[test]
    fn normalize_tech_trims_and_drops_empties() {
        assert_eq!(
            normalize_tech(" Rust ,, sqlite,  ratatui ,"),
            vec!["Rust", "sqlite", "ratatui"]
        );
        assert!(normalize_tech(" , ,").is_empty());
    }

    #[test]
    fn normalize_tech_list_splits_nested_commas() {
        let tags = normalize_tech_list(["Rust, tokio", " serde "]);
        assert_eq!(tags, vec!["Rust", "tokio", "serde"]);
    }
}
