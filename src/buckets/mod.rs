use strum::Display;
use time::{Date, Duration};

use crate::entry::{Entry, EntryDate};

/// Age groups for the browse list. Week covers the six days before today;
/// anything outside that window, including unparseable or future-dated
/// entries, lands in Older.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    #[strum(to_string = "Today")]
    Today,
    #[strum(to_string = "Last 7 Days")]
    Week,
    #[strum(to_string = "Older")]
    Older,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Today, Bucket::Week, Bucket::Older];
}

#[derive(Debug, Default)]
pub struct BucketedEntries<'a> {
    pub today: Vec<&'a Entry>,
    pub week: Vec<&'a Entry>,
    pub older: Vec<&'a Entry>,
}

impl<'a> BucketedEntries<'a> {
    pub fn entries(&self, bucket: Bucket) -> &[&'a Entry] {
        match bucket {
            Bucket::Today => &self.today,
            Bucket::Week => &self.week,
            Bucket::Older => &self.older,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.today.is_empty() && self.week.is_empty() && self.older.is_empty()
    }
}

/// Assigns a bucket from the entry's calendar date relative to `today`.
pub fn bucket_for(entry: &Entry, today: Date) -> Bucket {
    let Some(parsed) = EntryDate::parse(&entry.date) else {
        return Bucket::Older;
    };
    let date = parsed.calendar_date();
    if date == today {
        return Bucket::Today;
    }
    if date <= today && date > today - Duration::days(7) {
        return Bucket::Week;
    }
    Bucket::Older
}

/// Partitions entries into buckets, preserving input order within each. Pure
/// in (entries, today); callers pass today from the local clock per render.
pub fn bucket_entries<'a, I>(entries: I, today: Date) -> BucketedEntries<'a>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut buckets = BucketedEntries::default();
    for entry in entries {
        match bucket_for(entry, today) {
            Bucket::Today => buckets.today.push(entry),
            Bucket::Week => buckets.week.push(entry),
            Bucket::Older => buckets.older.push(entry),
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn entry_dated(id: &str, date: &str) -> Entry {
        Entry {
            id: id.to_string(),
            date: date.to_string(),
            title: format!("entry {id}"),
            problem: String::new(),
            tech: Vec::new(),
            notes: String::new(),
            code: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    const TODAY: Date = date!(2024 - 06 - 15);

    #[test]
    fn same_day_goes_to_today() {
        let entry = entry_dated("a", "2024-06-15");
        assert_eq!(bucket_for(&entry, TODAY), Bucket::Today);
        let timed = entry_dated("b", "2024-06-15T23:59");
        assert_eq!(bucket_for(&timed, TODAY), Bucket::Today);
    }

    #[test]
    fn within_previous_six_days_goes_to_week() {
        assert_eq!(
            bucket_for(&entry_dated("a", "2024-06-12"), TODAY),
            Bucket::Week
        );
        // exactly six days back is still in the window
        assert_eq!(
            bucket_for(&entry_dated("b", "2024-06-09"), TODAY),
            Bucket::Week
        );
    }

    #[test]
    fn seven_or_more_days_back_goes_to_older() {
        assert_eq!(
            bucket_for(&entry_dated("a", "2024-06-08"), TODAY),
            Bucket::Older
        );
        assert_eq!(
            bucket_for(&entry_dated("b", "2023-01-01"), TODAY),
            Bucket::Older
        );
    }

    #[test]
    fn future_dates_go_to_older() {
        assert_eq!(
            bucket_for(&entry_dated("a", "2024-06-16"), TODAY),
            Bucket::Older
        );
    }

    #[test]
    fn unparseable_dates_go_to_older() {
        assert_eq!(
            bucket_for(&entry_dated("a", "last tuesday"), TODAY),
            Bucket::Older
        );
        assert_eq!(bucket_for(&entry_dated("b", ""), TODAY), Bucket::Older);
    }

    #[test]
    fn buckets_preserve_input_order() {
        let entries = vec![
            entry_dated("w1", "2024-06-10"),
            entry_dated("t1", "2024-06-15"),
            entry_dated("o1", "2024-05-01"),
            entry_dated("w2", "2024-06-14"),
            entry_dated("t2", "2024-06-15T08:00"),
        ];
        let buckets = bucket_entries(&entries, TODAY);
        let ids = |list: &[&Entry]| list.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&buckets.today), vec!["t1", "t2"]);
        assert_eq!(ids(&buckets.week), vec!["w1", "w2"]);
        assert_eq!(ids(&buckets.older), vec!["o1"]);
    }
}
