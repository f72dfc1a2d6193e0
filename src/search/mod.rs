use crate::entry::Entry;

/// Minimum token length for highlight terms. Single characters match too
/// aggressively to be useful.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Filters entries by case-insensitive substring match against title, notes,
/// code, and problem. An empty or whitespace-only query keeps everything.
/// Input order is preserved.
pub fn filter_entries<'a>(entries: &'a [Entry], query: &str) -> Vec<&'a Entry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return entries.iter().collect();
    }
    entries
        .iter()
        .filter(|entry| entry_matches(entry, &needle))
        .collect()
}

fn entry_matches(entry: &Entry, needle: &str) -> bool {
    entry.title.to_lowercase().contains(needle)
        || entry.notes.to_lowercase().contains(needle)
        || entry.code.to_lowercase().contains(needle)
        || entry.problem.to_lowercase().contains(needle)
}

/// Splits a query into highlight tokens: whitespace-separated pieces with at
/// least [`MIN_TOKEN_CHARS`] characters.
pub fn highlight_tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}
