use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

/// One piece of a highlighted text. Concatenating fragment texts in order
/// reproduces the original string byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub highlighted: bool,
}

/// Compiles the qualifying query tokens into one case-insensitive alternation.
/// Tokens are escaped literally, deduplicated case-insensitively, and sorted
/// longest first so overlapping candidates prefer the longer match.
pub fn build_highlight_regex(tokens: &[String]) -> Option<Regex> {
    if tokens.is_empty() {
        return None;
    }
    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let lowered = token.to_lowercase();
        if seen.insert(lowered) {
            unique.push(token.clone());
        }
    }
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = unique
        .into_iter()
        .map(|token| regex::escape(&token))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into highlighted and plain fragments by left-to-right
/// non-overlapping matches. With no regex the whole text is one plain
/// fragment.
pub fn highlight_fragments<'a>(text: &'a str, regex: Option<&Regex>) -> Vec<Fragment<'a>> {
    let Some(regex) = regex else {
        return vec![Fragment {
            text,
            highlighted: false,
        }];
    };
    let mut fragments = Vec::new();
    let mut cursor = 0usize;
    for found in regex.find_iter(text) {
        if found.start() > cursor {
            fragments.push(Fragment {
                text: &text[cursor..found.start()],
                highlighted: false,
            });
        }
        fragments.push(Fragment {
            text: found.as_str(),
            highlighted: true,
        });
        cursor = found.end();
    }
    if cursor < text.len() || fragments.is_empty() {
        fragments.push(Fragment {
            text: &text[cursor..],
            highlighted: false,
        });
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(fragments: &[Fragment<'_>]) -> String {
        fragments.iter().map(|f| f.text).collect()
    }

    #[test]
    fn prefers_longer_tokens_first() {
        let regex = build_highlight_regex(&["not".into(), "note".into()]).expect("regex");
        let matches: Vec<_> = regex.find_iter("notebook").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["note"]);
    }

    #[test]
    fn deduplicates_case_insensitive_tokens() {
        let regex =
            build_highlight_regex(&["Rust".into(), "rust".into(), "RUST".into()]).expect("regex");
        let matches: Vec<_> = regex.find_iter("rust").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["rust"]);
    }

    #[test]
    fn tokens_match_literally_not_as_regex() {
        let regex = build_highlight_regex(&["a+b".into()]).expect("regex");
        assert!(regex.is_match("value a+b here"));
        assert!(!regex.is_match("aab"));
    }

    #[test]
    fn no_tokens_yields_single_plain_fragment() {
        let fragments = highlight_fragments("some text", None);
        assert_eq!(
            fragments,
            vec![Fragment {
                text: "some text",
                highlighted: false
            }]
        );
    }

    #[test]
    fn fragments_reconstruct_input_exactly() {
        let regex = build_highlight_regex(&["err".into(), "io".into()]).expect("regex");
        let text = "IO error: err while reading; no further errors";
        let fragments = highlight_fragments(text, Some(&regex));
        assert_eq!(rebuild(&fragments), text);
        assert!(fragments.iter().any(|f| f.highlighted));
    }

    #[test]
    fn matches_are_case_insensitive_but_preserve_source_case() {
        let regex = build_highlight_regex(&["sql".into()]).expect("regex");
        let fragments = highlight_fragments("SQLite and sql", Some(&regex));
        let highlighted: Vec<_> = fragments
            .iter()
            .filter(|f| f.highlighted)
            .map(|f| f.text)
            .collect();
        assert_eq!(highlighted, vec!["SQL", "sql"]);
        assert_eq!(rebuild(&fragments), "SQLite and sql");
    }

    #[test]
    fn text_without_matches_is_one_plain_fragment() {
        let regex = build_highlight_regex(&["zzz".into()]).expect("regex");
        let fragments = highlight_fragments("nothing here", Some(&regex));
        assert_eq!(fragments.len(), 1);
        assert!(!fragments[0].highlighted);
        assert_eq!(rebuild(&fragments), "nothing here");
    }
}
