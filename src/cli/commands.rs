use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::app::{local_today, App};
use crate::buckets::{bucket_entries, Bucket};
use crate::config::AppConfig;
use crate::entry::{display_date, normalize_tech, now_for_form, Entry};
use crate::search::filter_entries;
use crate::store::{EntryFields, EntryStore};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Entry title; prompted for when omitted.
    pub title: Option<String>,

    /// Entry date, `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`. Defaults to now.
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long, default_value = "")]
    pub problem: String,

    /// Comma separated tech tags.
    #[arg(long, default_value = "")]
    pub tech: String,

    #[arg(long, default_value = "")]
    pub notes: String,

    /// Code snippet; piped stdin is used when this flag is omitted.
    #[arg(long)]
    pub code: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// How many entries to show. `0` lists everything.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Emit the entries as JSON instead of grouped text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Words to match against title, notes, code, and problem.
    pub query: Vec<String>,

    /// Emit the matches as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub id: String,

    /// Emit the entry as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub id: String,
}

pub fn run_tui(config: Arc<AppConfig>, store: EntryStore) -> Result<()> {
    let mut app = App::new(config, store);
    app.run()
}

pub fn run_new(store: &EntryStore, args: NewArgs) -> Result<()> {
    let title = match args.title {
        Some(title) => title,
        None => prompt("Title")?,
    };
    let code = match args.code {
        Some(code) => code,
        None => read_stdin()?.unwrap_or_default(),
    };
    let fields = EntryFields {
        date: args.date.unwrap_or_else(now_for_form),
        title,
        problem: args.problem,
        tech: normalize_tech(&args.tech),
        notes: args.notes,
        code,
    };
    let entry = store.create_entry(&fields)?;
    println!("Created entry {} ({})", entry.id, display_date(&entry.date));
    Ok(())
}

pub fn run_list(config: &AppConfig, store: &EntryStore, args: ListArgs) -> Result<()> {
    let limit = args
        .limit
        .or(Some(config.list_limit))
        .filter(|limit| *limit > 0);
    let entries = store.list_entries(limit)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    print!("{}", format_bucketed(&entries, local_today()));
    Ok(())
}

pub fn run_search(store: &EntryStore, args: SearchArgs) -> Result<()> {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        bail!("search needs a query");
    }
    let entries = store.list_entries(None)?;
    let matches = filter_entries(&entries, &query);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }
    print!("{}", format_search_results(&query, &matches));
    Ok(())
}

pub fn run_show(store: &EntryStore, args: ShowArgs) -> Result<()> {
    let entry = store.get_entry(&args.id)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }
    print!("{}", format_entry_full(&entry));
    Ok(())
}

pub fn run_delete(store: &EntryStore, args: DeleteArgs) -> Result<()> {
    store.delete_entry(&args.id)?;
    println!("Deleted entry {}", args.id);
    Ok(())
}

fn format_bucketed(entries: &[Entry], today: time::Date) -> String {
    let buckets = bucket_entries(entries.iter(), today);
    let mut out = String::new();
    for bucket in Bucket::ALL {
        let grouped = buckets.entries(bucket);
        if grouped.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{bucket}");
        for entry in grouped {
            let _ = writeln!(out, "  {}", format_entry_line(entry));
        }
    }
    if out.is_empty() {
        out.push_str("No entries.\n");
    }
    out
}

fn format_search_results(query: &str, matches: &[&Entry]) -> String {
    let mut out = String::new();
    if matches.is_empty() {
        let _ = writeln!(out, "No entries match \"{query}\".");
        return out;
    }
    let noun = if matches.len() == 1 { "entry" } else { "entries" };
    let _ = writeln!(out, "{} {noun} matching \"{query}\":", matches.len());
    for entry in matches {
        let _ = writeln!(out, "  {}", format_entry_line(entry));
    }
    out
}

fn format_entry_line(entry: &Entry) -> String {
    let mut line = format!("{}  {}", display_date(&entry.date), entry.title);
    if !entry.tech.is_empty() {
        let tags = entry
            .tech
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(line, "  {tags}");
    }
    let _ = write!(line, "  ({})", entry.id);
    line
}

fn format_entry_full(entry: &Entry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", entry.title);
    let _ = writeln!(out, "{}", display_date(&entry.date));
    if !entry.tech.is_empty() {
        let tags = entry
            .tech
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "{tags}");
    }
    for (label, body) in [
        ("Problem", &entry.problem),
        ("Notes", &entry.notes),
        ("Code", &entry.code),
    ] {
        if body.trim().is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{label}:");
        for line in body.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "id: {}", entry.id);
    out
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().context("flushing prompt")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading interactive input")?;
    Ok(line.trim().to_string())
}

/// Reads piped stdin, if any. A terminal stdin means nothing was piped.
fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading piped stdin")?;
    let trimmed = buffer.trim_end();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPaths;
    use crate::store;
    use tempfile::TempDir;
    use time::macros::date;

    fn setup_store() -> (TempDir, EntryStore) {
        let dir = TempDir::new().expect("temp dir");
        let paths = ConfigPaths {
            config_dir: dir.path().join("config"),
            config_file: dir.path().join("config").join("config.toml"),
            data_dir: dir.path().join("data"),
            database_path: dir.path().join("data").join("diary.db"),
        };
        let store = store::init(&paths, "default").expect("store init");
        (dir, store)
    }

    fn create(store: &EntryStore, date: &str, title: &str, notes: &str) -> Entry {
        store
            .create_entry(&EntryFields {
                date: date.to_string(),
                title: title.to_string(),
                problem: String::new(),
                tech: vec!["rust".to_string()],
                notes: notes.to_string(),
                code: String::new(),
            })
            .expect("create entry")
    }

    #[test]
    fn bucketed_listing_groups_by_recency() {
        let (_dir, store) = setup_store();
        create(&store, "2024-06-15", "today entry", "");
        create(&store, "2024-06-12", "this week", "");
        create(&store, "2024-05-01", "long ago", "");
        let entries = store.list_entries(None).expect("list");

        let out = format_bucketed(&entries, date!(2024 - 06 - 15));
        let today_at = out.find("Today").expect("today header");
        let week_at = out.find("Last 7 Days").expect("week header");
        let older_at = out.find("Older").expect("older header");
        assert!(today_at < week_at && week_at < older_at);
        assert!(out.contains("today entry"));
        assert!(out.contains("#rust"));
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(format_bucketed(&[], date!(2024 - 06 - 15)), "No entries.\n");
    }

    #[test]
    fn search_results_name_the_query() {
        let (_dir, store) = setup_store();
        create(&store, "2024-06-15", "fix borrow checker fight", "lifetimes");
        create(&store, "2024-06-14", "unrelated", "");
        let entries = store.list_entries(None).expect("list");

        let matches = filter_entries(&entries, "borrow");
        let out = format_search_results("borrow", &matches);
        assert!(out.starts_with("1 entry matching \"borrow\":"));
        assert!(out.contains("fix borrow checker fight"));
        assert!(!out.contains("unrelated"));

        let none = filter_entries(&entries, "zzz");
        assert_eq!(
            format_search_results("zzz", &none),
            "No entries match \"zzz\".\n"
        );
    }

    #[test]
    fn full_entry_prints_every_populated_section() {
        let (_dir, store) = setup_store();
        let mut fields = EntryFields {
            date: "2024-06-15T09:30".to_string(),
            title: "Title".to_string(),
            problem: "it broke".to_string(),
            tech: vec!["rust".to_string(), "sqlite".to_string()],
            notes: "line one\nline two".to_string(),
            code: String::new(),
        };
        let entry = store.create_entry(&fields).expect("create");

        let out = format_entry_full(&entry);
        assert!(out.starts_with("Title\n2024-06-15 @ 09:30\n#rust #sqlite\n"));
        assert!(out.contains("Problem:\n  it broke"));
        assert!(out.contains("Notes:\n  line one\n  line two"));
        assert!(!out.contains("Code:"));
        assert!(out.contains(&format!("id: {}", entry.id)));

        fields.code = "fn main() {}".to_string();
        let entry = store.create_entry(&fields).expect("create");
        assert!(format_entry_full(&entry).contains("Code:\n  fn main() {}"));
    }
}
