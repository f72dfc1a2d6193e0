//! A terminal developer diary: dated entries with a title, problem, tech
//! tags, notes, and a code snippet, stored in SQLite and browsed through a
//! searchable TUI or plain subcommands.

pub mod app;
pub mod buckets;
pub mod cli;
pub mod config;
pub mod entry;
pub mod highlight;
pub mod search;
pub mod store;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
