//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Results
//! go to stdout, diagnostics to stderr. Formatting functions are pure so
//! they can be tested without capturing output.

use std::fmt::Display;

use chrono::{DateTime, Utc};

use crate::content::{AboutDocument, Guestbook};
use crate::pipeline::CommitOutcome;
use crate::store::BranchTip;

/// Abbreviation length for object ids.
const SHORT_ID: usize = 12;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a result (always shown; this is what the command was asked for).
pub fn print(message: impl Display) {
    println!("{}", message);
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a hint under an error (respects quiet mode).
pub fn hint(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("hint: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Format a branch tip.
pub fn format_tip(branch: &str, tip: &BranchTip) -> String {
    format!("{}\ncommit {}\ntree   {}", branch, tip.commit, tip.tree)
}

/// Format a successful commit.
pub fn format_outcome(outcome: &CommitOutcome) -> String {
    format!(
        "committed {} (parent {})",
        outcome.commit.short(SHORT_ID),
        outcome.parent.short(SHORT_ID)
    )
}

/// Format the about document the way it reads on the page.
pub fn format_about(doc: &AboutDocument) -> String {
    let mut out = format!("{}\n{}", doc.title, doc.description);
    if !doc.content.is_empty() {
        out.push_str("\n\n");
        out.push_str(doc.content.trim_end());
    }
    out
}

/// Format guestbook messages, one per line, oldest first.
pub fn format_guestbook(book: &Guestbook) -> String {
    if book.is_empty() {
        return "no messages yet".to_string();
    }
    book.messages()
        .iter()
        .map(|m| {
            format!(
                "{}  {:<16} {}",
                format_timestamp(&m.timestamp),
                m.nickname,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// RFC 3339 timestamps as UTC minutes; anything else as written.
fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}
