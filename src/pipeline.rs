//! The digest pipeline: read downloaded feed files, dedup by GUID, extract,
//! filter, render.
//!
//! Non-fatal conditions (a file that will not parse, per-field extraction
//! errors, duplicates, filtered-out events) flow through an injected
//! [`DiagnosticSink`] so callers decide where they go; [`TracingSink`] is the
//! production sink. Only failure to create the output file aborts the run.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};

use crate::config::Config;
use crate::digest;
use crate::event::{self, Event, ParseError};
use crate::feed;
use crate::fetch;

/// True when `guid` has been seen before; records it otherwise. First
/// occurrence wins across every file of a run. Empty or colliding GUIDs
/// over-suppress; that is feed data quality, not corrected here.
pub fn is_duplicate(guid: &str, seen: &mut HashSet<String>) -> bool {
    !seen.insert(guid.to_owned())
}

/// A non-fatal condition observed while collecting events.
#[derive(Debug)]
pub enum Diagnostic<'a> {
    ParseError {
        title: &'a str,
        city: &'a str,
        error: &'a ParseError,
    },
    DuplicateSkipped {
        title: &'a str,
        guid: &'a str,
    },
    FilteredOut {
        title: &'a str,
        city: &'a str,
        start_time_local: NaiveDateTime,
    },
    UnreadableFeed {
        path: &'a Path,
        error: &'a anyhow::Error,
    },
}

pub trait DiagnosticSink {
    fn record(&mut self, diagnostic: Diagnostic<'_>);
}

/// Forwards diagnostics to `tracing`, with enough context to find the
/// offending feed item.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&mut self, diagnostic: Diagnostic<'_>) {
        match diagnostic {
            Diagnostic::ParseError { title, city, error } => {
                tracing::error!(title, city, error = %error, "parse error");
            }
            Diagnostic::DuplicateSkipped { title, guid } => {
                tracing::debug!(title, guid, "skipping duplicate event");
            }
            Diagnostic::FilteredOut {
                title,
                city,
                start_time_local,
            } => {
                tracing::debug!(
                    title,
                    city,
                    start_time_local = %start_time_local.format("%a %Y-%m-%d %H:%M"),
                    "filtering out event"
                );
            }
            Diagnostic::UnreadableFeed { path, error } => {
                tracing::error!(path = %path.display(), error = %error, "could not read feed file");
            }
        }
    }
}

/// Read each feed file and run dedup -> extract -> filter, in file then feed
/// order. Missing or malformed files are reported and skipped.
pub fn collect_events(paths: &[PathBuf], sink: &mut dyn DiagnosticSink) -> Vec<Event> {
    let mut events = Vec::new();
    let mut seen_guids: HashSet<String> = HashSet::new();

    for path in paths {
        let parsed = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|xml| feed::parse_feed(&xml));
        let items = match parsed {
            Ok(items) => items,
            Err(error) => {
                sink.record(Diagnostic::UnreadableFeed {
                    path: path.as_path(),
                    error: &error,
                });
                continue;
            }
        };

        for item in items {
            if is_duplicate(&item.guid, &mut seen_guids) {
                sink.record(Diagnostic::DuplicateSkipped {
                    title: item.title.as_str(),
                    guid: item.guid.as_str(),
                });
                continue;
            }

            let event = event::extract(&item);
            for error in &event.parse_errors {
                sink.record(Diagnostic::ParseError {
                    title: event.title.as_str(),
                    city: event.city.as_str(),
                    error,
                });
            }

            if event::keep(&event) {
                events.push(event);
            } else {
                sink.record(Diagnostic::FilteredOut {
                    title: event.title.as_str(),
                    city: event.city.as_str(),
                    start_time_local: event.start_time_local,
                });
            }
        }
    }

    events
}

/// The `write` subcommand: collect events from the files the download step
/// produced and write the markdown digest.
pub fn run_write(config: &Config) -> Result<()> {
    let start = config.resolved_start_date(Local::now().date_naive())?;
    let jobs = fetch::build_jobs(config, start)?;
    let paths: Vec<PathBuf> = jobs.into_iter().map(|job| job.file_path).collect();

    let events = collect_events(&paths, &mut TracingSink);

    let file = File::create(&config.readme_path)
        .with_context(|| format!("creating digest file {}", config.readme_path.display()))?;
    let mut out = BufWriter::new(file);
    digest::render(&mut out, &events).context("writing digest")?;
    out.flush().context("flushing digest")?;

    tracing::info!(
        path = %config.readme_path.display(),
        events = events.len(),
        "wrote digest"
    );
    Ok(())
}
