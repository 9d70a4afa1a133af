//! Typed event extraction from raw feed items, plus the keep/drop filter.
//!
//! Extraction never fails outright: feeds are third-party and routinely miss
//! fields (all-day events have no timed start/end, some branches omit the
//! city), so each failed sub-extraction is recorded on the event and the
//! affected field stays at its zero value. Callers report the errors and the
//! event remains usable downstream.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use thiserror::Error;

use crate::feed::{sanitize, ExtensionMap, RawFeedItem};

/// Namespace prefix carrying the vendor event data.
pub const VENDOR_NAMESPACE: &str = "bc";

const START_TIME_KEY: &str = "start_date_local";
const END_TIME_KEY: &str = "end_date_local";

/// Timestamps in the feed are local wall-clock with no offset.
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A sub-extraction failure. Advisory: events carrying these are still
/// rendered, with the affected fields zeroed/empty.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("no \"bc\" extension block")]
    MissingNamespace,
    #[error("missing element {key:?}")]
    MissingField { key: &'static str },
    #[error("expected exactly one {key:?} element, found {count}")]
    Cardinality { key: &'static str, count: usize },
    #[error("could not parse {key:?} value {value:?}: {source}")]
    BadTimestamp {
        key: &'static str,
        value: String,
        source: chrono::ParseError,
    },
    #[error("could not find location")]
    MissingLocation,
    #[error("could not find city")]
    MissingCity,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub title: String,
    /// Plain text, markup stripped and trimmed.
    pub description: String,
    pub link: String,
    /// Zero (Unix epoch) when the feed carried no parseable start time.
    pub start_time_local: NaiveDateTime,
    pub end_time_local: NaiveDateTime,
    /// Empty when not resolvable from the location block.
    pub city: String,
    /// Dedup key only; uniqueness is the pipeline's concern, not this type's.
    pub guid: String,
    pub parse_errors: Vec<ParseError>,
}

fn parse_local_time(block: &ExtensionMap, key: &'static str) -> Result<NaiveDateTime, ParseError> {
    let nodes = block.get(key).ok_or(ParseError::MissingField { key })?;
    if nodes.len() != 1 {
        return Err(ParseError::Cardinality {
            key,
            count: nodes.len(),
        });
    }
    NaiveDateTime::parse_from_str(&nodes[0].value, LOCAL_TIME_FORMAT).map_err(|source| {
        ParseError::BadTimestamp {
            key,
            value: nodes[0].value.clone(),
            source,
        }
    })
}

/// Build an [`Event`] from a raw item, accumulating per-field failures into
/// `parse_errors` instead of returning an error.
pub fn extract(item: &RawFeedItem) -> Event {
    let mut event = Event {
        title: item.title.clone(),
        description: sanitize(&item.description),
        link: item.link.clone(),
        start_time_local: NaiveDateTime::default(),
        end_time_local: NaiveDateTime::default(),
        city: String::new(),
        guid: item.guid.clone(),
        parse_errors: Vec::new(),
    };

    let Some(block) = item.extensions.get(VENDOR_NAMESPACE) else {
        // Every other sub-extraction reads this block, so stop here.
        event.parse_errors.push(ParseError::MissingNamespace);
        return event;
    };

    match parse_local_time(block, START_TIME_KEY) {
        Ok(t) => event.start_time_local = t,
        Err(e) => event.parse_errors.push(e),
    }
    match parse_local_time(block, END_TIME_KEY) {
        Ok(t) => event.end_time_local = t,
        Err(e) => event.parse_errors.push(e),
    }

    match block.get("location") {
        Some(locations) if locations.len() == 1 => {
            match locations[0].children.get("city") {
                Some(cities) if cities.len() == 1 => event.city = cities[0].value.clone(),
                _ => event.parse_errors.push(ParseError::MissingCity),
            }
        }
        _ => event.parse_errors.push(ParseError::MissingLocation),
    }

    event
}

/// Keep events a working parent can actually attend: any weekend start, or a
/// weekday start at 17:00 or later.
///
/// A zero start time (failed extraction) is evaluated like real data, which
/// means such events are dropped (epoch is a Thursday morning). Inherited
/// behavior; see DESIGN.md.
pub fn keep(event: &Event) -> bool {
    let weekday = event.start_time_local.weekday();
    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return true;
    }
    event.start_time_local.hour() >= 17
}
