//! Markdown digest rendering: events grouped by date, then city, then start
//! time, with every level explicitly sorted so identical event sets render
//! byte-identically regardless of discovery order.

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::NaiveDate;

use crate::event::Event;

/// Render the digest. Assumes events are already deduplicated and filtered;
/// zero timestamps and empty cities render as-is (grouped under the epoch
/// date / the empty city heading).
pub fn render<W: Write>(w: &mut W, events: &[Event]) -> io::Result<()> {
    // BTreeMap keys give ascending dates and lexicographic cities for free;
    // the empty city sorts first.
    let mut grouped: BTreeMap<NaiveDate, BTreeMap<String, Vec<&Event>>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(event.start_time_local.date())
            .or_default()
            .entry(event.city.clone())
            .or_default()
            .push(event);
    }

    for (date, cities) in &mut grouped {
        writeln!(w, "# {}\n", date.format("%a %Y-%m-%d"))?;
        for (city, group) in cities.iter_mut() {
            writeln!(w, "## {city}\n")?;
            // Stable sort keeps feed order for same-minute events.
            group.sort_by_key(|event| event.start_time_local);
            for (i, event) in group.iter().enumerate() {
                if i > 0 {
                    writeln!(w, "---\n")?;
                }
                writeln!(
                    w,
                    "{} - {} [{}]({})\n",
                    event.start_time_local.format("%H:%M"),
                    event.end_time_local.format("%H:%M"),
                    event.title,
                    event.link
                )?;
                writeln!(w, "{}\n", event.description)?;
            }
        }
    }
    Ok(())
}

/// Convenience for tests and callers that want the digest as a string.
pub fn render_to_string(events: &[Event]) -> String {
    let mut buf = Vec::new();
    render(&mut buf, events).expect("writing to a Vec cannot fail");
    String::from_utf8(buf).expect("render emits utf-8")
}
