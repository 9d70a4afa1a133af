// tests/pipeline_e2e.rs
// Feed files on disk -> collect_events -> rendered markdown digest.

use std::fs;
use std::path::PathBuf;

use toddler_events::pipeline::{collect_events, Diagnostic, DiagnosticSink};
use toddler_events::render_to_string;

#[derive(Default)]
struct CollectingSink {
    parse_errors: Vec<(String, String)>,
    duplicates: Vec<String>,
    filtered: Vec<String>,
    unreadable: usize,
}

impl DiagnosticSink for CollectingSink {
    fn record(&mut self, diagnostic: Diagnostic<'_>) {
        match diagnostic {
            Diagnostic::ParseError { title, error, .. } => {
                self.parse_errors.push((title.to_string(), error.to_string()));
            }
            Diagnostic::DuplicateSkipped { title, .. } => self.duplicates.push(title.to_string()),
            Diagnostic::FilteredOut { title, .. } => self.filtered.push(title.to_string()),
            Diagnostic::UnreadableFeed { .. } => self.unreadable += 1,
        }
    }
}

fn item(title: &str, link: &str, guid: &str, start: &str, end: &str, city: &str, desc: &str) -> String {
    format!(
        r#"<item>
  <title>{title}</title>
  <link>{link}</link>
  <description>{desc}</description>
  <guid isPermaLink="false">{guid}</guid>
  <bc:start_date_local>{start}</bc:start_date_local>
  <bc:end_date_local>{end}</bc:end_date_local>
  <bc:location>
    <bc:city>{city}</bc:city>
  </bc:location>
</item>"#
    )
}

fn feed(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:bc="https://bibliocommons.com/rss/extensions">
<channel>
<title>Library Events</title>
{}
</channel>
</rss>"#,
        items.join("\n")
    )
}

#[test]
fn two_pages_to_digest() {
    let dir = tempfile::tempdir().unwrap();

    // Page one: out of time order on purpose, plus a weekday-morning event
    // and an item with no vendor extension block.
    let page1 = feed(&[
        item(
            "Evening Surf",
            "https://events.example/surf",
            "g-surf",
            "2025-01-11T14:30",
            "2025-01-11T17:00",
            "Half Moon Bay",
            "Bring a wetsuit",
        ),
        item(
            "Morning Yoga",
            "https://events.example/yoga",
            "g-yoga",
            "2025-01-11T10:00",
            "2025-01-11T11:00",
            "Half Moon Bay",
            "&lt;p&gt;Stretch and breathe&lt;/p&gt;",
        ),
        item(
            "Weekday Lunch",
            "https://events.example/lunch",
            "g-lunch",
            "2025-01-13T12:00",
            "2025-01-13T13:00",
            "Half Moon Bay",
            "Not for us",
        ),
        r#"<item>
  <title>Mystery Meetup</title>
  <link>https://events.example/mystery</link>
  <description>No details</description>
  <guid>g-mystery</guid>
</item>"#
            .to_string(),
    ]);

    // Page two repeats Morning Yoga under the same GUID.
    let page2 = feed(&[
        item(
            "Morning Yoga",
            "https://events.example/yoga",
            "g-yoga",
            "2025-01-11T10:00",
            "2025-01-11T11:00",
            "Half Moon Bay",
            "repeat listing",
        ),
        item(
            "Cooking Class",
            "https://events.example/cooking",
            "g-cook",
            "2025-01-12T09:00",
            "2025-01-12T11:00",
            "San Francisco",
            "Kid-friendly recipes",
        ),
    ]);

    let p1 = dir.path().join("tmp_rss_smcl_1.rss");
    let p2 = dir.path().join("tmp_rss_smcl_2.rss");
    fs::write(&p1, page1).unwrap();
    fs::write(&p2, page2).unwrap();

    let mut sink = CollectingSink::default();
    let events = collect_events(&[p1, p2], &mut sink);

    let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Evening Surf", "Morning Yoga", "Cooking Class"]);

    assert_eq!(sink.duplicates, vec!["Morning Yoga".to_string()]);
    // Weekday Lunch fails the filter; Mystery Meetup has a zero start time
    // and falls out the same way.
    assert_eq!(
        sink.filtered,
        vec!["Weekday Lunch".to_string(), "Mystery Meetup".to_string()]
    );
    assert_eq!(sink.parse_errors.len(), 1);
    assert_eq!(sink.parse_errors[0].0, "Mystery Meetup");
    assert!(sink.parse_errors[0].1.contains("extension block"));
    assert_eq!(sink.unreadable, 0);

    let digest = render_to_string(&events);
    let expected = "\
# Sat 2025-01-11

## Half Moon Bay

10:00 - 11:00 [Morning Yoga](https://events.example/yoga)

Stretch and breathe

---

14:30 - 17:00 [Evening Surf](https://events.example/surf)

Bring a wetsuit

# Sun 2025-01-12

## San Francisco

09:00 - 11:00 [Cooking Class](https://events.example/cooking)

Kid-friendly recipes

";
    assert_eq!(digest, expected);
}

#[test]
fn missing_file_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("tmp_rss_smcl_1.rss");
    fs::write(
        &present,
        feed(&[item(
            "Morning Yoga",
            "https://events.example/yoga",
            "g-yoga",
            "2025-01-11T10:00",
            "2025-01-11T11:00",
            "Half Moon Bay",
            "desc",
        )]),
    )
    .unwrap();
    let missing: PathBuf = dir.path().join("tmp_rss_smcl_2.rss");

    let mut sink = CollectingSink::default();
    let events = collect_events(&[missing, present], &mut sink);

    assert_eq!(sink.unreadable, 1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Morning Yoga");
}

#[test]
fn unparseable_file_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("tmp_rss_smcl_1.rss");
    fs::write(&bad, "<rss><channel><item></rss>").unwrap();

    let mut sink = CollectingSink::default();
    let events = collect_events(&[bad], &mut sink);

    assert_eq!(sink.unreadable, 1);
    assert!(events.is_empty());
}
