// src/lib.rs
// Public library surface for the CLI binary and integration tests.

pub mod config;
pub mod digest;
pub mod event;
pub mod feed;
pub mod fetch;
pub mod pipeline;

// ---- Re-exports for the common path through the pipeline ----
pub use crate::digest::{render, render_to_string};
pub use crate::event::{extract, keep, Event, ParseError};
pub use crate::feed::{parse_feed, sanitize, ExtensionNode, RawFeedItem};
pub use crate::pipeline::{collect_events, Diagnostic, DiagnosticSink, TracingSink};
