//! RSS parsing for BiblioCommons-style event feeds.
//!
//! The interesting data lives in a vendor extension namespace (`bc:` prefixed
//! elements on each `<item>`), so this parser keeps the base RSS fields and
//! collects every prefixed element into a typed tree of [`ExtensionNode`]s
//! keyed by namespace prefix and element name. Nothing here interprets the
//! extension data; that is `event::extract`'s job.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

/// Extension elements of one namespace on one item, keyed by local element
/// name. Elements may repeat, hence the `Vec`.
pub type ExtensionMap = HashMap<String, Vec<ExtensionNode>>;

/// One extension element: its text content plus nested child elements keyed
/// by local name. The feeds only nest one level deep (`location` > `city`),
/// but the tree is generic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionNode {
    pub value: String,
    pub children: HashMap<String, Vec<ExtensionNode>>,
}

/// One `<item>` as it appears in the feed, before extraction.
#[derive(Debug, Clone, Default)]
pub struct RawFeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub guid: String,
    /// Namespace prefix (e.g. "bc") -> element name -> nodes.
    pub extensions: HashMap<String, ExtensionMap>,
}

/// Parse a feed document into its items, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawFeedItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    loop {
        match reader.read_event().context("parsing feed xml")? {
            XmlEvent::Start(e) if e.name().local_name().into_inner() == b"item" => {
                items.push(read_item(&mut reader)?);
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }
    Ok(items)
}

fn read_item(reader: &mut Reader<&[u8]>) -> Result<RawFeedItem> {
    let mut item = RawFeedItem::default();
    loop {
        match reader.read_event().context("parsing feed item")? {
            XmlEvent::Start(e) => {
                let name = e.name();
                match name.prefix() {
                    Some(prefix) => {
                        let namespace =
                            String::from_utf8_lossy(prefix.into_inner()).into_owned();
                        let key =
                            String::from_utf8_lossy(name.local_name().into_inner()).into_owned();
                        let node = read_node(reader)?;
                        item.extensions
                            .entry(namespace)
                            .or_default()
                            .entry(key)
                            .or_default()
                            .push(node);
                    }
                    None => {
                        // Unknown base elements still get consumed so the
                        // event stream stays balanced.
                        let value = read_node(reader)?.value;
                        match name.local_name().into_inner() {
                            b"title" => item.title = value,
                            b"link" => item.link = value,
                            b"description" => item.description = value,
                            b"guid" => item.guid = value,
                            _ => {}
                        }
                    }
                }
            }
            XmlEvent::Empty(e) => {
                let name = e.name();
                if let Some(prefix) = name.prefix() {
                    let namespace = String::from_utf8_lossy(prefix.into_inner()).into_owned();
                    let key =
                        String::from_utf8_lossy(name.local_name().into_inner()).into_owned();
                    item.extensions
                        .entry(namespace)
                        .or_default()
                        .entry(key)
                        .or_default()
                        .push(ExtensionNode::default());
                }
            }
            XmlEvent::End(_) => break,
            XmlEvent::Eof => bail!("unexpected end of document inside <item>"),
            _ => {}
        }
    }
    Ok(item)
}

/// Read the subtree of the element just opened into an [`ExtensionNode`].
/// Text and CDATA accumulate into `value`; child elements recurse.
fn read_node(reader: &mut Reader<&[u8]>) -> Result<ExtensionNode> {
    let mut node = ExtensionNode::default();
    loop {
        match reader.read_event().context("parsing feed element")? {
            XmlEvent::Start(e) => {
                let key =
                    String::from_utf8_lossy(e.name().local_name().into_inner()).into_owned();
                let child = read_node(reader)?;
                node.children.entry(key).or_default().push(child);
            }
            XmlEvent::Empty(e) => {
                let key =
                    String::from_utf8_lossy(e.name().local_name().into_inner()).into_owned();
                node.children.entry(key).or_default().push(ExtensionNode::default());
            }
            XmlEvent::Text(t) => {
                // Feeds occasionally carry stray HTML entities the XML layer
                // refuses; fall back to the raw bytes and let `sanitize`
                // decode them.
                match t.unescape() {
                    Ok(text) => node.value.push_str(&text),
                    Err(_) => node.value.push_str(&String::from_utf8_lossy(&t)),
                }
            }
            XmlEvent::CData(t) => node.value.push_str(&String::from_utf8_lossy(&t)),
            XmlEvent::End(_) => break,
            XmlEvent::Eof => bail!("unexpected end of document inside element"),
            _ => {}
        }
    }
    node.value = node.value.trim().to_string();
    Ok(node)
}

/// Strip markup from a free-text feed field, collapsing to trimmed plain
/// text: HTML entity decode, drop tags, collapse whitespace.
pub fn sanitize(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}
