//! Absence-tolerant lookups over heterogeneous response trees.
//!
//! JSON bodies are read as [`serde_json::Value`]; XML bodies are converted
//! into the same shape by [`xml_to_value`] so every source walks its payload
//! with the same helpers:
//!
//! - element names lose their namespace prefix (`opensearch:totalResults`
//!   becomes `totalResults`),
//! - attributes become `"@name"` keys,
//! - text next to attributes or child elements becomes `"#text"`,
//! - a text-only element collapses to a string, an empty one to `null`,
//! - repeated children become an array.
//!
//! A missing key is `None`, never an error.

use crate::error::SourceError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

/// Walk `path` from `root`. Returns `None` as soon as a key is absent.
///
/// A numeric path segment indexes into an array.
pub fn at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| match node {
        Value::Object(map) => map.get(*key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Treat a node as a list: arrays yield their items, `null` or absent yields
/// nothing, any other value is a list of one.
///
/// XML converted by [`xml_to_value`] only becomes an array when an element is
/// repeated, so a single `<entry>` must be read through this.
pub fn as_list(node: Option<&Value>) -> Vec<&Value> {
    match node {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Text content of a node: a string, an element's `"#text"`, or a number.
pub fn text(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("#text").and_then(text),
        _ => None,
    }
}

/// Non-blank, trimmed text at `path`.
pub fn str_at(root: &Value, path: &[&str]) -> Option<String> {
    at(root, path)
        .and_then(text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Unsigned integer at `path`, whether stored as a number or as text.
pub fn u64_at(root: &Value, path: &[&str]) -> Option<u64> {
    let node = at(root, path)?;
    node.as_u64().or_else(|| text(node)?.trim().parse().ok())
}

/// Parse an XML document into a [`Value`] tree rooted at the document
/// element's local name.
pub fn xml_to_value(xml: &str) -> Result<Value, SourceError> {
    let mut reader = Reader::from_str(xml);

    // Open elements: (local name, attributes and children, accumulated text).
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root = Map::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SourceError::Xml(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                let (name, attrs) = open_element(&e)?;
                stack.push((name, attrs, String::new()));
            }
            Event::Empty(e) => {
                let (name, attrs) = open_element(&e)?;
                let node = finish_element(attrs, String::new());
                insert_child(stack.last_mut().map(|f| &mut f.1).unwrap_or(&mut root), name, node);
            }
            Event::End(_) => {
                let (name, attrs, text) = stack
                    .pop()
                    .ok_or_else(|| SourceError::Xml("unbalanced closing tag".to_string()))?;
                let node = finish_element(attrs, text);
                insert_child(stack.last_mut().map(|f| &mut f.1).unwrap_or(&mut root), name, node);
            }
            // Entity references arrive as separate events, so text is kept
            // untrimmed here and trimmed once the element closes.
            Event::Text(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.2.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.2.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(frame) = stack.last_mut() {
                    let entity = format!("&{};", String::from_utf8_lossy(&e));
                    let resolved = quick_xml::escape::unescape(&entity)
                        .map_err(|e| SourceError::Xml(e.to_string()))?;
                    frame.2.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SourceError::Xml("document ended inside an element".to_string()));
    }
    if root.is_empty() {
        return Err(SourceError::Xml("document has no root element".to_string()));
    }
    Ok(Value::Object(root))
}

fn open_element(e: &BytesStart<'_>) -> Result<(String, Map<String, Value>), SourceError> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Map::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SourceError::Xml(e.to_string()))?;
        let key = attr.key.local_name();
        let key = String::from_utf8_lossy(key.as_ref());
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|e| SourceError::Xml(e.to_string()))?
            .into_owned();
        attrs.insert(format!("@{key}"), Value::String(value));
    }
    Ok((name, attrs))
}

fn finish_element(mut attrs: Map<String, Value>, text: String) -> Value {
    let text = text.trim();
    if attrs.is_empty() {
        return if text.is_empty() {
            Value::Null
        } else {
            Value::String(text.to_string())
        };
    }
    if !text.is_empty() {
        attrs.insert("#text".to_string(), Value::String(text.to_string()));
    }
    Value::Object(attrs)
}

fn insert_child(parent: &mut Map<String, Value>, name: String, node: Value) {
    match parent.get_mut(&name) {
        None => {
            parent.insert(name, node);
        }
        Some(Value::Array(items)) => items.push(node),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, node]);
        }
    }
}
