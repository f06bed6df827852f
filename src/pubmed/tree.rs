//! Generic XML document tree
//!
//! EFetch responses mix attributes, child elements and text under the same
//! parent, and the layout differs between document families. Rather than
//! deserializing into fixed structs, the XML is folded into an ordered
//! [`serde_json::Value`]:
//!
//! - attributes are stored under `@Name`
//! - text content of an element that also has attributes or children is stored
//!   under `#text`
//! - an element with only text collapses to a scalar
//! - repeated sibling elements collapse into an array
//! - element text that is a canonical decimal number becomes a JSON number

use std::borrow::Cow;
use std::sync::OnceLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

/// Key prefix for attributes
pub const ATTRIBUTE_PREFIX: &str = "@";

/// Key for element text content
pub const TEXT_KEY: &str = "#text";

/// Parsed XML document as a generic tree
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree(Value);

impl DocumentTree {
    /// Parse XML text, never failing
    ///
    /// Malformed input yields an empty tree, which downstream extraction
    /// treats as a document with no recognised fields.
    pub fn parse(xml: &str) -> Self {
        match build_tree(xml) {
            Ok(root) => Self(Value::Object(root)),
            Err(message) => {
                warn!(xml_size = xml.len(), "Malformed XML document: {}", message);
                Self::default()
            }
        }
    }

    pub fn root(&self) -> &Value {
        &self.0
    }

    /// Whether the tree holds no elements at all
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_none_or(Map::is_empty)
    }

    /// Follow `path` from the root, see [`lookup`]
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        lookup(&self.0, path)
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl From<Value> for DocumentTree {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Descend through nested objects by key
///
/// When a step lands on an array (a repeated element), the first entry is
/// used. Returns `None` as soon as a key is missing or a scalar is reached.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| first_entry(current).get(*key))
}

/// The first element of an array, or the value itself
pub fn first_entry(value: &Value) -> &Value {
    static NULL: Value = Value::Null;

    match value {
        Value::Array(items) => items.first().unwrap_or(&NULL),
        other => other,
    }
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(element: &BytesStart<'_>) -> Self {
        let mut fields = Map::new();
        for attr in element.attributes().flatten() {
            let key = format!(
                "{}{}",
                ATTRIBUTE_PREFIX,
                String::from_utf8_lossy(attr.key.as_ref())
            );
            let value = attr
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            fields.insert(key, Value::String(value));
        }

        Self {
            name: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
            fields,
            text: String::new(),
        }
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            scalar(text)
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert(TEXT_KEY.to_string(), scalar(text));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

fn build_tree(xml: &str) -> Result<Map<String, Value>, String> {
    let mut reader = Reader::from_str(xml);
    let mut root = Map::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Frame::open(e)),
            Ok(Event::Empty(ref e)) => {
                let (name, value) = Frame::open(e).close();
                insert_child(parent_fields(&mut stack, &mut root), name, value);
            }
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| "closing tag without opening tag".to_string())?;
                let (name, value) = frame.close();
                insert_child(parent_fields(&mut stack, &mut root), name, value);
            }
            Ok(Event::Text(ref e)) => {
                if let Some(frame) = stack.last_mut() {
                    match e.unescape() {
                        Ok(text) => frame.text.push_str(&text),
                        Err(_) => frame.text.push_str(&String::from_utf8_lossy(e)),
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
        }
    }

    if let Some(frame) = stack.last() {
        return Err(format!("unclosed element <{}>", frame.name));
    }

    debug!(top_level_elements = root.len(), "Built document tree");
    Ok(root)
}

fn parent_fields<'a>(
    stack: &'a mut [Frame],
    root: &'a mut Map<String, Value>,
) -> &'a mut Map<String, Value> {
    match stack.last_mut() {
        Some(frame) => &mut frame.fields,
        None => root,
    }
}

fn insert_child(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

/// Convert element text to a JSON scalar, turning canonical numbers into numbers
fn scalar(text: &str) -> Value {
    static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER_REGEX.get_or_init(|| {
        Regex::new(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?$").expect("Failed to compile number regex")
    });

    if re.is_match(text) {
        if let Ok(integer) = text.parse::<i64>() {
            return Value::Number(integer.into());
        }
        if !text.contains('.') {
            // Too large for i64; keep the digits intact
            return Value::String(text.to_string());
        }
        if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }

    Value::String(text.to_string())
}
