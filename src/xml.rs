//! # XML Response Decoding
//!
//! Converts the player's XML answers into `serde_json::Value` trees that the
//! path expressions in [`crate::query_path`] can walk:
//!
//! - the document becomes `{root_name: element}`
//! - attributes become plain keys (`<art artistid="7">` → `"artistid": "7"`)
//! - repeated child elements become arrays, single ones stay objects
//! - an element with only text becomes a string, an empty one becomes `null`
//! - text next to attributes or children is stored under `"#text"`
//!
//! ```
//! let doc = blue::xml::parse(r#"<status etag="1"><volume>30</volume></status>"#)?;
//! assert_eq!(doc["status"]["volume"], "30");
//! assert_eq!(doc["status"]["etag"], "1");
//! # Ok::<(), blue::xml::XmlError>(())
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which mixed-content text is stored.
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("invalid XML: {0}")]
    Syntax(String),
    #[error("document has no root element")]
    Empty,
    #[error("closing tag without a matching opening tag")]
    Unbalanced,
}

/// Element under construction.
struct Node {
    name: String,
    attrs: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::Syntax(e.to_string()))?
                .into_owned();
            attrs.insert(key, Value::String(value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        if self.attrs.is_empty() && self.children.is_empty() {
            let value = if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
            return (self.name, value);
        }

        let mut object = self.attrs;
        for (name, child) in self.children {
            match object.remove(&name) {
                None => {
                    object.insert(name, child);
                }
                Some(Value::Array(mut items)) => {
                    items.push(child);
                    object.insert(name, Value::Array(items));
                }
                Some(existing) => {
                    object.insert(name, Value::Array(vec![existing, child]));
                }
            }
        }
        if !text.is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(object))
    }
}

/// Decode an XML document.
///
/// # Errors
///
/// [`XmlError`] for syntax errors, unbalanced tags or a document without a
/// root element.
pub fn parse(body: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Syntax(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(start) => stack.push(Node::open(&start)?),
            Event::Empty(start) => {
                let finished = Node::open(&start)?.close();
                attach(&mut stack, &mut root, finished);
            }
            Event::End(_) => {
                let node = stack.pop().ok_or(XmlError::Unbalanced)?;
                attach(&mut stack, &mut root, node.close());
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| XmlError::Syntax(e.to_string()))?;
                    node.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Syntax("document ended inside an element".to_string()));
    }

    let (name, value) = root.ok_or(XmlError::Empty)?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn attach(stack: &mut [Node], root: &mut Option<(String, Value)>, finished: (String, Value)) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(finished),
        None => {
            if root.is_none() {
                *root = Some(finished);
            }
        }
    }
}

/// Deserialize an XML-derived field into a `String`, accepting missing
/// values and numbers. Everything the player sends is text; absent
/// elements decode to `null`.
///
/// # Errors
///
/// Only for nested objects or arrays where a scalar was expected.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!("expected text, found {other}"))),
    }
}
