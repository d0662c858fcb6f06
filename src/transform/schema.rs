//! Schema engine: check an XML document against its schema and decode it into
//! a nested mapping.
//!
//! The mapping follows the usual XML-to-dict convention:
//!
//! | XML                               | Value                              |
//! |-----------------------------------|------------------------------------|
//! | `<a/>`                            | `null`                             |
//! | `<a>text</a>`                     | `"text"`                           |
//! | `<a id="x">text</a>`              | `{"@id": "x", "$": "text"}`        |
//! | `<a><b>1</b><b>2</b><c/></a>`     | `{"b": ["1", "2"], "c": null}`     |
//!
//! The document root itself is not wrapped: its content is the result.
//! Validation is limited to well-formedness and checking that the root element
//! is declared at the top level of the schema.

use super::error::TransformError;
use quick_xml::{
    Reader,
    escape::unescape,
    events::{BytesStart, Event},
};
use serde_json::{Map, Value};
use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str,
};

/// Key prefix for attribute-derived entries.
pub const ATTRIBUTE_PREFIX: char = '@';
/// Key for character data of elements that also carry attributes or children.
pub const TEXT_KEY: &str = "$";

/// Validates XML against a schema and decodes it.
pub trait SchemaEngine {
    fn decode(&self, file: &Path, schema: &Path) -> Result<Value, TransformError>;
}

/// [`SchemaEngine`] built on `quick-xml`.
///
/// Root declarations are read once per schema file and cached.
#[derive(Debug, Default)]
pub struct XmlSchemaEngine {
    roots: RefCell<HashMap<PathBuf, Vec<String>>>,
}

impl SchemaEngine for XmlSchemaEngine {
    fn decode(&self, file: &Path, schema: &Path) -> Result<Value, TransformError> {
        let roots = self.root_elements(schema)?;
        let content =
            fs::read_to_string(file).map_err(|err| TransformError::Io(file.to_path_buf(), err))?;

        let invalid = |reason: String| TransformError::SchemaValidation {
            file: file.to_path_buf(),
            schema: schema.to_path_buf(),
            reason,
        };

        let (name, value) = decode_document(&content).map_err(invalid)?;
        if !roots.contains(&name) {
            return Err(invalid(format!("root element `{name}` is not declared")));
        }
        Ok(value)
    }
}

impl XmlSchemaEngine {
    fn root_elements(&self, schema: &Path) -> Result<Vec<String>, TransformError> {
        if let Some(roots) = self.roots.borrow().get(schema) {
            return Ok(roots.clone());
        }

        let content = fs::read_to_string(schema)
            .map_err(|err| TransformError::Io(schema.to_path_buf(), err))?;
        let roots = parse_root_elements(&content)
            .map_err(|reason| TransformError::InvalidSchema(schema.to_path_buf(), reason))?;

        self.roots
            .borrow_mut()
            .insert(schema.to_path_buf(), roots.clone());
        Ok(roots)
    }
}

/// Names of the `element` declarations directly under the schema root.
fn parse_root_elements(content: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(content);
    let mut depth = 0usize;
    let mut roots = Vec::new();

    loop {
        match reader.read_event().map_err(|err| err.to_string())? {
            Event::Start(elem) => {
                if depth == 1 {
                    push_declared_name(&elem, &mut roots)?;
                }
                depth += 1;
            }
            Event::Empty(elem) if depth == 1 => push_declared_name(&elem, &mut roots)?,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    if roots.is_empty() {
        return Err("no top-level element declarations".into());
    }
    Ok(roots)
}

fn push_declared_name(elem: &BytesStart<'_>, roots: &mut Vec<String>) -> Result<(), String> {
    if elem.local_name().as_ref() != b"element" {
        return Ok(());
    }
    if let Some(attr) = elem.try_get_attribute("name").map_err(|err| err.to_string())? {
        let name = attr.unescape_value().map_err(|err| err.to_string())?;
        roots.push(name.into_owned());
    }
    Ok(())
}

/// Decode a whole document into its root name and content.
fn decode_document(content: &str) -> Result<(String, Value), String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<(String, Node)> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(|err| err.to_string())? {
            Event::Start(elem) => stack.push((element_name(&elem), Node::from_start(&elem)?)),
            Event::Empty(elem) => {
                let value = Node::from_start(&elem)?.finish();
                attach(&mut stack, &mut root, element_name(&elem), value)?;
            }
            Event::End(_) => {
                let (name, node) = stack.pop().ok_or("unexpected end tag")?;
                attach(&mut stack, &mut root, name, node.finish())?;
            }
            Event::Text(text) => {
                let raw = str::from_utf8(&text).map_err(|err| err.to_string())?;
                let text = unescape(raw).map_err(|err| err.to_string())?;
                push_text(&mut stack, &text);
            }
            Event::CData(data) => {
                push_text(&mut stack, str::from_utf8(&data).map_err(|err| err.to_string())?);
            }
            Event::GeneralRef(reference) => {
                let name = str::from_utf8(&reference).map_err(|err| err.to_string())?;
                let entity = format!("&{name};");
                let text = unescape(&entity).map_err(|err| err.to_string())?;
                push_text(&mut stack, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((name, _)) = stack.last() {
        return Err(format!("element `{name}` is not closed"));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn element_name(elem: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(elem.name().as_ref()).into_owned()
}

fn push_text(stack: &mut [(String, Node)], text: &str) {
    if let Some((_, node)) = stack.last_mut() {
        node.text.push_str(text);
    }
}

fn attach(
    stack: &mut [(String, Node)],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> Result<(), String> {
    match stack.last_mut() {
        Some((_, parent)) => parent.add_child(name, value),
        None if root.is_some() => return Err(format!("second root element `{name}`")),
        None => *root = Some((name, value)),
    }
    Ok(())
}

/// An element being decoded.
#[derive(Debug, Default)]
struct Node {
    attributes: Vec<(String, String)>,
    text: String,
    children: Map<String, Value>,
}

impl Node {
    fn from_start(elem: &BytesStart<'_>) -> Result<Self, String> {
        let mut node = Self::default();
        for attr in elem.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            node.attributes.push((key, value.into_owned()));
        }
        Ok(node)
    }

    /// Repeated child names collect into an array in document order.
    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn finish(self) -> Value {
        let text = self.text.trim();
        if self.attributes.is_empty() && self.children.is_empty() {
            return match text {
                "" => Value::Null,
                text => Value::String(text.to_owned()),
            };
        }

        let mut map = Map::new();
        for (key, value) in self.attributes {
            map.insert(format!("{ATTRIBUTE_PREFIX}{key}"), Value::String(value));
        }
        if !text.is_empty() {
            map.insert(TEXT_KEY.to_owned(), Value::String(text.to_owned()));
        }
        map.extend(self.children);
        Value::Object(map)
    }
}
