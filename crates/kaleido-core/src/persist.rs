//! Attribute-based parameter persistence.
//!
//! Patterns persist their parameters as attributes on a single named node.
//! The owning document hands a [`ParameterNode`] to the pattern when it
//! loads or saves its own tree; the pattern never touches files. Reads use a
//! read-with-default style so that partially written or older documents
//! still produce a drawable pattern.

use std::fmt::Display;

use log::warn;
use nalgebra::Vector3;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use thiserror::Error;

/// Errors converting parameter nodes to and from XML text.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Failed to write XML: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Document contains no element")]
    MissingElement,
}

/// A value that can be stored in a single attribute.
pub trait AttributeValue: Sized {
    fn to_attribute(&self) -> String;
    fn parse_attribute(text: &str) -> Option<Self>;
}

impl AttributeValue for f64 {
    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn parse_attribute(text: &str) -> Option<Self> {
        text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl AttributeValue for usize {
    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn parse_attribute(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl AttributeValue for bool {
    fn to_attribute(&self) -> String {
        self.to_string()
    }

    fn parse_attribute(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl AttributeValue for String {
    fn to_attribute(&self) -> String {
        self.clone()
    }

    fn parse_attribute(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}

/// Vectors are written as three comma-separated components: `"0,0,1"`.
impl AttributeValue for Vector3<f64> {
    fn to_attribute(&self) -> String {
        format!("{},{},{}", self.x, self.y, self.z)
    }

    fn parse_attribute(text: &str) -> Option<Self> {
        let components = text
            .split(',')
            .map(f64::parse_attribute)
            .collect::<Option<Vec<_>>>()?;
        match components.as_slice() {
            [x, y, z] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }
}

/// A named element with ordered string attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterNode {
    pub name: String,
    attributes: Vec<(String, String)>,
}

impl ParameterNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Raw attribute text, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set raw attribute text, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }

    pub fn write_attribute<T: AttributeValue>(&mut self, name: &str, value: &T) {
        self.set_attribute(name, value.to_attribute());
    }

    /// Read a typed attribute, falling back to `default` when it is absent
    /// or cannot be parsed.
    pub fn read_attribute_or<T>(&self, name: &str, default: T) -> T
    where
        T: AttributeValue + Display,
    {
        match self.attribute(name) {
            None => default,
            Some(text) => T::parse_attribute(text).unwrap_or_else(|| {
                warn!(
                    "Attribute {}.{}='{}' is malformed, using {}",
                    self.name, name, text, default
                );
                default
            }),
        }
    }

    /// Like [`read_attribute_or`](Self::read_attribute_or) for vectors.
    pub fn read_vector_or(&self, name: &str, default: Vector3<f64>) -> Vector3<f64> {
        match self.attribute(name) {
            None => default,
            Some(text) => Vector3::parse_attribute(text).unwrap_or_else(|| {
                warn!(
                    "Attribute {}.{}='{}' is not a vector, using {}",
                    self.name,
                    name,
                    text,
                    default.to_attribute()
                );
                default
            }),
        }
    }

    /// Serialise as a single empty XML element.
    pub fn to_xml(&self) -> Result<String, PersistError> {
        let mut writer = Writer::new(Vec::new());
        let mut element = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            element.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Empty(element))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Parse the first element of an XML document. Child content is ignored.
    pub fn from_xml(xml: &str) -> Result<Self, PersistError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Start(ref e) | Event::Empty(ref e) => return Self::from_element(e),
                Event::Eof => return Err(PersistError::MissingElement),
                _ => {}
            }
        }
    }

    fn from_element(element: &BytesStart) -> Result<Self, PersistError> {
        let mut node = Self::new(String::from_utf8_lossy(element.name().as_ref()));
        for attr in element.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_with_default() {
        let mut node = ParameterNode::new("OutlineGroup");
        node.write_attribute("Thickness", &2.5);
        assert_eq!(node.read_attribute_or("Thickness", 1.0), 2.5);
        assert_eq!(node.read_attribute_or("AngleThreshold", 35.0), 35.0);
    }

    #[test]
    fn test_malformed_value_uses_default() {
        let mut node = ParameterNode::new("ClonePattern");
        node.set_attribute("Spacing", "wide");
        node.set_attribute("Normal", "0,1");
        assert_eq!(node.read_attribute_or("Spacing", 1.0), 1.0);
        assert_eq!(node.read_vector_or("Normal", Vector3::z()), Vector3::z());
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut node = ParameterNode::new("ClonePattern");
        node.set_attribute("Type", "Mirror");
        node.set_attribute("Origin", "0,0,0");
        node.set_attribute("Type", "Linear");
        let keys: Vec<_> = node.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Type", "Origin"]);
        assert_eq!(node.attribute("Type"), Some("Linear"));
    }

    #[test]
    fn test_vector_attribute_format() {
        let v = Vector3::new(0.0, -1.5, 2.0);
        assert_eq!(v.to_attribute(), "0,-1.5,2");
        assert_eq!(Vector3::parse_attribute(" 0, -1.5 ,2 "), Some(v));
        assert_eq!(Vector3::<f64>::parse_attribute("1,2,NaN"), None);
    }

    #[test]
    fn test_xml_round_trip() {
        let mut node = ParameterNode::new("ClonePattern");
        node.set_attribute("Type", "Mirror");
        node.set_attribute("Label", "a<b & \"c\"");
        let xml = node.to_xml().unwrap();
        assert!(xml.starts_with("<ClonePattern "));
        assert_eq!(ParameterNode::from_xml(&xml).unwrap(), node);
    }

    #[test]
    fn test_from_xml_skips_declaration() {
        let xml = r#"<?xml version="1.0"?>
            <ClonePattern Type="Mirror" Normal="0,0,1"><Child/></ClonePattern>"#;
        let node = ParameterNode::from_xml(xml).unwrap();
        assert_eq!(node.name, "ClonePattern");
        assert_eq!(node.attribute("Normal"), Some("0,0,1"));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(matches!(
            ParameterNode::from_xml("   "),
            Err(PersistError::MissingElement)
        ));
    }
}
