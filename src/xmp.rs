//! XMP packet flattening.
//!
//! An XMP packet is RDF/XML. For lookup purposes it is flattened into a list
//! of `(qualified name, value)` pairs, covering both serializations:
//!
//! ```xml
//! <rdf:Description xmp:CreatorTool="Gemini"/>
//! <rdf:Description><xmp:CreatorTool>Gemini</xmp:CreatorTool></rdf:Description>
//! ```
//!
//! Array items (`rdf:Bag`, `rdf:Seq`, `rdf:Alt`) become one pair each under
//! the enclosing property name.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

/// One flattened XMP property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpField {
    pub name: String,
    pub value: String,
}

/// A raw XMP packet and its flattened properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPacket {
    pub xml: String,
    pub fields: Vec<XmpField>,
}

impl XmpPacket {
    pub fn parse(xml: String) -> Self {
        let fields = flatten(&xml);
        Self { xml, fields }
    }

    /// First value for a qualified name such as `xmp:CreatorTool`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Every value for a qualified name, in document order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// First value among several candidate names.
    pub fn find(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|n| self.get(n))
    }
}

fn is_structural(name: &str) -> bool {
    name.starts_with("rdf:") || name.starts_with("x:") || name == "xmpmeta"
}

fn skip_attribute(name: &str) -> bool {
    name.starts_with("xmlns") || name.starts_with("rdf:") || name.starts_with("xml:") || name.starts_with("x:")
}

fn description_attributes(e: &BytesStart, fields: &mut Vec<XmpField>) {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if skip_attribute(&key) {
            continue;
        }
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map(|v| v.to_string()).unwrap_or_else(|_| raw.to_string());
        fields.push(XmpField { name: key, value });
    }
}

fn resource_attribute(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"rdf:resource")
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// The innermost open element that names a property.
fn current_property(stack: &[String]) -> Option<&str> {
    stack
        .iter()
        .rev()
        .map(String::as_str)
        .find(|name| !is_structural(name))
}

fn flatten(xml: &str) -> Vec<XmpField> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "rdf:Description" {
                    description_attributes(&e, &mut fields);
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "rdf:Description" {
                    description_attributes(&e, &mut fields);
                } else if let Some(resource) = resource_attribute(&e) {
                    fields.push(XmpField { name, value: resource });
                }
            }
            Ok(Event::Text(t)) => {
                let raw = t.into_inner();
                let raw = String::from_utf8_lossy(&raw);
                let value = unescape(&raw).map(|v| v.to_string()).unwrap_or_else(|_| raw.to_string());
                if let Some(property) = current_property(&stack) {
                    fields.push(XmpField {
                        name: property.to_string(),
                        value,
                    });
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(property) = current_property(&stack) {
                    fields.push(XmpField {
                        name: property.to_string(),
                        value: String::from_utf8_lossy(&t.into_inner()).to_string(),
                    });
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("XMP packet is not well-formed, keeping {} field(s): {e}", fields.len());
                break;
            }
        }
    }

    fields
}
