//! Owned XML element tree built from `quick-xml` events.
//!
//! Elements and attributes are addressed by local name, so namespace prefixes
//! chosen by a publisher (`cbc:`, `n2016:`, default namespace) do not affect
//! lookups. Namespace declarations are kept per element for format checks.
//!
//! Paths are `/`-separated child steps relative to an element, e.g.
//! `CODED_DATA_SECTION/REF_OJS/DATE_PUB`. A `//` before a step matches it at
//! any depth. The empty path is the element itself.

use crate::fields::clean_text;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::PrefixDeclaration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    prefix: Option<String>,
    attributes: Vec<(String, String)>,
    namespaces: Vec<(Option<String>, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Local name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI bound to this element's prefix, if declared on it
    pub fn namespace(&self) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(prefix, _)| *prefix == self.prefix)
            .map(|(_, uri)| uri.as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct text content, without descendants
    pub fn own_text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// First element reached by following `path`
    pub fn find(&self, path: &str) -> Option<&Element> {
        let mut current = self;
        let mut any_depth = false;
        for step in path.split('/') {
            if step.is_empty() {
                any_depth = true;
                continue;
            }
            current = if any_depth {
                current.descendant(step)?
            } else {
                current.child(step)?
            };
            any_depth = false;
        }
        Some(current)
    }

    /// Every element reached by following `path` through all branches
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Element> {
        let mut current = vec![self];
        let mut any_depth = false;
        for step in path.split('/') {
            if step.is_empty() {
                any_depth = true;
                continue;
            }
            current = current
                .into_iter()
                .flat_map(|e| {
                    if any_depth {
                        let mut found = Vec::new();
                        e.collect_descendants(step, &mut found);
                        found
                    } else {
                        e.children_named(step).collect()
                    }
                })
                .collect();
            any_depth = false;
        }
        current
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// First descendant (depth-first, document order) with this local name
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// All text below this element, whitespace-normalised; blank is absent
    pub fn deep_text(&self) -> Option<String> {
        let mut buffer = String::new();
        self.collect_text(&mut buffer);
        clean_text(&buffer)
    }

    fn collect_text(&self, buffer: &mut String) {
        if !self.text.is_empty() {
            buffer.push(' ');
            buffer.push_str(&self.text);
        }
        for child in &self.children {
            child.collect_text(buffer);
        }
    }

    /// Normalised text at `path`
    pub fn text_at(&self, path: &str) -> Option<String> {
        self.find(path).and_then(Element::deep_text)
    }

    /// Raw (untrimmed-inside) text at `path`, for values interpreted later
    pub fn raw_text_at(&self, path: &str) -> Option<&str> {
        self.find(path)
            .map(|e| e.text.trim())
            .filter(|text| !text.is_empty())
    }

    /// Attribute value at `path`, blank is absent
    pub fn attr_at(&self, path: &str, attr: &str) -> Option<String> {
        self.find(path)
            .and_then(|e| e.attr(attr))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

/// Parse a complete document into its root element.
///
/// Anything that is not well-formed markup is an error: mismatched or
/// unclosed tags, bad escapes, multiple roots, stray text outside the root.
pub fn parse_document(text: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                ensure_single_root(&root, position)?;
                stack.push(start_element(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                ensure_single_root(&root, position)?;
                let element = start_element(e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| format!("unexpected closing tag at byte {position}"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(ref e)) => {
                let value = e
                    .unescape()
                    .map_err(|err| format!("bad text escape at byte {position}: {err}"))?;
                append_text(&mut stack, &value, position)?;
            }
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                let value = std::str::from_utf8(&bytes)
                    .map_err(|err| format!("invalid CDATA at byte {position}: {err}"))?;
                append_text(&mut stack, value, position)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "malformed XML at byte {}: {}",
                    reader.error_position() as u64,
                    err
                ));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("document ends inside <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn ensure_single_root(root: &Option<Element>, position: u64) -> Result<(), String> {
    if root.is_some() {
        return Err(format!("second root element at byte {position}"));
    }
    Ok(())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [Element], value: &str, position: u64) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            if !parent.text.is_empty() {
                parent.text.push(' ');
            }
            parent.text.push_str(value);
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(format!("text outside the root element at byte {position}")),
    }
}

/// Build an element from a start tag: local name, prefix, attributes and
/// namespace declarations
pub(crate) fn start_element(e: &BytesStart<'_>) -> Result<Element, String> {
    let qname = e.name();
    let name = String::from_utf8_lossy(qname.local_name().as_ref()).to_string();
    let prefix = qname
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).to_string());

    let mut element = Element {
        name,
        prefix,
        ..Element::default()
    };

    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute on <{}>: {err}", element.name))?;
        let value = attr
            .unescape_value()
            .map_err(|err| format!("bad attribute value on <{}>: {err}", element.name))?
            .to_string();

        let key = attr.key;
        if let Some(binding) = key.as_namespace_binding() {
            let bound = match binding {
                PrefixDeclaration::Default => None,
                PrefixDeclaration::Named(p) => Some(String::from_utf8_lossy(p).to_string()),
            };
            element.namespaces.push((bound, value));
        } else {
            let local = String::from_utf8_lossy(key.local_name().as_ref()).to_string();
            element.attributes.push((local, value));
        }
    }

    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TED_EXPORT xmlns="http://publications.europa.eu/TED_schema/Export"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xsi:schemaLocation="http://publications.europa.eu/TED_schema/Export TED_EXPORT.xsd"
            DOC_ID="000769-2024">
  <CODED_DATA_SECTION>
    <REF_OJS><DATE_PUB>20240102</DATE_PUB></REF_OJS>
    <NOTICE_DATA><ISO_COUNTRY VALUE="PL"/></NOTICE_DATA>
  </CODED_DATA_SECTION>
  <FORM_SECTION>
    <F03_2014 LG="PL">
      <OBJECT_CONTRACT><TITLE><P>Dostawa</P><P>paliwa &amp; olejów</P></TITLE></OBJECT_CONTRACT>
      <AWARD_CONTRACT ITEM="1"/>
      <AWARD_CONTRACT ITEM="2"/>
    </F03_2014>
  </FORM_SECTION>
</TED_EXPORT>"#;

    #[test]
    fn test_paths_and_attributes() {
        let root = parse_document(SAMPLE).unwrap();
        assert_eq!(root.name(), "TED_EXPORT");
        assert_eq!(
            root.namespace(),
            Some("http://publications.europa.eu/TED_schema/Export")
        );
        assert_eq!(root.attr("DOC_ID"), Some("000769-2024"));
        assert!(root.attr("schemaLocation").unwrap().contains("TED_EXPORT.xsd"));
        assert_eq!(
            root.raw_text_at("CODED_DATA_SECTION/REF_OJS/DATE_PUB"),
            Some("20240102")
        );
        assert_eq!(
            root.attr_at("CODED_DATA_SECTION/NOTICE_DATA/ISO_COUNTRY", "VALUE"),
            Some("PL".to_string())
        );
    }

    #[test]
    fn test_deep_text_joins_paragraphs() {
        let root = parse_document(SAMPLE).unwrap();
        let form = root.find("FORM_SECTION/F03_2014").unwrap();
        assert_eq!(
            form.text_at("OBJECT_CONTRACT/TITLE"),
            Some("Dostawa paliwa & olejów".to_string())
        );
        assert_eq!(form.find_all("AWARD_CONTRACT").len(), 2);
        assert!(root.descendant("AWARD_CONTRACT").is_some());
        assert_eq!(root.find_all("FORM_SECTION//AWARD_CONTRACT").len(), 2);
        assert_eq!(
            root.text_at("//OBJECT_CONTRACT/TITLE"),
            Some("Dostawa paliwa & olejów".to_string())
        );
        assert!(root.find("FORM_SECTION/MISSING").is_none());
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(parse_document("<A><B></A>").is_err());
        assert!(parse_document("<A><B>").is_err());
        assert!(parse_document("<A/><B/>").is_err());
        assert!(parse_document("just text").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document("<A>&bogus;</A>").is_err());
    }

    #[test]
    fn test_prefixed_namespace_resolution() {
        let doc = r#"<can:ContractAwardNotice xmlns:can="urn:example"><cbc:ID xmlns:cbc="urn:cbc">X</cbc:ID></can:ContractAwardNotice>"#;
        let root = parse_document(doc).unwrap();
        assert_eq!(root.name(), "ContractAwardNotice");
        assert_eq!(root.namespace(), Some("urn:example"));
        assert_eq!(root.raw_text_at("ID"), Some("X"));
    }
}
