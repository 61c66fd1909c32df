//! Markup parser adapter.
//!
//! Wraps the external XML parser and normalizes its output into the
//! compiler's [`Node`] shape. The fragment is wrapped in a synthetic root
//! element before parsing so that templates with several top-level siblings
//! still read as well-formed markup; the root is stripped again on the way
//! out. Comments, CDATA sections, processing instructions and doctypes are
//! dropped. Malformed markup is fatal: no partial AST is ever produced.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ast::{normalize_text, split_qualified, Attribute, Element, Node};
use crate::error::CompileError;

const SYNTHETIC_ROOT: &str = "root";

struct OpenElement {
    local_name: String,
    namespace: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

/// Parses a markup fragment into its ordered top-level nodes.
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, CompileError> {
    let wrapped = format!("<{SYNTHETIC_ROOT}>{markup}</{SYNTHETIC_ROOT}>");
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text(false);

    let mut open: Vec<OpenElement> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let pos = reader.buffer_position() as usize;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| CompileError::parse(pos, e))?;

        match event {
            Event::Start(e) => open.push(open_element(&e, pos)?),
            Event::Empty(e) => {
                let element = open_element(&e, pos)?;
                attach(&mut open, close_element(element))?;
            }
            Event::Text(e) => {
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                let text = unescape(&raw)
                    .map_err(|e| CompileError::parse(pos, e))?
                    .into_owned();
                attach(&mut open, Node::Text(normalize_text(&text)))?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| CompileError::parse(pos, "unexpected closing tag"))?;
                if open.is_empty() {
                    // The synthetic root just closed; its children are the
                    // fragment's top-level nodes.
                    return Ok(element.children);
                }
                attach(&mut open, close_element(element))?;
            }
            Event::Eof => {
                return Err(CompileError::parse(pos, "unexpected end of input"));
            }
            // Comments and every other node kind are not part of the
            // template language.
            Event::Comment(_) | Event::CData(_) => {}
            _ => {}
        }
        buf.clear();
    }
}

fn open_element(e: &BytesStart, pos: usize) -> Result<OpenElement, CompileError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let (namespace, local_name) = split_qualified(&name);

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| CompileError::parse(pos, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let (attr_ns, attr_local) = split_qualified(&key);
        let raw_value = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw_value)
            .map_err(|e| CompileError::parse(pos, e))?
            .into_owned();
        attributes.push(Attribute {
            local_name: attr_local,
            namespace: attr_ns,
            value,
        });
    }

    Ok(OpenElement {
        local_name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn close_element(element: OpenElement) -> Node {
    Node::Element(Element {
        local_name: element.local_name,
        namespace: element.namespace,
        attributes: element.attributes,
        children: element.children,
    })
}

fn attach(open: &mut [OpenElement], node: Node) -> Result<(), CompileError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => Err(CompileError::parse(0, "content outside the document root")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(el) => el,
            Node::Text(t) => panic!("expected element, got text {:?}", t),
        }
    }

    #[test]
    fn test_namespaces() {
        let nodes =
            parse_fragment(r#"<sys:viewmodel type="MyComponent1ViewModel">123</sys:viewmodel>"#)
                .unwrap();
        assert_eq!(nodes.len(), 1);

        let el = element(&nodes[0]);
        assert_eq!(el.namespace, "sys");
        assert_eq!(el.local_name, "viewmodel");
        assert_eq!(el.attributes[0].local_name, "type");
        assert_eq!(el.attributes[0].value, "MyComponent1ViewModel");
        assert_eq!(el.children, vec![Node::Text("123".to_string())]);
    }

    #[test]
    fn test_multiple_top_level_siblings() {
        let nodes = parse_fragment(
            r#"<sys:viewmodel type="TypeName"></sys:viewmodel><div><span>123</span></div>"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[0]).namespace, "sys");
        assert_eq!(element(&nodes[0]).local_name, "viewmodel");

        let div = element(&nodes[1]);
        assert_eq!(div.namespace, "");
        assert_eq!(div.local_name, "div");
        assert_eq!(div.children.len(), 1);
        assert_eq!(element(&div.children[0]).local_name, "span");
    }

    #[test]
    fn test_namespaced_attributes_split() {
        let nodes = parse_fragment(r#"<div dx:visible="Field1" class="c"/>"#).unwrap();
        let div = element(&nodes[0]);
        assert_eq!(div.attributes[0].namespace, "dx");
        assert_eq!(div.attributes[0].local_name, "visible");
        assert_eq!(div.attributes[1].namespace, "");
        assert_eq!(div.attributes[1].local_name, "class");
    }

    #[test]
    fn test_text_is_normalized() {
        let nodes = parse_fragment("<div>  hello\n   world  </div>").unwrap();
        let div = element(&nodes[0]);
        assert_eq!(div.children, vec![Node::Text("hello world".to_string())]);
    }

    #[test]
    fn test_comments_are_dropped() {
        let nodes = parse_fragment("<div><!-- note --><span/></div>").unwrap();
        let div = element(&nodes[0]);
        assert_eq!(div.children.len(), 1);
        assert_eq!(element(&div.children[0]).local_name, "span");
    }

    #[test]
    fn test_entities_are_unescaped() {
        let nodes = parse_fragment(r#"<div title="a &amp; b"/>"#).unwrap();
        let div = element(&nodes[0]);
        assert_eq!(div.attributes[0].value, "a & b");
    }

    #[test]
    fn test_malformed_markup_is_fatal() {
        let err = parse_fragment("<div><span></div>").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));

        let err = parse_fragment("<div>").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
