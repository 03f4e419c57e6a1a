use std::collections::BTreeMap;
use std::io::BufRead;

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Read(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("end tag `{0}` without a matching start tag")]
    UnmatchedEndTag(String),
    #[error("document ended with `{0}` still open")]
    UnclosedTag(String),
}

/// A field that appeared either once or repeatedly in the source document.
///
/// JUnit emitters disagree on cardinality: a suite with a single test case
/// serializes the same way as a suite with many, so consumers must not care
/// which form they got. [`to_list`] is the single coercion point.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }

    fn push(&mut self, item: T) {
        let current = std::mem::replace(self, OneOrMany::Many(Vec::new()));
        *self = match current {
            OneOrMany::One(first) => OneOrMany::Many(vec![first, item]),
            OneOrMany::Many(mut items) => {
                items.push(item);
                OneOrMany::Many(items)
            }
        };
    }
}

/// Coerces an absent, singleton, or repeated field to a uniform list view.
pub fn to_list<T>(value: Option<&OneOrMany<T>>) -> Vec<&T> {
    value.map(|v| v.iter().collect()).unwrap_or_default()
}

/// A loosely-typed XML element: attribute values kept as strings, text
/// content kept separate from attributes, repeated child names collapsing
/// into [`OneOrMany`]. This is the raw shape the normalizer consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawElement {
    name: String,
    attrs: BTreeMap<String, String>,
    children: BTreeMap<String, OneOrMany<RawElement>>,
    text: Option<String>,
}

impl RawElement {
    pub fn new<T: Into<String>>(name: T) -> Self {
        RawElement {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn append_text(&mut self, value: &str) {
        match self.text.as_mut() {
            Some(text) => text.push_str(value),
            None => self.text = Some(String::from(value)),
        }
    }

    /// First child with the given name, regardless of cardinality.
    pub fn child(&self, name: &str) -> Option<&RawElement> {
        self.children.get(name).and_then(OneOrMany::first)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// All children with the given name, coerced to a list.
    pub fn children_named(&self, name: &str) -> Vec<&RawElement> {
        to_list(self.children.get(name))
    }

    pub fn push_child(&mut self, child: RawElement) {
        use std::collections::btree_map::Entry;

        match self.children.entry(child.name().to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(child),
            Entry::Vacant(entry) => {
                entry.insert(OneOrMany::One(child));
            }
        }
    }
}

/// Reads an XML document into a [`RawElement`] tree.
///
/// The returned element is a synthetic document node; the actual root
/// element of the file is its only child. Unknown elements are kept, so
/// the tree is schema-agnostic.
pub fn parse_document<R: BufRead>(xml: R) -> Result<RawElement, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![RawElement::new("")];
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                stack.push(element_from_start(&e)?);
            }
            Event::Empty(e) => {
                let element = element_from_start(&e)?;
                attach(&mut stack, element);
            }
            Event::End(e) => {
                if stack.len() < 2 {
                    return Err(XmlError::UnmatchedEndTag(
                        String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ));
                }
                let element = stack.pop().expect("stack holds the open element");
                attach(&mut stack, element);
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                if let Some(open) = stack.last_mut() {
                    open.append_text(&text);
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(open) = stack.last_mut() {
                    open.append_text(&text);
                }
            }
            _ => (),
        }
        buf.clear();
    }

    if stack.len() > 1 {
        let open = stack.pop().expect("stack is non-empty");
        return Err(XmlError::UnclosedTag(open.name().to_string()));
    }
    Ok(stack.pop().expect("synthetic document node remains"))
}

fn element_from_start(e: &BytesStart) -> Result<RawElement, XmlError> {
    let mut element = RawElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        element.set_attr(key, value.into_owned());
    }
    Ok(element)
}

fn attach(stack: &mut [RawElement], element: RawElement) {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(element);
    }
}
