use crate::error::{Result, WeftError};
use ego_tree::iter::Edge;
use html5ever::serialize::{HtmlSerializer, SerializeOpts, Serializer};
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::io::Write;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// What a rewrite pass does with one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Emit the element unchanged and keep visiting its children.
    Keep,
    /// Drop the element and emit the given markup in its place.
    Replace(String),
    /// Keep the element and its attributes but replace its content with text.
    Text(String),
    /// Keep the element and append markup after its existing children.
    Append(String),
}

/// A parsed HTML document.
///
/// Mutation never touches the parsed tree in place: every change serializes a
/// new document from the current one and re-parses it.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    pub fn html(&self) -> String {
        self.html.html()
    }

    pub fn head(&self) -> Option<ElementRef<'_>> {
        self.top_level("head")
    }

    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.top_level("body")
    }

    fn top_level(&self, name: &str) -> Option<ElementRef<'_>> {
        self.html
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == name)
    }

    pub fn head_attr(&self, name: &str) -> Option<&str> {
        self.head().and_then(|head| head.value().attr(name))
    }

    pub fn head_attrs(&self) -> Vec<(&str, &str)> {
        self.head()
            .map(|head| head.value().attrs().collect())
            .unwrap_or_default()
    }

    pub fn head_inner_html(&self) -> String {
        self.head().map(|head| head.inner_html()).unwrap_or_default()
    }

    pub fn body_inner_html(&self) -> String {
        self.body().map(|body| body.inner_html()).unwrap_or_default()
    }

    /// Head content followed by body content, without the document shell.
    pub fn fragment_html(&self) -> String {
        let mut fragment = self.head_inner_html();
        fragment.push_str(&self.body_inner_html());
        fragment
    }

    pub fn select(&self, selector: &str) -> Result<Vec<ElementRef<'_>>> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).collect())
    }

    pub fn elements_with_attribute(&self, name: &str) -> Vec<ElementRef<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().attr(name).is_some())
            .collect()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        !self.elements_with_attribute(name).is_empty()
    }

    /// Serializes the document in document order, asking `rewrite` what to do
    /// with each element, and parses the result into a new document.
    ///
    /// Elements inside a replaced or re-texted element are not visited.
    pub fn rewrite<F>(&self, mut rewrite: F) -> Result<Document>
    where
        F: FnMut(ElementRef<'_>) -> Result<Rewrite>,
    {
        let mut serializer = HtmlSerializer::new(Vec::new(), SerializeOpts::default());
        let mut skipping = None;
        let mut appended = HashMap::new();

        for edge in self.html.tree.root().traverse() {
            match edge {
                Edge::Open(node) => {
                    if skipping.is_some() {
                        continue;
                    }
                    match node.value() {
                        Node::Doctype(doctype) => serializer.write_doctype(doctype.name())?,
                        Node::Comment(comment) => serializer.write_comment(comment)?,
                        Node::Text(text) => serializer.write_text(text)?,
                        Node::Element(element) => {
                            let Some(element_ref) = ElementRef::wrap(node) else {
                                continue;
                            };
                            match rewrite(element_ref)? {
                                Rewrite::Keep => start_element(&mut serializer, element)?,
                                Rewrite::Append(markup) => {
                                    start_element(&mut serializer, element)?;
                                    appended.insert(node.id(), markup);
                                }
                                Rewrite::Replace(markup) => {
                                    serializer.writer.write_all(markup.as_bytes())?;
                                    skipping = Some(node.id());
                                }
                                Rewrite::Text(text) => {
                                    start_element(&mut serializer, element)?;
                                    if !VOID_ELEMENTS.contains(&element.name()) {
                                        serializer.write_text(&text)?;
                                    }
                                    serializer.end_elem(element.name.clone())?;
                                    skipping = Some(node.id());
                                }
                            }
                        }
                        // Template contents live under a fragment node.
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if let Some(id) = skipping {
                        if id == node.id() {
                            skipping = None;
                        }
                        continue;
                    }
                    if let Some(element) = node.value().as_element() {
                        if let Some(markup) = appended.remove(&node.id()) {
                            serializer.writer.write_all(markup.as_bytes())?;
                        }
                        serializer.end_elem(element.name.clone())?;
                    }
                }
            }
        }

        Ok(Document::parse(&String::from_utf8_lossy(&serializer.writer)))
    }

    pub fn set_text(&mut self, selector: &str, text: &str) -> Result<()> {
        self.rewrite_matching(selector, |_| Rewrite::Text(text.to_string()))
    }

    pub fn remove(&mut self, selector: &str) -> Result<()> {
        self.rewrite_matching(selector, |_| Rewrite::Replace(String::new()))
    }

    pub fn replace_with(&mut self, selector: &str, markup: &str) -> Result<()> {
        self.rewrite_matching(selector, |_| Rewrite::Replace(markup.to_string()))
    }

    pub fn append_to_head(&mut self, markup: &str) -> Result<()> {
        if markup.is_empty() {
            return Ok(());
        }
        *self = self.rewrite(|element| {
            Ok(if element.value().name() == "head" {
                Rewrite::Append(markup.to_string())
            } else {
                Rewrite::Keep
            })
        })?;
        Ok(())
    }

    fn rewrite_matching<F>(&mut self, selector: &str, mut action: F) -> Result<()>
    where
        F: FnMut(ElementRef<'_>) -> Rewrite,
    {
        let selector = parse_selector(selector)?;
        if self.html.select(&selector).next().is_none() {
            return Ok(());
        }
        *self = self.rewrite(|element| {
            Ok(if selector.matches(&element) {
                action(element)
            } else {
                Rewrite::Keep
            })
        })?;
        Ok(())
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|error| WeftError::Selector {
        selector: selector.to_string(),
        message: error.to_string(),
    })
}

fn start_element(serializer: &mut HtmlSerializer<Vec<u8>>, element: &Element) -> Result<()> {
    let attrs = element
        .attrs
        .iter()
        .map(|(name, value)| (name, &value[..]));
    serializer.start_elem(element.name.clone(), attrs)?;
    Ok(())
}

pub fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}
