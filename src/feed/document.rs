//! Namespace-aware XML tree for fetched feed documents.
//!
//! Built on `quick-xml`'s `NsReader` so element names resolve to full
//! namespace URIs at parse time. The tree is immutable once built and only
//! supports the read-only structural queries the validators need; it is not
//! a general XPath engine.
//!
//! quick-xml never parses `<!ENTITY>` declarations, so custom entities fail
//! to unescape instead of expanding; XXE does not apply.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;
use url::Url;

/// Maximum element nesting depth accepted from a server.
/// Feeds are shallow; anything deeper is a hostile or broken document.
const MAX_DEPTH: usize = 50;

/// Errors raised while building a [`Document`] from raw bytes.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The bytes are not well-formed XML.
    #[error("XML parse error: {0}")]
    XmlParse(String),
    /// No root element was found.
    #[error("document has no root element")]
    Empty,
    /// More than one top-level element.
    #[error("document has multiple root elements")]
    MultipleRoots,
    /// Nesting depth exceeded [`MAX_DEPTH`].
    #[error("element nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// One element of the parsed tree: resolved namespace, local name,
/// attributes (by local name), accumulated text, and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    ns: Option<String>,
    local: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// True when the element's resolved namespace and local name match.
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local == local && self.ns.as_deref() == Some(ns)
    }

    pub fn local_name(&self) -> &str {
        &self.local
    }

    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// Attribute value by local name. Link attributes (`rel`, `href`,
    /// `type`) are unprefixed in Atom, so no namespace axis is needed.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements matching a namespace and local name, in document order.
    pub fn children<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.is(ns, local))
    }

    /// Character content directly inside this element, whitespace-trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// An immutable parsed feed document with its base URI.
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
    base: Url,
}

impl Document {
    /// Parses raw response bytes into a document tree.
    pub fn parse(bytes: &[u8], base: Url) -> Result<Self, DocumentError> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_resolved_event() {
                Ok((resolution, Event::Start(e))) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(DocumentError::MaxDepthExceeded(MAX_DEPTH));
                    }
                    if stack.is_empty() && root.is_some() {
                        return Err(DocumentError::MultipleRoots);
                    }
                    stack.push(make_element(resolution, &e)?);
                }
                Ok((resolution, Event::Empty(e))) => {
                    let elem = make_element(resolution, &e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None if root.is_none() => root = Some(elem),
                        None => return Err(DocumentError::MultipleRoots),
                    }
                }
                Ok((_, Event::End(_))) => {
                    let elem = stack
                        .pop()
                        .ok_or_else(|| DocumentError::XmlParse("unmatched end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None => root = Some(elem),
                    }
                }
                Ok((_, Event::Text(t))) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t
                            .unescape()
                            .map_err(|e| DocumentError::XmlParse(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                }
                Ok((_, Event::CData(t))) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&t.into_inner()));
                    }
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {} // declaration, comments, PIs, DOCTYPE
                Err(e) => return Err(DocumentError::XmlParse(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::XmlParse("unclosed element".into()));
        }
        let root = root.ok_or(DocumentError::Empty)?;
        Ok(Self { root, base })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Base URI the document was fetched from; relative hrefs resolve
    /// against it.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves a (possibly relative) href against the document base.
    pub fn resolve(&self, href: &str) -> Result<Url, url::ParseError> {
        self.base.join(href)
    }
}

fn make_element(
    resolution: ResolveResult<'_>,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<Element, DocumentError> {
    let ns = match resolution {
        ResolveResult::Bound(ns) => {
            Some(String::from_utf8_lossy(ns.into_inner()).into_owned())
        }
        _ => None,
    };
    let local = String::from_utf8_lossy(e.local_name().into_inner()).into_owned();

    let mut attrs = Vec::new();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed XML attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.local_name().into_inner()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::XmlParse(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }

    Ok(Element {
        ns,
        local,
        attrs,
        text: String::new(),
        children: Vec::new(),
    })
}
