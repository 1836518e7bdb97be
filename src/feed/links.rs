//! Extraction of typed, relation-qualified links from feed elements.

use thiserror::Error;

use crate::feed::{Element, Namespaces, Rel};
use crate::media_type::ATOM_XML;

/// Errors raised while extracting links. A link without `href` is always a
/// protocol violation, never silently skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("link with rel='{0}' has no href attribute")]
    MissingHref(String),
}

/// A link pulled out of an `atom:link` element.
///
/// `media_type` carries the declared `type` attribute. For feed-discovery
/// relations an absent attribute has already been defaulted to the Atom feed
/// media type; for resource relations (`fragment`, `snapshot`) it stays
/// `None` and the caller must report the missing attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedLink {
    pub href: String,
    pub media_type: Option<String>,
}

/// Returns the ordered `atom:link` children of `scope` carrying the given
/// relation.
///
/// With `atom_only`, a link matches only when it declares no `type` or
/// declares exactly the Atom feed media type — the filter used when
/// following feed-discovery links, so that e.g. an HTML rendition of a
/// collection is not mistaken for its feed.
pub fn links(
    scope: &Element,
    rel: Rel,
    ns: &Namespaces,
    atom_only: bool,
) -> Result<Vec<TypedLink>, LinkError> {
    let rel_value = rel.attribute_value(ns);
    let mut found = Vec::new();

    for link in scope.children(ns.atom, "link") {
        if link.attr("rel") != Some(rel_value.as_str()) {
            continue;
        }
        let declared = link.attr("type");
        if atom_only && !matches!(declared, None | Some(ATOM_XML)) {
            continue;
        }
        let href = link
            .attr("href")
            .ok_or_else(|| LinkError::MissingHref(rel_value.clone()))?;

        let media_type = match declared {
            Some(t) => Some(t.to_owned()),
            None if rel.is_feed_discovery() => Some(ATOM_XML.to_owned()),
            None => None,
        };
        found.push(TypedLink {
            href: href.to_owned(),
            media_type,
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Document;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn entry_from(xml: &str) -> Element {
        let doc = Document::parse(xml.as_bytes(), Url::parse("http://example.org/").unwrap())
            .unwrap();
        doc.root().clone()
    }

    const NS_DECLS: &str =
        r#"xmlns="http://www.w3.org/2005/Atom" xmlns:sd="http://www.sdshare.org/2012/core/""#;

    #[test]
    fn test_extracts_matching_relation_in_order() {
        let entry = entry_from(&format!(
            r#"<entry {NS_DECLS}>
                 <link rel="alternate" href="/a" type="application/rdf+xml"/>
                 <link rel="http://www.sdshare.org/2012/core/fragment" href="/f1" type="application/rdf+xml"/>
                 <link rel="http://www.sdshare.org/2012/core/fragment" href="/f2" type="application/rdf+xml"/>
               </entry>"#
        ));
        let ns = Namespaces::default();
        let found = links(&entry, Rel::Fragment, &ns, false).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].href, "/f1");
        assert_eq!(found[1].href, "/f2");
    }

    #[test]
    fn test_feed_discovery_link_defaults_to_atom() {
        let entry = entry_from(&format!(
            r#"<entry {NS_DECLS}>
                 <link rel="http://www.sdshare.org/2012/core/collectionfeed" href="/coll1"/>
               </entry>"#
        ));
        let ns = Namespaces::default();
        let found = links(&entry, Rel::CollectionFeed, &ns, true).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].media_type.as_deref(), Some("application/atom+xml"));
    }

    #[test]
    fn test_resource_link_keeps_missing_type_as_none() {
        let entry = entry_from(&format!(
            r#"<entry {NS_DECLS}>
                 <link rel="http://www.sdshare.org/2012/core/fragment" href="/frag/1"/>
               </entry>"#
        ));
        let ns = Namespaces::default();
        let found = links(&entry, Rel::Fragment, &ns, false).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].media_type, None);
    }

    #[test]
    fn test_atom_only_filter_skips_other_types() {
        let entry = entry_from(&format!(
            r#"<entry {NS_DECLS}>
                 <link rel="http://www.sdshare.org/2012/core/fragmentsfeed" href="/html" type="text/html"/>
                 <link rel="http://www.sdshare.org/2012/core/fragmentsfeed" href="/atom" type="application/atom+xml"/>
                 <link rel="http://www.sdshare.org/2012/core/fragmentsfeed" href="/untyped"/>
               </entry>"#
        ));
        let ns = Namespaces::default();
        let found = links(&entry, Rel::FragmentsFeed, &ns, true).unwrap();
        let hrefs: Vec<_> = found.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/atom", "/untyped"]);
    }

    #[test]
    fn test_missing_href_is_an_error() {
        let entry = entry_from(&format!(
            r#"<entry {NS_DECLS}>
                 <link rel="alternate" type="application/rdf+xml"/>
               </entry>"#
        ));
        let ns = Namespaces::default();
        let result = links(&entry, Rel::Alternate, &ns, false);
        assert_eq!(result, Err(LinkError::MissingHref("alternate".into())));
    }

    #[test]
    fn test_unrelated_links_ignored() {
        let entry = entry_from(&format!(
            r#"<entry {NS_DECLS}>
                 <link rel="self" href="/self"/>
               </entry>"#
        ));
        let ns = Namespaces::default();
        assert!(links(&entry, Rel::Alternate, &ns, false).unwrap().is_empty());
    }
}
