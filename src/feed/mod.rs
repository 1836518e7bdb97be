//! SDShare Atom feed model: parsing, link extraction, structural validation.
//!
//! The protocol publishes a hierarchy of Atom feeds (overview → collection →
//! fragments/snapshots) stitched together with typed link relations. This
//! module provides everything needed to interpret one fetched document:
//!
//! - [`document`] - Namespace-aware XML tree built on `quick-xml`
//! - [`links`] - Typed-link extraction with the protocol's type-defaulting rules
//! - [`validate`] - Structural validators per feed kind
//!
//! The walker in [`crate::crawl`] drives these against a live server.

pub mod document;
pub mod links;
pub mod validate;

pub use document::{Document, DocumentError, Element};
pub use links::{links, LinkError, TypedLink};
pub use validate::{validate_feed, AuthorRule};

/// Atom 1.0 namespace.
pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";

/// SDShare extension namespace.
pub const NS_SDSHARE: &str = "http://www.sdshare.org/2012/core/";

/// The two namespaces every query runs against, passed explicitly rather
/// than held as process-wide state. Non-default bindings only matter when
/// testing servers that predate the 2012 namespace revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespaces {
    pub atom: &'static str,
    pub sdshare: &'static str,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            atom: NS_ATOM,
            sdshare: NS_SDSHARE,
        }
    }
}

/// The link-relation vocabulary. Atom-native relations use their bare name
/// as the `rel` attribute value; SDShare relations use the full namespace
/// IRI followed by the local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    Alternate,
    SelfRel,
    Next,
    CollectionFeed,
    FragmentsFeed,
    SnapshotsFeed,
    Snapshot,
    Fragment,
}

impl Rel {
    /// Local name, used in violation messages.
    pub fn local(self) -> &'static str {
        match self {
            Rel::Alternate => "alternate",
            Rel::SelfRel => "self",
            Rel::Next => "next",
            Rel::CollectionFeed => "collectionfeed",
            Rel::FragmentsFeed => "fragmentsfeed",
            Rel::SnapshotsFeed => "snapshotsfeed",
            Rel::Snapshot => "snapshot",
            Rel::Fragment => "fragment",
        }
    }

    /// The value carried in the `rel` attribute on the wire.
    pub fn attribute_value(self, ns: &Namespaces) -> String {
        match self {
            Rel::Alternate | Rel::SelfRel | Rel::Next => self.local().to_owned(),
            _ => format!("{}{}", ns.sdshare, self.local()),
        }
    }

    /// Feed-discovery relations point at further Atom feeds: a missing
    /// `type` attribute defaults to `application/atom+xml`. Resource
    /// relations (`fragment`, `snapshot`) must declare their type.
    pub fn is_feed_discovery(self) -> bool {
        !matches!(self, Rel::Fragment | Rel::Snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_relations_use_bare_names() {
        let ns = Namespaces::default();
        assert_eq!(Rel::Alternate.attribute_value(&ns), "alternate");
        assert_eq!(Rel::Next.attribute_value(&ns), "next");
    }

    #[test]
    fn test_sdshare_relations_are_namespace_qualified() {
        let ns = Namespaces::default();
        assert_eq!(
            Rel::CollectionFeed.attribute_value(&ns),
            "http://www.sdshare.org/2012/core/collectionfeed"
        );
        assert_eq!(
            Rel::Fragment.attribute_value(&ns),
            "http://www.sdshare.org/2012/core/fragment"
        );
    }

    #[test]
    fn test_type_defaulting_split() {
        assert!(Rel::CollectionFeed.is_feed_discovery());
        assert!(Rel::FragmentsFeed.is_feed_discovery());
        assert!(Rel::SnapshotsFeed.is_feed_discovery());
        assert!(Rel::Next.is_feed_discovery());
        assert!(!Rel::Fragment.is_feed_discovery());
        assert!(!Rel::Snapshot.is_feed_discovery());
    }
}
