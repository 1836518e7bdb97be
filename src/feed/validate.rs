//! Structural validators for the Atom/SDShare feed grammar.
//!
//! Each validator collects violations instead of aborting on the first one,
//! so one pass over a document reports everything wrong with it and the
//! caller chooses between fail-fast and aggregate policies. Cardinality
//! checks that compare counts (`alternate` vs `fragment`) query the whole
//! document at once so the reported numbers are the true aggregates.

use clap::ValueEnum;
use serde::Deserialize;

use crate::feed::{links, Document, Element, LinkError, Namespaces, Rel, TypedLink};
use crate::media_type::{MediaType, ATOM_XML};
use crate::report::{FeedKind, Report, Violation};

/// Rule variant for the "feed with no entries" case. The protocol revisions
/// disagree: the strict reading requires a feed-level author whenever there
/// are no entries to carry one, the relaxed reading leaves such feeds
/// unconstrained. Relaxed matches the behaviour of the reference test suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRule {
    #[default]
    Relaxed,
    Strict,
}

/// Validates one fetched feed document against the rules for its kind.
///
/// Violations land in the returned report's `violations`; degenerate cases
/// (a feed with nothing of the kind being searched for) land in `warnings`.
pub fn validate_feed(
    doc: &Document,
    kind: FeedKind,
    ns: &Namespaces,
    author_rule: AuthorRule,
) -> Report {
    let uri = doc.base().as_str();
    let mut report = Report::default();
    let feed = doc.root();

    if !feed.is(ns.atom, "feed") {
        report.push(Violation::new(
            kind,
            uri,
            format!("root element is not atom:feed (got '{}')", feed.local_name()),
        ));
        return report;
    }

    report.extend(validate_entry_commons(feed, "atom:feed", kind, uri, ns));

    let feed_authors: Vec<&Element> = feed.children(ns.atom, "author").collect();
    for author in &feed_authors {
        report.extend(validate_author(author, "atom:feed", kind, uri, ns));
    }

    let entries: Vec<&Element> = feed.children(ns.atom, "entry").collect();

    if entries.is_empty() && feed_authors.is_empty() && author_rule == AuthorRule::Strict {
        report.push(Violation::new(
            kind,
            uri,
            "feed with no entries must declare a feed-level author",
        ));
    }

    // Alternate links are extracted once per entry and shared with the
    // kind-specific validators, so a broken link is reported exactly once.
    let mut entry_alternates: Vec<Vec<TypedLink>> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let label = entry_label(entry, ns);
        report.extend(validate_entry_commons(entry, &label, kind, uri, ns));

        let authors: Vec<&Element> = entry.children(ns.atom, "author").collect();
        if feed_authors.is_empty() && authors.is_empty() {
            report.push(Violation::new(
                kind,
                uri,
                format!(
                    "atom:feed has no atom:author, so {} must have at least one atom:author",
                    label
                ),
            ));
        }
        for author in &authors {
            report.extend(validate_author(author, &label, kind, uri, ns));
        }

        // Every entry must reference its resource: inline content or an
        // alternate link.
        let has_content = entry.children(ns.atom, "content").next().is_some();
        let alternates = extract(entry, Rel::Alternate, ns, false, kind, uri, &mut report);
        if !has_content && alternates.is_empty() {
            report.push(Violation::new(
                kind,
                uri,
                format!("{} has neither atom:content nor an 'alternate' link", label),
            ));
        }
        entry_alternates.push(alternates);
    }

    match kind {
        FeedKind::Overview => validate_overview(&entries, &entry_alternates, ns, uri, &mut report),
        FeedKind::Collection => validate_collection(&entries, ns, uri, &mut report),
        FeedKind::Fragments => validate_fragments(&entries, &entry_alternates, ns, uri, &mut report),
        FeedKind::Snapshots => validate_snapshots(&entries, ns, uri, &mut report),
    }

    validate_next_links(feed, kind, ns, uri, &mut report);

    report
}

/// Requires exactly one non-empty `id`, `title`, and `updated` child.
/// Applies to the feed element and to every entry.
pub fn validate_entry_commons(
    node: &Element,
    what: &str,
    kind: FeedKind,
    uri: &str,
    ns: &Namespaces,
) -> Vec<Violation> {
    let mut out = Vec::new();
    for required in ["id", "title", "updated"] {
        let found: Vec<&Element> = node.children(ns.atom, required).collect();
        match found.as_slice() {
            [] => out.push(Violation::new(
                kind,
                uri,
                format!("{} has no atom:{}", what, required),
            )),
            [single] => {
                if single.text().is_empty() {
                    out.push(Violation::new(
                        kind,
                        uri,
                        format!("atom:{} of {} is empty", required, what),
                    ));
                }
            }
            many => out.push(Violation::new(
                kind,
                uri,
                format!(
                    "expected exactly one atom:{} in {}, got {}",
                    required,
                    what,
                    many.len()
                ),
            )),
        }
    }
    out
}

/// Requires exactly one non-empty `name`; `email` and `uri` are optional
/// but at most one each and non-empty when present.
pub fn validate_author(
    author: &Element,
    owner: &str,
    kind: FeedKind,
    uri: &str,
    ns: &Namespaces,
) -> Vec<Violation> {
    let mut out = Vec::new();

    let names: Vec<&Element> = author.children(ns.atom, "name").collect();
    if names.len() != 1 {
        out.push(Violation::new(
            kind,
            uri,
            format!(
                "atom:author of {} must have exactly one atom:name, got {}",
                owner,
                names.len()
            ),
        ));
    } else if names[0].text().is_empty() {
        out.push(Violation::new(
            kind,
            uri,
            format!("atom:name of the author of {} is empty", owner),
        ));
    }

    for optional in ["email", "uri"] {
        let found: Vec<&Element> = author.children(ns.atom, optional).collect();
        if found.len() > 1 {
            out.push(Violation::new(
                kind,
                uri,
                format!(
                    "atom:author of {} must have at most one atom:{}, got {}",
                    owner,
                    optional,
                    found.len()
                ),
            ));
        } else if found.len() == 1 && found[0].text().is_empty() {
            out.push(Violation::new(
                kind,
                uri,
                format!("atom:{} of the author of {} is empty", optional, owner),
            ));
        }
    }

    out
}

/// Overview entries each point to exactly one collection: one `alternate`
/// link plus one `collectionfeed` link.
fn validate_overview(
    entries: &[&Element],
    alternates: &[Vec<TypedLink>],
    ns: &Namespaces,
    uri: &str,
    report: &mut Report,
) {
    if entries.is_empty() {
        report.warn(format!("no collection feeds found in {}", uri));
    }
    for (entry, alternate_links) in entries.iter().zip(alternates) {
        let label = entry_label(entry, ns);
        if alternate_links.len() != 1 {
            report.push(Violation::new(
                FeedKind::Overview,
                uri,
                format!(
                    "expected exactly one 'alternate' link in {}, got {}",
                    label,
                    alternate_links.len()
                ),
            ));
        }
        let found = extract(entry, Rel::CollectionFeed, ns, false, FeedKind::Overview, uri, report);
        if found.len() != 1 {
            report.push(Violation::new(
                FeedKind::Overview,
                uri,
                format!(
                    "expected exactly one 'collectionfeed' link in {}, got {}",
                    label,
                    found.len()
                ),
            ));
        }
    }
}

/// A collection feed carries exactly one fragments feed and exactly one
/// snapshots feed, counted over the whole document with the feed-discovery
/// type filter.
fn validate_collection(entries: &[&Element], ns: &Namespaces, uri: &str, report: &mut Report) {
    for rel in [Rel::FragmentsFeed, Rel::SnapshotsFeed] {
        let count: usize = entries
            .iter()
            .map(|entry| {
                extract(entry, rel, ns, true, FeedKind::Collection, uri, report).len()
            })
            .sum();
        if count != 1 {
            report.push(Violation::new(
                FeedKind::Collection,
                uri,
                format!("expected exactly one '{}' link, got {}", rel.local(), count),
            ));
        }
    }
}

/// Fragments rules apply to qualifying entries only — those carrying the
/// SDShare `resource` element. Aggregate `alternate` and `fragment` counts
/// must be ≥1 and equal.
fn validate_fragments(
    entries: &[&Element],
    entry_alternates: &[Vec<TypedLink>],
    ns: &Namespaces,
    uri: &str,
    report: &mut Report,
) {
    let mut qualifying = 0usize;
    let mut alternates = 0usize;
    let mut fragments = 0usize;
    for (entry, alternate_links) in entries.iter().zip(entry_alternates) {
        if entry.children(ns.sdshare, "resource").next().is_none() {
            continue;
        }
        qualifying += 1;
        alternates += alternate_links.len();
        let fragment_links =
            extract(entry, Rel::Fragment, ns, false, FeedKind::Fragments, uri, report);
        fragments += fragment_links.len();
        check_resource_link_types(&fragment_links, Rel::Fragment, FeedKind::Fragments, uri, report);
    }

    if qualifying == 0 {
        report.warn(format!("no fragment entries found in {}", uri));
        return;
    }

    if alternates == 0 {
        report.push(Violation::new(
            FeedKind::Fragments,
            uri,
            "no 'alternate' links to fragments",
        ));
    }
    if fragments == 0 {
        report.push(Violation::new(
            FeedKind::Fragments,
            uri,
            "no 'fragment' links",
        ));
    }
    if alternates != 0 && fragments != 0 && alternates != fragments {
        report.push(Violation::new(
            FeedKind::Fragments,
            uri,
            format!(
                "'alternate' link count ({}) does not match 'fragment' link count ({})",
                alternates, fragments
            ),
        ));
    }
}

/// Snapshot links are 0..n; zero is a degenerate case, not a violation.
fn validate_snapshots(entries: &[&Element], ns: &Namespaces, uri: &str, report: &mut Report) {
    let mut total = 0usize;
    for entry in entries {
        let snapshot_links =
            extract(entry, Rel::Snapshot, ns, false, FeedKind::Snapshots, uri, report);
        total += snapshot_links.len();
        check_resource_link_types(&snapshot_links, Rel::Snapshot, FeedKind::Snapshots, uri, report);
    }
    if total == 0 {
        report.warn(format!("no snapshots found in {}", uri));
    }
}

/// At most one `next` link per feed; a declared type must be compatible
/// with the Atom feed media type.
fn validate_next_links(
    feed: &Element,
    kind: FeedKind,
    ns: &Namespaces,
    uri: &str,
    report: &mut Report,
) {
    let nexts = extract(feed, Rel::Next, ns, false, kind, uri, report);
    if nexts.len() > 1 {
        report.push(Violation::new(
            kind,
            uri,
            format!("expected zero or one 'next' link, got {}", nexts.len()),
        ));
        return;
    }
    if let Some(next) = nexts.first() {
        // the extractor defaults a missing type to Atom, which is trivially
        // compatible, so only a declared type can fail here
        if let Some(declared) = &next.media_type {
            let Ok(atom) = MediaType::parse(ATOM_XML) else {
                return;
            };
            match MediaType::parse(declared) {
                Ok(mt) if atom.is_compatible(&mt) => {}
                Ok(mt) => report.push(Violation::new(
                    kind,
                    uri,
                    format!(
                        "media type on 'next' link must be compatible with {}, got {}",
                        ATOM_XML, mt
                    ),
                )),
                Err(e) => report.push(Violation::new(
                    kind,
                    uri,
                    format!("unparseable media type on 'next' link: {}", e),
                )),
            }
        }
    }
}

/// Resource links (`fragment`, `snapshot`) never default their type: a
/// missing or empty `type` attribute is a violation.
fn check_resource_link_types(
    found: &[TypedLink],
    rel: Rel,
    kind: FeedKind,
    uri: &str,
    report: &mut Report,
) {
    for link in found {
        match link.media_type.as_deref() {
            None => report.push(Violation::new(
                kind,
                uri,
                format!(
                    "'{}' link to {} is missing the required type attribute",
                    rel.local(),
                    link.href
                ),
            )),
            Some("") => report.push(Violation::new(
                kind,
                uri,
                format!("'{}' link to {} has an empty type attribute", rel.local(), link.href),
            )),
            Some(_) => {}
        }
    }
}

/// Link extraction that reports a missing `href` as a violation instead of
/// bubbling an error: the rest of the document is still worth checking.
fn extract(
    scope: &Element,
    rel: Rel,
    ns: &Namespaces,
    atom_only: bool,
    kind: FeedKind,
    uri: &str,
    report: &mut Report,
) -> Vec<TypedLink> {
    match links(scope, rel, ns, atom_only) {
        Ok(found) => found,
        Err(LinkError::MissingHref(rel_value)) => {
            report.push(Violation::new(
                kind,
                uri,
                format!("link with rel='{}' has no href attribute", rel_value),
            ));
            Vec::new()
        }
    }
}

/// Cites the entry by its id when it has one; falls back to a bare
/// "atom:entry" so messages stay usable against broken feeds.
fn entry_label(entry: &Element, ns: &Namespaces) -> String {
    match entry.children(ns.atom, "id").next() {
        Some(id) if !id.text().is_empty() => format!("entry '{}'", id.text()),
        _ => "atom:entry".to_owned(),
    }
}
