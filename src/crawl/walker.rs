//! The feed-graph walker driving a full conformance crawl.
//!
//! Starting from the overview feed, the walker follows `collectionfeed`
//! links, then each collection's `fragmentsfeed` and `snapshotsfeed` links,
//! paging fragments feeds along `next`. Every document is structurally
//! validated on arrival; every discovered resource URI gets the
//! content-negotiation probes from [`super::conneg`].
//!
//! The crawl is strictly sequential: one outstanding request at a time, one
//! document processed to completion before the next fetch. Pagination is a
//! bounded loop over a visited-URI set rather than open recursion, since the
//! protocol gives no acyclicity guarantee for `next` chains. By default a
//! violating document ends its branch (fail-fast); sibling branches are
//! unaffected either way.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::crawl::conneg::{check_expected, check_unsupported};
use crate::crawl::fetch::fetch;
use crate::feed::{links, validate_feed, AuthorRule, Document, Namespaces, Rel, TypedLink};
use crate::media_type::{MediaType, ATOM_XML};
use crate::report::{FeedKind, Report, Violation};
use crate::schema::GrammarCheck;

/// Tunables for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Which reading of the empty-feed author rule to apply.
    pub author_rule: AuthorRule,
    /// Keep descending past structural violations instead of pruning the
    /// branch.
    pub keep_going: bool,
    /// Upper bound on pages followed along one `next` chain.
    pub max_pages: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            author_rule: AuthorRule::Relaxed,
            keep_going: false,
            max_pages: 100,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Crawls one server and accumulates a [`Report`].
pub struct Walker {
    client: reqwest::Client,
    options: CrawlOptions,
    namespaces: Namespaces,
    grammar: Option<Arc<dyn GrammarCheck>>,
}

impl Walker {
    pub fn new(client: reqwest::Client, options: CrawlOptions) -> Self {
        Self {
            client,
            options,
            namespaces: Namespaces::default(),
            grammar: None,
        }
    }

    /// Layers an injected grammar validator over the structural checks.
    pub fn with_grammar(mut self, grammar: Arc<dyn GrammarCheck>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Runs the crawl from the server's overview feed.
    ///
    /// The walk is read-only and stateless across runs: crawling an
    /// unchanged server twice yields the same report.
    pub async fn run(&self, server: &Url) -> Report {
        let mut report = Report::default();
        tracing::info!(server = %server, "starting conformance crawl");

        let Some(overview) = self
            .fetch_feed(server.clone(), FeedKind::Overview, &mut report)
            .await
        else {
            return report;
        };

        let findings = validate_feed(
            &overview,
            FeedKind::Overview,
            &self.namespaces,
            self.options.author_rule,
        );
        let clean = findings.is_clean();
        report.merge(findings);
        if !clean && !self.options.keep_going {
            return report;
        }

        let ns = &self.namespaces;
        for entry in overview.root().children(ns.atom, "entry") {
            let collection_links = match links(entry, Rel::CollectionFeed, ns, true) {
                Ok(found) => found,
                // missing href was already reported by the validator
                Err(e) => {
                    tracing::debug!(error = %e, "skipping untraversable collectionfeed link");
                    continue;
                }
            };
            for link in collection_links {
                let Some(target) =
                    resolve(&overview, &link.href, FeedKind::Overview, &mut report)
                else {
                    continue;
                };
                self.probe(&target, &link, Rel::CollectionFeed, FeedKind::Overview, &mut report)
                    .await;
                self.walk_collection(target, &mut report).await;
            }
        }

        tracing::info!(
            violations = report.violations.len(),
            warnings = report.warnings.len(),
            "crawl finished"
        );
        report
    }

    async fn walk_collection(&self, url: Url, report: &mut Report) {
        let Some(doc) = self.fetch_feed(url, FeedKind::Collection, report).await else {
            return;
        };
        let findings = validate_feed(
            &doc,
            FeedKind::Collection,
            &self.namespaces,
            self.options.author_rule,
        );
        let clean = findings.is_clean();
        report.merge(findings);
        if !clean && !self.options.keep_going {
            return;
        }

        let ns = &self.namespaces;
        for entry in doc.root().children(ns.atom, "entry") {
            for (rel, descend_kind) in [
                (Rel::FragmentsFeed, FeedKind::Fragments),
                (Rel::SnapshotsFeed, FeedKind::Snapshots),
            ] {
                let found = match links(entry, rel, ns, true) {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::debug!(error = %e, rel = rel.local(), "skipping untraversable link");
                        continue;
                    }
                };
                for link in found {
                    let Some(target) = resolve(&doc, &link.href, FeedKind::Collection, report)
                    else {
                        continue;
                    };
                    self.probe(&target, &link, rel, FeedKind::Collection, report).await;
                    match descend_kind {
                        FeedKind::Fragments => self.walk_fragments(target, report).await,
                        _ => self.walk_snapshots(target, report).await,
                    }
                }
            }
        }
    }

    /// Follows a fragments feed along its `next` chain.
    async fn walk_fragments(&self, start: Url, report: &mut Report) {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = start;
        let mut pages = 0usize;

        loop {
            if !visited.insert(current.to_string()) {
                report.push(Violation::new(
                    FeedKind::Fragments,
                    current.as_str(),
                    "pagination loop: this page was already visited on the 'next' chain",
                ));
                return;
            }
            pages += 1;
            if pages > self.options.max_pages {
                report.push(Violation::new(
                    FeedKind::Fragments,
                    current.as_str(),
                    format!(
                        "'next' chain did not terminate within {} pages",
                        self.options.max_pages
                    ),
                ));
                return;
            }

            let Some(doc) = self
                .fetch_feed(current.clone(), FeedKind::Fragments, report)
                .await
            else {
                return;
            };
            let findings = validate_feed(
                &doc,
                FeedKind::Fragments,
                &self.namespaces,
                self.options.author_rule,
            );
            let clean = findings.is_clean();
            report.merge(findings);
            if !clean && !self.options.keep_going {
                return;
            }

            self.probe_entry_resources(&doc, FeedKind::Fragments, report).await;

            let nexts = match links(doc.root(), Rel::Next, &self.namespaces, false) {
                Ok(found) => found,
                Err(_) => return, // missing href already reported
            };
            // zero: chain complete; two or more: reported by the validator
            if nexts.len() != 1 {
                return;
            }
            let Some(target) = resolve(&doc, &nexts[0].href, FeedKind::Fragments, report) else {
                return;
            };
            current = target;
        }
    }

    /// Snapshots feeds are terminal: validate and probe, no paging.
    async fn walk_snapshots(&self, url: Url, report: &mut Report) {
        let Some(doc) = self.fetch_feed(url, FeedKind::Snapshots, report).await else {
            return;
        };
        let findings = validate_feed(
            &doc,
            FeedKind::Snapshots,
            &self.namespaces,
            self.options.author_rule,
        );
        let clean = findings.is_clean();
        report.merge(findings);
        if !clean && !self.options.keep_going {
            return;
        }
        self.probe_entry_resources(&doc, FeedKind::Snapshots, report).await;
    }

    /// Content-negotiation probes for the resource links of every entry:
    /// `fragment`/`snapshot` targets, plus `alternate` targets that declare
    /// a media type.
    async fn probe_entry_resources(&self, doc: &Document, kind: FeedKind, report: &mut Report) {
        let ns = &self.namespaces;
        let rel = match kind {
            FeedKind::Fragments => Rel::Fragment,
            FeedKind::Snapshots => Rel::Snapshot,
            _ => return,
        };

        for entry in doc.root().children(ns.atom, "entry") {
            if kind == FeedKind::Fragments
                && entry.children(ns.sdshare, "resource").next().is_none()
            {
                continue;
            }

            let found = match links(entry, rel, ns, false) {
                Ok(found) => found,
                Err(_) => continue, // missing href already reported
            };
            for link in &found {
                let Some(target) = resolve(doc, &link.href, kind, report) else {
                    continue;
                };
                self.probe(&target, link, rel, kind, report).await;
            }

            // An alternate link with a declared type is a negotiable
            // resource too; untyped alternates are left alone.
            for link_el in entry.children(ns.atom, "link") {
                if link_el.attr("rel") != Some("alternate") {
                    continue;
                }
                let Some(declared) = link_el.attr("type") else {
                    continue;
                };
                if declared.is_empty() {
                    continue;
                }
                let Some(href) = link_el.attr("href") else {
                    continue; // reported by the validator
                };
                let Some(target) = resolve(doc, href, kind, report) else {
                    continue;
                };
                let link = TypedLink {
                    href: href.to_owned(),
                    media_type: Some(declared.to_owned()),
                };
                self.probe(&target, &link, Rel::Alternate, kind, report).await;
            }
        }
    }

    /// Expected-type retrieval check plus the unsupported-media-type probe
    /// for one discovered URI.
    async fn probe(
        &self,
        url: &Url,
        link: &TypedLink,
        rel: Rel,
        kind: FeedKind,
        report: &mut Report,
    ) {
        match link.media_type.as_deref() {
            // resource links without a type were already reported; there is
            // no expected type to negotiate for
            None | Some("") => return,
            Some(raw) => match MediaType::parse(raw) {
                Ok(expected) => {
                    if let Some(v) =
                        check_expected(&self.client, url, &expected, kind, self.options.timeout)
                            .await
                    {
                        report.push(v);
                    }
                }
                Err(e) => report.push(Violation::new(
                    kind,
                    url.as_str(),
                    format!("unparseable type attribute on '{}' link: {}", rel.local(), e),
                )),
            },
        }

        if let Some(v) = check_unsupported(&self.client, url, kind, self.options.timeout).await {
            report.push(v);
        }
    }

    /// Fetches a feed URI with `Accept: application/atom+xml`, requiring a
    /// success status and an Atom-compatible content type, then parses it.
    /// Failures are recorded against `url` and end the branch.
    async fn fetch_feed(&self, url: Url, kind: FeedKind, report: &mut Report) -> Option<Document> {
        let fetched = match fetch(&self.client, &url, ATOM_XML, self.options.timeout).await {
            Ok(f) => f,
            Err(e) => {
                report.push(Violation::new(kind, url.as_str(), format!("fetch failed: {}", e)));
                return None;
            }
        };

        if !fetched.status.is_success() {
            report.push(Violation::new(
                kind,
                url.as_str(),
                format!("expected a success status for the feed, got {}", fetched.status),
            ));
            return None;
        }

        match &fetched.content_type {
            None => {
                report.push(Violation::new(kind, url.as_str(), "response has no Content-Type header"));
                return None;
            }
            Some(raw) => match MediaType::parse(raw) {
                Err(e) => {
                    report.push(Violation::new(
                        kind,
                        url.as_str(),
                        format!("unparseable Content-Type: {}", e),
                    ));
                    return None;
                }
                Ok(actual) => {
                    let Ok(atom) = MediaType::parse(ATOM_XML) else {
                        return None;
                    };
                    if !atom.is_compatible(&actual) {
                        report.push(Violation::new(
                            kind,
                            url.as_str(),
                            format!(
                                "expected a content type compatible with {}, got {}",
                                ATOM_XML, actual
                            ),
                        ));
                        return None;
                    }
                }
            },
        }

        if let Some(grammar) = &self.grammar {
            match grammar.check(&url, &fetched.body) {
                Ok(true) => {}
                Ok(false) => report.push(Violation::new(
                    kind,
                    url.as_str(),
                    "document failed grammar validation",
                )),
                Err(e) => report.push(Violation::new(
                    kind,
                    url.as_str(),
                    format!("grammar validation error: {}", e),
                )),
            }
        }

        match Document::parse(&fetched.body, url.clone()) {
            Ok(doc) => Some(doc),
            Err(e) => {
                report.push(Violation::new(kind, url.as_str(), e.to_string()));
                None
            }
        }
    }
}

fn resolve(doc: &Document, href: &str, kind: FeedKind, report: &mut Report) -> Option<Url> {
    match doc.resolve(href) {
        Ok(url) => Some(url),
        Err(e) => {
            report.push(Violation::new(
                kind,
                doc.base().as_str(),
                format!("cannot resolve href '{}': {}", href, e),
            ));
            None
        }
    }
}
