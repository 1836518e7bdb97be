//! Grammar-validation seam.
//!
//! The structural validators in [`crate::feed::validate`] carry the protocol
//! rules; a grammar check (e.g. RELAX NG against the Atom schema) is an
//! additional, independent layer. This crate ships no schema engine — the
//! capability is an injected dependency supplied by library consumers, so no
//! resource-loading mechanism is baked in.

use url::Url;

/// An externally supplied document-grammar validator.
///
/// `check` returns `Ok(false)` when the document fails the grammar, which
/// the walker reports as a violation attributed to `uri`. An `Err` means
/// the validator itself could not run and is reported likewise.
pub trait GrammarCheck: Send + Sync {
    fn check(&self, uri: &Url, body: &[u8]) -> anyhow::Result<bool>;
}
