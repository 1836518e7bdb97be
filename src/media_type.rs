//! MIME media type parsing and compatibility matching.
//!
//! SDShare hinges on content negotiation: link `type` attributes declare what
//! a resource should serve, and responses must come back with a compatible
//! `Content-Type`. Compatibility is deliberately non-symmetric — the required
//! side constrains, the candidate side may add parameters (a server is free
//! to append `charset`, but a required `version` must match exactly).

use std::fmt;
use thiserror::Error;

/// The Atom feed media type, assumed whenever a feed-discovery link omits
/// its `type` attribute.
pub const ATOM_XML: &str = "application/atom+xml";

/// Errors raised while parsing a media type string.
#[derive(Debug, Error)]
pub enum MediaTypeError {
    /// The string has no '/' separator between type and subtype.
    #[error("invalid media type '{0}': missing '/' separator")]
    MissingSlash(String),
    /// Type or subtype is empty (e.g. "/xml" or "application/").
    #[error("invalid media type '{0}': empty type or subtype")]
    EmptyComponent(String),
}

/// A parsed media type: type, subtype, and ordered parameters.
///
/// Type, subtype, and parameter keys are lowercased at parse time so equality
/// checks are case-insensitive; parameter values keep their original case and
/// compare case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parses a media type string such as `application/x-tm+xml;version=1.0`.
    ///
    /// Parameters without an '=' are ignored, matching lenient server
    /// behaviour; quotes around parameter values are stripped.
    pub fn parse(s: &str) -> Result<Self, MediaTypeError> {
        let mut parts = s.split(';');
        // split always yields at least one item
        let essence = parts.next().unwrap_or("").trim();

        let (type_, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MediaTypeError::MissingSlash(s.to_owned()))?;
        if type_.is_empty() || subtype.is_empty() {
            return Err(MediaTypeError::EmptyComponent(s.to_owned()));
        }

        let mut params = Vec::new();
        for part in parts {
            if let Some((key, value)) = part.split_once('=') {
                let key = key.trim().to_ascii_lowercase();
                if key.is_empty() {
                    continue;
                }
                let value = value.trim().trim_matches('"').to_owned();
                params.push((key, value));
            }
        }

        Ok(Self {
            type_: type_.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            params,
        })
    }

    /// Returns true when `candidate` satisfies every constraint of `self`.
    ///
    /// Type and subtype must match exactly (case-insensitive, no wildcards —
    /// the protocol never needs them), and every parameter present on `self`
    /// must appear on `candidate` with an equal value. Extra candidate
    /// parameters are permitted.
    pub fn is_compatible(&self, candidate: &MediaType) -> bool {
        if self.type_ != candidate.type_ || self.subtype != candidate.subtype {
            return false;
        }
        self.params.iter().all(|(key, value)| {
            candidate
                .params
                .iter()
                .any(|(ck, cv)| ck == key && cv == value)
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, ";{}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plain() {
        let mt = MediaType::parse("application/atom+xml").unwrap();
        assert_eq!(mt.to_string(), "application/atom+xml");
    }

    #[test]
    fn test_parse_with_params() {
        let mt = MediaType::parse("application/x-tm+xml; version=1.0").unwrap();
        assert_eq!(mt.to_string(), "application/x-tm+xml;version=1.0");
    }

    #[test]
    fn test_parse_missing_slash_fails() {
        assert!(matches!(
            MediaType::parse("atomfeed"),
            Err(MediaTypeError::MissingSlash(_))
        ));
    }

    #[test]
    fn test_parse_empty_subtype_fails() {
        assert!(MediaType::parse("application/").is_err());
        assert!(MediaType::parse("/xml").is_err());
    }

    #[test]
    fn test_compatible_exact_match() {
        let a = MediaType::parse("application/atom+xml").unwrap();
        let b = MediaType::parse("application/atom+xml").unwrap();
        assert!(a.is_compatible(&b));
    }

    #[test]
    fn test_compatible_case_insensitive_essence() {
        let a = MediaType::parse("Application/Atom+XML").unwrap();
        let b = MediaType::parse("application/atom+xml").unwrap();
        assert!(a.is_compatible(&b));
        assert!(b.is_compatible(&a));
    }

    #[test]
    fn test_candidate_may_add_parameters() {
        let required = MediaType::parse("application/atom+xml").unwrap();
        let candidate = MediaType::parse("application/atom+xml; charset=utf-8").unwrap();
        assert!(required.is_compatible(&candidate));
        // the reverse direction is constrained
        assert!(!candidate.is_compatible(&required));
    }

    #[test]
    fn test_required_parameter_must_match() {
        let required = MediaType::parse("application/x-tm+xml;version=1.0").unwrap();
        let wrong = MediaType::parse("application/x-tm+xml;version=2.0").unwrap();
        let right = MediaType::parse("application/x-tm+xml;version=1.0;charset=utf-8").unwrap();
        assert!(!required.is_compatible(&wrong));
        assert!(required.is_compatible(&right));
    }

    #[test]
    fn test_parameter_values_case_sensitive() {
        let required = MediaType::parse("application/x-tm+xml;version=a").unwrap();
        let candidate = MediaType::parse("application/x-tm+xml;version=A").unwrap();
        assert!(!required.is_compatible(&candidate));
    }

    #[test]
    fn test_different_subtype_incompatible() {
        let a = MediaType::parse("application/atom+xml").unwrap();
        let b = MediaType::parse("application/rdf+xml").unwrap();
        assert!(!a.is_compatible(&b));
    }

    fn param_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9.]{1,8}"), 0..4)
    }

    proptest! {
        // A's parameters being a subset of B's (by key and value) implies
        // compatibility; changing any required value breaks it.
        #[test]
        fn prop_param_subset_is_compatible(
            params in param_strategy(),
            extra in param_strategy(),
        ) {
            let fmt_params = |ps: &[(String, String)]| {
                ps.iter()
                    .map(|(k, v)| format!(";{}={}", k, v))
                    .collect::<String>()
            };
            let required =
                MediaType::parse(&format!("application/atom+xml{}", fmt_params(&params)))
                    .unwrap();
            let mut all = params.clone();
            all.extend(extra);
            let candidate =
                MediaType::parse(&format!("application/atom+xml{}", fmt_params(&all))).unwrap();
            prop_assert!(required.is_compatible(&candidate));
        }

        #[test]
        fn prop_changed_param_value_incompatible(
            key in "[a-z]{1,8}",
            value in "[a-z]{1,8}",
        ) {
            let required =
                MediaType::parse(&format!("application/atom+xml;{}={}", key, value)).unwrap();
            let candidate =
                MediaType::parse(&format!("application/atom+xml;{}={}x", key, value)).unwrap();
            prop_assert!(!required.is_compatible(&candidate));
        }
    }
}
