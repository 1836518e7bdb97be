//! Content-negotiation probes against discovered resource URIs.

use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::crawl::fetch::fetch;
use crate::media_type::{MediaType, ATOM_XML};
use crate::report::{FeedKind, Violation};

/// A fabricated, unregistered media type no conformant server supports.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/x-hello-iam+unknown";

/// Probes `url` with an Accept header no server can honour.
///
/// Acceptable outcomes are 406 Not Acceptable, or a 2xx whose content type
/// is compatible with the Atom feed media type (a server may substitute a
/// reasonable alternative). Anything else is a violation.
pub async fn check_unsupported(
    client: &reqwest::Client,
    url: &Url,
    kind: FeedKind,
    timeout: Duration,
) -> Option<Violation> {
    let fetched = match fetch(client, url, UNKNOWN_MEDIA_TYPE, timeout).await {
        Ok(f) => f,
        Err(e) => {
            return Some(Violation::new(
                kind,
                url.as_str(),
                format!("unsupported-media-type probe failed: {}", e),
            ))
        }
    };

    if fetched.status == StatusCode::NOT_ACCEPTABLE {
        return None;
    }

    if fetched.status.is_success() {
        return match response_media_type(&fetched.content_type, url, kind) {
            Err(violation) => Some(violation),
            Ok(actual) => {
                let Ok(atom) = MediaType::parse(ATOM_XML) else {
                    return None;
                };
                if atom.is_compatible(&actual) {
                    None
                } else {
                    Some(Violation::new(
                        kind,
                        url.as_str(),
                        format!(
                            "expected 406 Not Acceptable or an Atom-compatible fallback for Accept: {}, got {} with content type {}",
                            UNKNOWN_MEDIA_TYPE, fetched.status, actual
                        ),
                    ))
                }
            }
        };
    }

    Some(Violation::new(
        kind,
        url.as_str(),
        format!(
            "expected 406 Not Acceptable or a 2xx Atom fallback for Accept: {}, got {}",
            UNKNOWN_MEDIA_TYPE, fetched.status
        ),
    ))
}

/// Requests `url` with `Accept: expected` and requires a 2xx response whose
/// content type is compatible with `expected`.
pub async fn check_expected(
    client: &reqwest::Client,
    url: &Url,
    expected: &MediaType,
    kind: FeedKind,
    timeout: Duration,
) -> Option<Violation> {
    let accept = expected.to_string();
    let fetched = match fetch(client, url, &accept, timeout).await {
        Ok(f) => f,
        Err(e) => {
            return Some(Violation::new(
                kind,
                url.as_str(),
                format!("fetch failed: {}", e),
            ))
        }
    };

    if !fetched.status.is_success() {
        return Some(Violation::new(
            kind,
            url.as_str(),
            format!("expected a success status for Accept: {}, got {}", accept, fetched.status),
        ));
    }

    match response_media_type(&fetched.content_type, url, kind) {
        Err(violation) => Some(violation),
        Ok(actual) => {
            if expected.is_compatible(&actual) {
                None
            } else {
                Some(Violation::new(
                    kind,
                    url.as_str(),
                    format!(
                        "expected a content type compatible with {}, got {}",
                        expected, actual
                    ),
                ))
            }
        }
    }
}

fn response_media_type(
    content_type: &Option<String>,
    url: &Url,
    kind: FeedKind,
) -> Result<MediaType, Violation> {
    let raw = content_type.as_deref().ok_or_else(|| {
        Violation::new(kind, url.as_str(), "response has no Content-Type header")
    })?;
    MediaType::parse(raw).map_err(|e| {
        Violation::new(kind, url.as_str(), format!("unparseable Content-Type: {}", e))
    })
}
