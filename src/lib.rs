//! Conformance checker for SDShare syndication servers.
//!
//! An SDShare server publishes a small hierarchy of Atom feeds: an overview
//! feed pointing at collection feeds, each of which points at a fragments
//! feed and zero or more snapshots feeds. This crate crawls that hierarchy,
//! validates the structure of every document against the protocol rules,
//! and probes each discovered resource URI with content-negotiation checks.
//!
//! Violations are collected into a [`report::Report`] rather than aborting
//! the crawl, so one run surfaces every problem it can reach.

pub mod config;
pub mod crawl;
pub mod feed;
pub mod media_type;
pub mod report;
pub mod schema;
