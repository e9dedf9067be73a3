//! # exif-query
//!
//! A small web backend that proxies images from a remote bucket and answers
//! questions about their EXIF metadata.
//!
//! # Architecture: One Pipeline, Two Front Doors
//!
//! Every metadata request, whether it arrives as JSON on `POST /query` or as
//! an HTML form on `POST /view`, runs the same four steps:
//!
//! ```text
//! 1. Acquire   upload | bucket identifier  →  image bytes
//! 2. Decode    image bytes                 →  Metadata   (namespace → field → value)
//! 3. Parse     query expressions           →  Selectors  (closed grammar, no code)
//! 4. Extract   Metadata × Selectors        →  ExtractedData (field → matches)
//! ```
//!
//! Expressions are parsed before any network or decoding work, so a rejected
//! query costs nothing upstream.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `exif-query.toml` loading, merging over stock defaults, validation |
//! | [`store`] | Remote bucket client: identifier validation, image fetch, catalog, credentials |
//! | [`metadata`] | EXIF decoding into the namespaced [`metadata::Metadata`] object |
//! | [`selector`] | Field-selector grammar, evaluation, and result mapping |
//! | [`query`] | The acquire → decode → extract pipeline and request payload parsing |
//! | [`routes`] | JSON API handlers |
//! | [`ui`] | Server-rendered HTML front end using Maud |
//! | [`error`] | [`error::AppError`] and its HTTP status / JSON body mapping |
//! | [`server`] | Router assembly, shared state, serve loop with graceful shutdown |
//! | [`output`] | CLI output formatting for `inspect` |
//!
//! # Design Decisions
//!
//! ## A Closed Query Grammar
//!
//! Queries are `Namespace.Field` lookups, optionally prefixed with `$..` or
//! `$.`. There are no filters, no wildcards, no script expressions. The
//! grammar is small enough to validate with a character class and a length
//! cap, and evaluating a selector is a map lookup. See [`selector`].
//!
//! ## Stateless Requests
//!
//! Nothing is cached between requests. The only shared state is the
//! validated configuration and one pooled HTTP client, both immutable after
//! startup, so handlers need no locks.
//!
//! ## Decoding Off the Async Runtime
//!
//! EXIF parsing is CPU-bound and runs on Tokio's blocking pool so a large
//! upload cannot stall the reactor.

pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod query;
pub mod routes;
pub mod selector;
pub mod server;
pub mod store;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_helpers;
