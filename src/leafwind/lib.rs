//! # Leafwind Architecture
//!
//! Leafwind moves blog posts from WhiteWind (Markdown entries in an AT
//! Protocol repository) to Leaflet (structured block documents). It is a
//! library with a thin CLI client: everything the binary does is reachable
//! through [`api::LeafwindApi`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs, print.rs)                           │
//! │  - argument parsing, colored output, exit codes, logging    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs)                                               │
//! │  - owns config + probe, builds parser options, dispatches   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                   │
//! │  - convert, parse, tid, export, publish, config             │
//! │  - return CmdResult; never print                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  - markdown: Markdown → blocks with byte-offset facets      │
//! │  - tid: sortable record keys                                │
//! │  - blob, color, model: lexicon types and helpers            │
//! │  - probe: image dimension lookups (trait + impls)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Facets Are Byte Ranges
//!
//! Leaflet (like Bluesky rich text) addresses facets by byte offsets into
//! the UTF-8 plaintext. Rust strings are UTF-8, so `str::len` is the
//! measure everywhere; there is no character counting anywhere in the crate.
//!
//! ## Failure Model
//!
//! Markdown never fails to parse: odd syntax becomes plain text, images
//! without a blob CID become links, unknown dimensions become a default
//! square. The only per-entry error is a missing body, and a batch keeps
//! going past it.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: Business logic for each command
//! - [`markdown`]: The block parser
//! - [`tid`]: Record key generation and decoding
//! - [`model`]: Leaflet output records and WhiteWind input types
//! - [`blob`]: Blob URL recognition and link rewriting
//! - [`color`]: Theme color parsing
//! - [`probe`]: Image dimension lookups
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod blob;
pub mod color;
pub mod commands;
pub mod config;
pub mod error;
pub mod markdown;
pub mod model;
pub mod probe;
pub mod tid;
