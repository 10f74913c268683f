//! The LSP Subprocess Bridge: launches one or more external language
//! servers, multiplexes JSON-RPC over a single reader thread per server,
//! and exposes blocking `goto_definition`/`find_references`/
//! `document_symbols` calls used as a fallback by the Symbol Index.
//!
//! One OS thread per server drains its stdout and hands completed
//! responses to whichever caller thread is waiting on a `parking_lot`
//! condition variable, matching the rest of this crate's concurrency
//! model rather than pulling in an async runtime for a handful of
//! blocking subprocess calls.

mod client;
mod protocol;
mod registry;

pub use client::{LspClient, Position};
pub use protocol::{DocumentSymbol, Location};
pub use registry::LspRegistry;
