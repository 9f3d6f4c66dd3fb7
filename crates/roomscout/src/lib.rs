//! A hotel-finding chat agent that assembles the built-in tools and an
//! OpenAI-compatible model.
//!
//! [`SessionBuilder`] picks a [`Toolset`] (city directory and Amadeus
//! lookups, or the arithmetic pair) and wires it to a model. The `roomscout`
//! binary, behind the default `cli` feature, runs a session as a terminal
//! chat.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
mod session;
pub mod tools;

pub use session::{Session, SessionBuilder, Toolset, UnknownToolset};

/// Re-exports of [`roomscout_core`] crate.
pub mod core {
    pub use roomscout_core::*;
}
