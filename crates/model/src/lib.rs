//! The protocol between the agent loop and language model providers.
//!
//! A provider turns a [`ModelRequest`] (history, bound tools, sampling
//! options) into a stream of [`ModelResponseEvent`]s. The agent only ever
//! talks to providers through these types, so a hosted chat-completion
//! API and a scripted test model are interchangeable.
//!
//! Types in this crate don't define any behavior, they are the contract
//! that implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
