//! Core logic: the tool-routing agent loop, tool dispatch, conversation
//! history and model access.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentError, AgentStage};
pub use conversation::{ContextWindow, TranscriptSource};
pub use model_client::{ModelError, RetryPolicy};
