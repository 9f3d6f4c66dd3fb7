use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpaqueMessage;
use crate::provider::ModelProviderError;

/// The event stream of one model request.
///
/// Content deltas arrive first, complete tool calls after them, and a
/// single [`ModelResponseEvent::Completed`] closes the stream.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event.
    ///
    /// Yields `Ok(None)` once the stream is exhausted, and keeps yielding
    /// it on later calls. An `Err` ends the response; retrying is up to
    /// the caller, which has to send a new request.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;

    /// Packs the streamed assistant message into history that the same
    /// provider can replay later, tool calls included.
    ///
    /// Returns `None` for providers that keep no private history, in which
    /// case the caller falls back to the plain transcript.
    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        None
    }
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFinishReason {
    /// The model needs to call tools.
    ToolCalls,
    /// The answer is complete.
    Stop,
    /// Generation was cut by the token limit.
    Length,
    /// The provider withheld part of the answer by moderation.
    ContentFilter,
}

/// A tool the model wants to run, with its decoded arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Id assigned by the provider, echoed back in the result.
    pub id: String,
    /// Name of a tool bound to the request.
    pub name: String,
    /// Usually a JSON object. Arguments the provider could not decode are
    /// passed as the raw string.
    pub arguments: Value,
}

impl ToolCallRequest {
    /// Creates a request.
    #[inline]
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        arguments: Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One step of a [`ModelResponse`] stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// No more content or tool calls will follow.
    Completed(ModelFinishReason),
    /// A piece of assistant text.
    MessageDelta(String),
    /// Received a complete tool call request.
    ToolCall(ToolCallRequest),
}
