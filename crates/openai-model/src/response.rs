use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use roomscout_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use serde_json::Value;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, Message, ToolCall};

/// Accumulated state of a streamed completion.
struct StreamState {
    sse: Sse,
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    // Events decoded but not handed out yet. Tool calls are only queued
    // once the model finished, since their arguments arrive in pieces.
    queued: VecDeque<ModelResponseEvent>,
    tool_calls_flushed: bool,
    done: bool,
}

impl StreamState {
    fn new(sse: Sse) -> Self {
        Self {
            sse,
            id: None,
            content: String::new(),
            reasoning_content: None,
            tool_calls: Vec::new(),
            queued: VecDeque::new(),
            tool_calls_flushed: false,
            done: false,
        }
    }

    async fn advance(
        mut self,
    ) -> Result<(Option<ModelResponseEvent>, Self), Error> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Ok((Some(event), self));
            }
            if self.done {
                return Ok((None, self));
            }

            let data = self.sse.next_event().await.map_err(|err| {
                Error::new(format!("stream broken: {err:?}"), ErrorKind::Unavailable)
            })?;
            match data {
                Some(data) if data != "[DONE]" => {
                    trace!("got sse event: {data}");
                    self.apply_chunk(&data)?;
                }
                _ => {
                    self.done = true;
                    self.flush_tool_calls();
                }
            }
        }
    }

    fn apply_chunk(&mut self, data: &str) -> Result<(), Error> {
        let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::InvalidResponse))?;
        if !chunk.id.is_empty()
            && self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::InvalidResponse));
        }

        // Usage trailers come with an empty `choices`.
        let Some(choice) = chunk.choices.into_iter().find(|c| c.index == 0)
        else {
            return Ok(());
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            self.content.push_str(&content);
            self.queued.push_back(ModelResponseEvent::MessageDelta(content));
        }
        if let Some(reasoning) = choice.delta.reasoning_content {
            self.reasoning_content
                .get_or_insert_default()
                .push_str(&reasoning);
        }
        for delta in choice.delta.tool_calls.into_iter().flatten() {
            self.merge_tool_call(delta);
        }

        if let Some(finish_reason) = choice.finish_reason {
            let reason = match finish_reason.as_str() {
                "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
                "length" => ModelFinishReason::Length,
                "content_filter" => ModelFinishReason::ContentFilter,
                "stop" => ModelFinishReason::Stop,
                other => {
                    debug!("unknown finish reason `{other}`, treated as stop");
                    ModelFinishReason::Stop
                }
            };
            self.flush_tool_calls();
            self.queued.push_back(ModelResponseEvent::Completed(reason));
        }
        Ok(())
    }

    fn merge_tool_call(&mut self, delta: ToolCall) {
        let existing = match (delta.index, &delta.id) {
            (Some(index), _) => {
                self.tool_calls.iter_mut().find(|t| t.index == Some(index))
            }
            // Some servers omit the index and send each call whole.
            (None, Some(id)) => {
                self.tool_calls.iter_mut().find(|t| t.id.as_ref() == Some(id))
            }
            (None, None) => self.tool_calls.last_mut(),
        };
        let Some(partial) = existing else {
            self.tool_calls.push(delta);
            return;
        };

        if let Some(id) = delta.id {
            partial.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = delta.r#type {
            partial.r#type = Some(ty);
        }
        let Some(function) = delta.function else {
            return;
        };
        let partial_fn = partial.function.get_or_insert_default();
        if let Some(name) = function.name {
            partial_fn.name.get_or_insert_default().push_str(&name);
        }
        if let Some(arguments) = function.arguments {
            partial_fn.arguments.get_or_insert_default().push_str(&arguments);
        }
    }

    fn flush_tool_calls(&mut self) {
        if self.tool_calls_flushed {
            return;
        }
        self.tool_calls_flushed = true;
        for tool_call in &self.tool_calls {
            let function = tool_call.function.clone().unwrap_or_default();
            self.queued.push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                id: tool_call.id.clone().unwrap_or_default(),
                name: function.name.unwrap_or_default(),
                arguments: parse_arguments(function.arguments.as_deref()),
            }));
        }
    }

    fn into_message(self) -> (String, Message) {
        let message = Message::Assistant {
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls: (!self.tool_calls.is_empty()).then_some(self.tool_calls),
            reasoning_content: self.reasoning_content,
        };
        (self.id.unwrap_or_default(), message)
    }
}

/// Parses streamed tool arguments.
///
/// Empty arguments mean "no arguments". Malformed JSON is kept verbatim
/// as a string, so the tool reports the input as invalid.
fn parse_arguments(arguments: Option<&str>) -> Value {
    let raw = arguments.unwrap_or_default().trim();
    if raw.is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!("malformed tool arguments ({err}): {raw}");
        Value::String(raw.to_owned())
    })
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Advance = Result<(Option<ModelResponseEvent>, StreamState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next: Option<PinnedFuture<Advance>>,
        full_msg: Option<(String, Message)>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let state = StreamState::new(sse);
        Self {
            next: Some(Box::pin(state.advance())),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next) = this.next else {
            return Poll::Ready(Ok(None));
        };
        let result = ready!(next.as_mut().poll(cx));
        *this.next = None;
        match result {
            Ok((Some(event), state)) => {
                *this.next = Some(Box::pin(state.advance()));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, state)) => {
                *this.full_msg = Some(state.into_message());
                Poll::Ready(Ok(None))
            }
            Err(err) => Poll::Ready(Err(err)),
        }
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id.as_str(), msg.clone()))
    }
}
