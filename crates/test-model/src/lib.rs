//! A scripted fake model for testing the agent loop offline.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use roomscout_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The assistant message recorded in the opaque history item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedTurn {
    /// Index of the script step that produced this turn.
    pub step: usize,
    /// Concatenated message deltas.
    pub text: String,
}

pub struct TestModelResponse {
    step: usize,
    preset: PresetResponse,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let delay = this.delay;
        let timer = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(timer.as_mut().poll(cx));
        this.sleep = None;

        let events = &this.preset.events;
        let idx = this.event_idx;
        this.event_idx = this.event_idx.saturating_add(1);
        let event = match events.get(idx) {
            Some(PresetEvent::MessageDelta(msg)) => {
                ModelResponseEvent::MessageDelta(msg.clone())
            }
            Some(PresetEvent::ToolCall(req)) => {
                ModelResponseEvent::ToolCall(req.clone())
            }
            Some(PresetEvent::Error(kind)) => {
                return Poll::Ready(Err(Error {
                    message: format!("stream broken at event {idx}"),
                    kind: *kind,
                }));
            }
            None if idx == events.len() => {
                ModelResponseEvent::Completed(if this.preset.has_tool_call() {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                })
            }
            None => return Poll::Ready(Ok(None)),
        };
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let text = self
            .preset
            .events
            .iter()
            .filter_map(|event| match event {
                PresetEvent::MessageDelta(msg) => Some(msg.as_str()),
                PresetEvent::ToolCall(_) | PresetEvent::Error(_) => None,
            })
            .collect();
        let turn = ScriptedTurn {
            step: self.step,
            text,
        };
        Some(OpaqueMessage::new(format!("msg:{}", self.step), turn))
    }
}

#[derive(Default)]
struct Recorder {
    attempts: Vec<u64>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// The script is a list of assistant turns. A request is answered by the
/// turn whose index equals the number of assistant messages already in
/// the request, so a conversation with tool rounds walks the script in
/// order. Requests past the end of the script fail with a non-retryable
/// error.
///
/// Clones share the same script and request log.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    delay: Option<Duration>,
    recorder: Arc<Mutex<Recorder>>,
}

impl TestModelProvider {
    /// Appends an assistant turn to the script.
    #[inline]
    pub fn add_assistant_turn(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, failed attempts included.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.recorder().requests.clone()
    }

    fn recorder(&self) -> MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let step = req.messages.iter().filter(|m| m.is_assistant()).count();

        let mut recorder = self.recorder();
        recorder.requests.push(req.clone());

        let result = 'blk: {
            let Some(preset) = self.script.get(step) else {
                break 'blk Err(Error {
                    message: format!("no preset for step {step}"),
                    kind: ErrorKind::Other,
                });
            };

            if recorder.attempts.len() <= step {
                recorder.attempts.resize(step + 1, 0);
            }
            recorder.attempts[step] += 1;
            if preset.fails_on(recorder.attempts[step]) {
                break 'blk Err(Error {
                    message: format!("scripted failure at step {step}"),
                    kind: ErrorKind::RateLimitExceeded,
                });
            }

            Ok(TestModelResponse {
                step,
                preset: preset.clone(),
                event_idx: 0,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            })
        };
        ready(result)
    }
}
