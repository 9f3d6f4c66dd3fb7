use std::error::Error as StdError;
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use backoff::future::retry_notify;
use roomscout_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
    ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult = Result<ModelClientResponse, ModelError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Box<dyn Fn(&str) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A failed model request.
#[derive(Debug, thiserror::Error)]
#[error("model request failed ({kind}): {source}")]
pub struct ModelError {
    kind: ErrorKind,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl ModelError {
    fn new<E: ModelProviderError>(err: E) -> Self {
        Self {
            kind: err.kind(),
            source: Box::new(err),
        }
    }

    /// Returns the kind reported by the provider.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// How failed connection attempts are retried.
///
/// Only errors whose kind is retryable are retried, and only before the
/// response starts streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between retries.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[inline]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(
        provider: P,
        retry_policy: RetryPolicy,
    ) -> Self {
        let provider = Arc::new(provider);
        // Erase `P` so the agent doesn't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req, on_transcript| {
            let provider = Arc::clone(&provider);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp = connect(&*provider, &req, retry_policy).await?;
                    handle_response(resp, on_transcript).await
                }
                .instrument(debug_span!("model request")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and returns the response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: impl Fn(&str) + Send + 'static,
    ) -> SendRequestResult {
        (self.handler_fn)(req, Box::new(on_transcript)).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    pub transcript: String,
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn connect<P: ModelProvider>(
    provider: &P,
    req: &ModelRequest,
    policy: RetryPolicy,
) -> Result<P::Response, ModelError> {
    let mut attempt = 0;
    retry_notify(
        policy.backoff(),
        || {
            attempt += 1;
            let current = attempt;
            let fut = provider.send_request(req);
            async move {
                fut.await.map_err(|err| {
                    let err = ModelError::new(err);
                    if err.kind.is_retryable() && current <= policy.max_retries
                    {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: ModelError, after: Duration| {
            warn!("{err}, retrying in {after:?}");
        },
    )
    .await
    .inspect_err(|err| error!("giving up: {err}"))
}

async fn handle_response<R: ModelResponse>(
    resp: R,
    on_transcript: Box<dyn Fn(&str) + Send + 'static>,
) -> SendRequestResult {
    let mut transcript = String::new();
    let opaque_msg;
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("response stream failed: {err}");
                return Err(ModelError::new(err));
            }
        };

        let Some(event) = event else {
            // The stream ended without errors, the opaque message is
            // complete now.
            opaque_msg = pinned_resp.make_opaque_message();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                on_transcript(&msg);
                transcript.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use roomscout_model::ModelMessage;
    use roomscout_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };
    use serde_json::json;

    use super::*;

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
        }
    }

    fn hi() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User("Hi".to_owned())],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_assistant_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("How ".to_owned()),
            PresetEvent::MessageDelta("are ".to_owned()),
            PresetEvent::MessageDelta("you?".to_owned()),
        ]));

        let model_client =
            ModelClient::new(model_provider, RetryPolicy::default());

        for _ in 0..3 {
            let deltas = Arc::new(Mutex::new(Vec::new()));
            let resp = model_client
                .send_request(hi(), {
                    let deltas = Arc::clone(&deltas);
                    move |delta| deltas.lock().unwrap().push(delta.to_owned())
                })
                .await
                .unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert!(resp.opaque_msg.is_some());
            assert!(resp.tool_calls.is_empty());
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert_eq!(*deltas.lock().unwrap(), ["How ", "are ", "you?"]);
        }
    }

    #[tokio::test]
    async fn test_collects_tool_calls() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_assistant_turn(PresetResponse::with_events([
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "find_hotels_by_city".to_owned(),
                arguments: json!({ "city": "Paris" }),
            }),
        ]));

        let model_client =
            ModelClient::new(model_provider, RetryPolicy::default());
        let resp = model_client.send_request(hi(), |_| {}).await.unwrap();
        assert_eq!(resp.transcript, "");
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].arguments["city"], "Paris");
        assert_eq!(resp.finish_reason, Some(ModelFinishReason::ToolCalls));
    }

    #[tokio::test]
    async fn test_retry_then_succeed() {
        let mut model_provider = TestModelProvider::default();
        model_provider
            .add_assistant_turn(PresetResponse::text("Hello").with_failures(2));

        let model_client =
            ModelClient::new(model_provider.clone(), fast_retries());
        let resp = model_client.send_request(hi(), |_| {}).await.unwrap();
        assert_eq!(resp.transcript, "Hello");
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let mut model_provider = TestModelProvider::default();
        model_provider
            .add_assistant_turn(PresetResponse::text("Hello").with_failures(0));

        let model_client =
            ModelClient::new(model_provider.clone(), fast_retries());
        let err = model_client.send_request(hi(), |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_error_not_retried() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_assistant_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hotel ".to_owned()),
            PresetEvent::Error(ErrorKind::RateLimitExceeded),
            PresetEvent::MessageDelta("A".to_owned()),
        ]));

        let deltas = Arc::new(Mutex::new(Vec::new()));
        let model_client =
            ModelClient::new(model_provider.clone(), fast_retries());
        let err = model_client
            .send_request(hi(), {
                let deltas = Arc::clone(&deltas);
                move |delta| deltas.lock().unwrap().push(delta.to_owned())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(model_provider.requests().len(), 1);
        assert_eq!(*deltas.lock().unwrap(), ["Hotel "]);
    }

    #[tokio::test]
    async fn test_error_handling() {
        // An empty script answers with a non-retryable error.
        let model_provider = TestModelProvider::default();
        let model_client =
            ModelClient::new(model_provider.clone(), fast_retries());
        let err = model_client.send_request(hi(), |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(model_provider.requests().len(), 1);
    }
}
