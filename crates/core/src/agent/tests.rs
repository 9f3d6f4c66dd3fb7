use std::future::ready;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use roomscout_model::{ErrorKind, ModelMessage, ToolCallRequest};
use roomscout_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::tool::{Tool, ToolResult};
use crate::{
    AgentBuilder, AgentError, AgentStage, ContextWindow, RetryPolicy,
    TranscriptSource,
};

static SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "properties": { "city": { "type": "string" } },
        "required": ["city"]
    })
});

#[derive(Deserialize)]
struct Input {
    city: String,
}

struct HotelCount;

impl Tool for HotelCount {
    type Input = Input;

    fn name(&self) -> &str {
        "count_hotels"
    }

    fn description(&self) -> &str {
        "Counts hotels in a city."
    }

    fn parameter_schema(&self) -> &Value {
        &SCHEMA
    }

    fn execute(
        &self,
        input: Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(format!("{}: 3 hotels", input.city)))
    }
}

fn tool_call(id: &str, name: &str, arguments: Value) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest::new(id, name, arguments))
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn test_simple_message() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I do for you?".to_owned()),
    ]));

    let deltas = Arc::new(Mutex::new(String::new()));
    let mut agent = AgentBuilder::with_model_provider(model_provider)
        .on_transcript({
            let deltas = Arc::clone(&deltas);
            move |delta| deltas.lock().unwrap().push_str(delta)
        })
        .build();

    let answer = agent.run_turn("Hello").await.unwrap();
    assert_eq!(answer, "Hi, what can I do for you?");
    assert_eq!(*deltas.lock().unwrap(), answer);
    assert_eq!(agent.stage(), AgentStage::Idle);

    let items = agent.conversation().items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source(), TranscriptSource::User);
    assert_eq!(items[1].transcript(), "Hi, what can I do for you?");
    assert!(matches!(items[1].message(), ModelMessage::Opaque(_)));
}

#[tokio::test]
async fn test_tool_round() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::with_events([
        tool_call("call_1", "count_hotels", json!({ "city": "Paris" })),
        tool_call("call_2", "count_hotels", json!({ "city": "Tokyo" })),
    ]));
    model_provider
        .add_assistant_turn(PresetResponse::text("Paris and Tokyo have 3 each."));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let results = Arc::new(Mutex::new(Vec::new()));
    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_system_prompt("You find hotels.")
        .with_tool(HotelCount)
        .on_tool_call({
            let calls = Arc::clone(&calls);
            move |req| calls.lock().unwrap().push(req.id.clone())
        })
        .on_tool_result({
            let results = Arc::clone(&results);
            move |res| results.lock().unwrap().push(res.content.clone())
        })
        .build();

    let answer = agent.run_turn("How many hotels?").await.unwrap();
    assert_eq!(answer, "Paris and Tokyo have 3 each.");
    assert_eq!(*calls.lock().unwrap(), ["call_1", "call_2"]);
    assert_eq!(
        *results.lock().unwrap(),
        ["Paris: 3 hotels", "Tokyo: 3 hotels"]
    );

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "count_hotels");
    assert_eq!(
        requests[0].messages[0],
        ModelMessage::System("You find hotels.".to_owned())
    );

    let second = &requests[1].messages;
    assert_eq!(second.len(), 5);
    assert!(matches!(&second[2], ModelMessage::Opaque(_)));
    assert!(matches!(
        &second[3],
        ModelMessage::Tool(r) if r.id == "call_1" && r.content == "Paris: 3 hotels"
    ));
    assert!(matches!(&second[4], ModelMessage::Tool(r) if r.id == "call_2"));

    let sources = agent
        .conversation()
        .items()
        .iter()
        .map(|i| i.source())
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        [
            TranscriptSource::User,
            TranscriptSource::Assistant,
            TranscriptSource::Tool,
            TranscriptSource::Tool,
            TranscriptSource::Assistant,
        ]
    );
}

#[tokio::test]
async fn test_unknown_tool_is_reported() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::with_events([tool_call(
        "call_1",
        "book_room",
        json!({}),
    )]));
    model_provider.add_assistant_turn(PresetResponse::text("I can't book rooms."));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(HotelCount)
        .build();

    let answer = agent.run_turn("Book a room").await.unwrap();
    assert_eq!(answer, "I can't book rooms.");

    let requests = model_provider.requests();
    assert!(matches!(
        requests[1].messages.last(),
        Some(ModelMessage::Tool(r)) if r.content == "Error: tool `book_room` not found"
    ));
}

#[tokio::test]
async fn test_iteration_limit() {
    let mut model_provider = TestModelProvider::default();
    for i in 0..3 {
        model_provider.add_assistant_turn(PresetResponse::with_events([
            tool_call(&format!("call_{i}"), "count_hotels", json!({ "city": "Paris" })),
        ]));
    }

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(HotelCount)
        .with_max_iterations(2)
        .build();

    let err = agent.run_turn("Loop forever").await.unwrap_err();
    assert!(matches!(err, AgentError::IterationLimit(2)));
    assert_eq!(model_provider.requests().len(), 3);
    assert!(agent.conversation().is_empty());
    assert_eq!(agent.stage(), AgentStage::Idle);
}

#[tokio::test]
async fn test_retry_then_answer() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_assistant_turn(PresetResponse::text("Finally.").with_failures(2));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_retry_policy(fast_retries())
        .build();

    assert_eq!(agent.run_turn("Hello").await.unwrap(), "Finally.");
    assert_eq!(model_provider.requests().len(), 3);
}

#[tokio::test]
async fn test_failure_rolls_back() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::text("First answer."));
    model_provider.add_assistant_turn(PresetResponse::with_events([
        tool_call("call_1", "count_hotels", json!({ "city": "Tokyo" })),
    ]));
    model_provider
        .add_assistant_turn(PresetResponse::text("Never.").with_failures(0));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(HotelCount)
        .with_retry_policy(fast_retries())
        .build();

    agent.run_turn("Hello").await.unwrap();
    assert_eq!(agent.conversation().len(), 2);

    let err = agent.run_turn("Hotels in Tokyo?").await.unwrap_err();
    match err {
        AgentError::Model(err) => {
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded)
        }
        err => panic!("unexpected error: {err}"),
    }
    assert_eq!(agent.conversation().len(), 2);
    assert_eq!(agent.stage(), AgentStage::Idle);
}

#[tokio::test]
async fn test_empty_input() {
    let model_provider = TestModelProvider::default();
    let mut agent =
        AgentBuilder::with_model_provider(model_provider.clone()).build();

    let err = agent.run_turn("  \n").await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyInput));
    assert!(model_provider.requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_turn_is_dropped() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::text("Hello there."));
    model_provider.set_delay(Duration::from_millis(50));

    let mut agent = AgentBuilder::with_model_provider(model_provider).build();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(5), agent.run_turn("Hi"))
            .await;
    assert!(timed_out.is_err());
    assert_eq!(agent.stage(), AgentStage::Idle);
    assert!(agent.conversation().is_empty());

    let answer = agent.run_turn("Hi again").await.unwrap();
    assert_eq!(answer, "Hello there.");
    let items = agent.conversation().items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].transcript(), "Hi again");
}

#[tokio::test]
async fn test_stage_changes() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::with_events([
        tool_call("call_1", "count_hotels", json!({ "city": "Rome" })),
    ]));
    model_provider.add_assistant_turn(PresetResponse::text("Rome has 3."));

    let stages = Arc::new(Mutex::new(Vec::new()));
    let mut agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(HotelCount)
        .on_stage_change({
            let stages = Arc::clone(&stages);
            move |stage| stages.lock().unwrap().push(stage)
        })
        .build();

    agent.run_turn("Hotels in Rome?").await.unwrap();
    assert_eq!(
        *stages.lock().unwrap(),
        [
            AgentStage::ModelThinking,
            AgentStage::RunningTools,
            AgentStage::ModelThinking,
            AgentStage::Idle,
        ]
    );
}

#[tokio::test]
async fn test_context_window() {
    // The script step is the number of assistant messages in the request,
    // so with a one-turn window every request is answered by step 0.
    let mut model_provider = TestModelProvider::default();
    model_provider.add_assistant_turn(PresetResponse::text("Noted."));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_context_window(ContextWindow::LastTurns(1))
        .build();

    for input in ["one", "two", "three"] {
        assert_eq!(agent.run_turn(input).await.unwrap(), "Noted.");
    }
    assert_eq!(agent.conversation().len(), 6);

    let requests = model_provider.requests();
    assert_eq!(
        requests[2].messages,
        [ModelMessage::User("three".to_owned())]
    );

    agent.reset();
    assert!(agent.conversation().is_empty());
}
