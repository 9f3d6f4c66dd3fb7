use std::collections::HashMap;

use roomscout_model::{ModelTool, ToolCallRequest, ToolCallResult};
use tracing::Instrument;

use crate::tool::{ErasedTool, Error, Tool};

/// The table of tools the model may call, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn ErasedTool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. A tool with the same name is replaced.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self
            .tools
            .insert(name.clone(), Box::new(tool))
            .is_some()
        {
            warn!("tool `{name}` registered twice, keeping the latest one");
        }
    }

    /// Returns `true` if a tool with this name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the definitions bound to model requests, sorted by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions = self
            .tools
            .values()
            .map(|tool| tool.definition())
            .collect::<Vec<_>>();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Runs one tool call. Failures, including unknown tools, become the
    /// content of the result.
    pub async fn call(&self, req: ToolCallRequest) -> ToolCallResult {
        let ToolCallRequest {
            id,
            name,
            arguments,
        } = req;

        let output = match self.tools.get(&name) {
            Some(tool) => {
                trace!("calling tool `{name}` ({id}) with args: {arguments}");
                tool.invoke(arguments)
                    .instrument(debug_span!("tool execute", tool = %name))
                    .await
            }
            None => {
                warn!("tool not found: {name}");
                Err(Error::not_found()
                    .with_reason(format!("tool `{name}` not found")))
            }
        };
        let content = match output {
            Ok(content) => content,
            Err(err) => {
                debug!("tool `{name}` failed: {err}");
                err.to_string()
            }
        };
        ToolCallResult { id, name, content }
    }

    /// Runs the calls one after another in request order, producing one
    /// result per request.
    pub async fn dispatch(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            results.push(self.call(req).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::LazyLock;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::ToolResult;

    static CITY_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
        json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        })
    });

    static ANY_SCHEMA: LazyLock<Value> =
        LazyLock::new(|| json!({ "type": "object" }));

    #[derive(Deserialize)]
    struct CityInput {
        city: String,
    }

    struct CapitalTool;

    impl Tool for CapitalTool {
        type Input = CityInput;

        fn name(&self) -> &str {
            "is_capital"
        }

        fn description(&self) -> &str {
            "\n  Tells whether a city is a capital.\n"
        }

        fn parameter_schema(&self) -> &Value {
            &CITY_SCHEMA
        }

        fn execute(
            &self,
            input: CityInput,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(match input.city.as_str() {
                "Paris" | "Tokyo" => Ok("yes".to_owned()),
                "New York" => Ok("no".to_owned()),
                _ => Err(Error::execution_error().with_reason("unknown city")),
            })
        }
    }

    struct EchoTool;

    impl Tool for EchoTool {
        type Input = Value;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its arguments."
        }

        fn parameter_schema(&self) -> &Value {
            &ANY_SCHEMA
        }

        fn execute(
            &self,
            input: Value,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.to_string()))
        }
    }

    /// Registered under the same name as [`EchoTool`].
    struct MuteTool;

    impl Tool for MuteTool {
        type Input = Value;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Ignores its arguments."
        }

        fn parameter_schema(&self) -> &Value {
            &ANY_SCHEMA
        }

        fn execute(
            &self,
            _input: Value,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok("(silence)".to_owned()))
        }
    }

    fn request(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest::new(id, name, arguments)
    }

    #[test]
    fn test_definitions_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(CapitalTool);
        registry.register(EchoTool);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
        let definitions = registry.definitions();
        let names = definitions.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["echo", "is_capital"]);
        assert_eq!(definitions[1].description, "Tells whether a city is a capital.");
        assert_eq!(definitions[1].parameters["required"], json!(["city"]));
    }

    #[tokio::test]
    async fn test_duplicate_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(MuteTool);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].description, "Ignores its arguments.");

        let results = registry
            .dispatch(vec![request("call_1", "echo", json!({ "a": 1 }))])
            .await;
        assert_eq!(results[0].content, "(silence)");
    }

    #[tokio::test]
    async fn test_dispatch_in_order() {
        let mut registry = ToolRegistry::new();
        registry.register(CapitalTool);
        registry.register(EchoTool);

        let results = registry
            .dispatch(vec![
                request("call_1", "is_capital", json!({ "city": "New York" })),
                request("call_2", "echo", json!({ "a": 1 })),
                request("call_3", "is_capital", json!({ "city": "Paris" })),
            ])
            .await;

        let summary = results
            .iter()
            .map(|r| (r.id.as_str(), r.name.as_str(), r.content.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            [
                ("call_1", "is_capital", "no"),
                ("call_2", "echo", "{\"a\":1}"),
                ("call_3", "is_capital", "yes"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_become_content() {
        let mut registry = ToolRegistry::new();
        registry.register(CapitalTool);

        let result = registry
            .call(request("call_1", "book_room", json!({})))
            .await;
        assert_eq!(result.name, "book_room");
        assert_eq!(result.content, "Error: tool `book_room` not found");

        let result = registry
            .call(request("call_2", "is_capital", json!({ "town": "Paris" })))
            .await;
        assert_eq!(
            result.content,
            "Error: invalid arguments: missing field `city`"
        );

        let result = registry
            .call(request("call_3", "is_capital", json!({ "city": "Lyon" })))
            .await;
        assert_eq!(result.content, "Error: unknown city");
    }
}
