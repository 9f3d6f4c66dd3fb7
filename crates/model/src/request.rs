use serde_json::Value;

use crate::OpaqueMessage;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are bound to this request.
    pub tools: Vec<ModelTool>,
    /// Sampling options. Unset fields fall back to provider defaults.
    pub options: GenerationOptions,
}

/// Sampling options for a single request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Upper bound of generated tokens.
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Fills unset fields from `defaults`.
    #[inline]
    pub fn or(self, defaults: GenerationOptions) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature.or(defaults.temperature),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
        }
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// A tool call result.
    Tool(ToolCallResult),
    /// An assistant message in the provider's own shape.
    Opaque(OpaqueMessage),
}

impl ModelMessage {
    /// Returns `true` for messages produced by the model.
    #[inline]
    pub fn is_assistant(&self) -> bool {
        matches!(self, ModelMessage::Assistant(_) | ModelMessage::Opaque(_))
    }
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// Id of the tool call request this result answers.
    pub id: String,
    /// Name of the tool that was called.
    pub name: String,
    /// The output of the tool.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool, as a
    /// [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
