use std::sync::Arc;

use roomscout_model::{
    GenerationOptions, ModelProvider, ToolCallRequest, ToolCallResult,
};

use super::{
    Agent, AgentStage, StageFn, ToolCallFn, ToolResultFn, TranscriptFn,
};
use crate::conversation::{ContextWindow, Conversation};
use crate::model_client::{ModelClient, RetryPolicy};
use crate::tool::{Tool, ToolRegistry};

const DEFAULT_MAX_ITERATIONS: usize = 8;

/// [`Agent`] builder.
pub struct AgentBuilder<P> {
    provider: P,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    max_iterations: usize,
    context_window: ContextWindow,
    retry_policy: RetryPolicy,
    options: GenerationOptions,
    on_transcript: Option<TranscriptFn>,
    on_tool_call: Option<ToolCallFn>,
    on_tool_result: Option<ToolResultFn>,
    on_stage_change: Option<StageFn>,
}

impl<P: ModelProvider + 'static> AgentBuilder<P> {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider(provider: P) -> Self {
        Self {
            provider,
            tools: ToolRegistry::new(),
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            context_window: ContextWindow::default(),
            retry_policy: RetryPolicy::default(),
            options: GenerationOptions::default(),
            on_transcript: None,
            on_tool_call: None,
            on_tool_result: None,
            on_stage_change: None,
        }
    }

    /// Sets the system prompt sent at the head of every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Limits the tool rounds of one turn. Defaults to 8.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Limits how much history is sent to the model.
    #[inline]
    pub fn with_context_window(mut self, window: ContextWindow) -> Self {
        self.context_window = window;
        self
    }

    /// Sets how failed model requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the sampling options of every request.
    #[inline]
    pub fn with_generation_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Attaches a callback invoked with every streamed piece of assistant
    /// text.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback invoked before a requested tool runs.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_call = Some(Box::new(on_tool_call));
        self
    }

    /// Attaches a callback invoked with every tool result.
    #[inline]
    pub fn on_tool_result(
        mut self,
        on_tool_result: impl Fn(&ToolCallResult) + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_result = Some(Box::new(on_tool_result));
        self
    }

    /// Attaches a callback invoked whenever the agent moves to another
    /// [`AgentStage`].
    #[inline]
    pub fn on_stage_change(
        mut self,
        on_stage_change: impl Fn(AgentStage) + Send + Sync + 'static,
    ) -> Self {
        self.on_stage_change = Some(Box::new(on_stage_change));
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let Self {
            provider,
            tools,
            system_prompt,
            max_iterations,
            context_window,
            retry_policy,
            options,
            on_transcript,
            on_tool_call,
            on_tool_result,
            on_stage_change,
        } = self;

        Agent {
            model_client: ModelClient::new(provider, retry_policy),
            tools,
            conversation: Conversation::default(),
            stage: AgentStage::Idle,
            system_prompt,
            max_iterations,
            context_window,
            options,
            on_transcript,
            on_tool_call,
            on_tool_result,
            on_stage_change,
        }
    }
}
