mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use roomscout_model::{GenerationOptions, ToolCallRequest, ToolCallResult};

use crate::conversation::{ContextWindow, Conversation, Item};
use crate::model_client::{ModelClient, ModelError};
use crate::tool::ToolRegistry;
pub use builder::AgentBuilder;
pub use state::AgentStage;

pub(crate) type TranscriptFn = Arc<dyn Fn(&str) + Send + Sync>;
pub(crate) type ToolCallFn = Box<dyn Fn(&ToolCallRequest) + Send + Sync>;
pub(crate) type ToolResultFn = Box<dyn Fn(&ToolCallResult) + Send + Sync>;
pub(crate) type StageFn = Box<dyn Fn(AgentStage) + Send + Sync>;

/// Errors that end a turn without a final answer.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The user input is blank.
    #[error("input is empty")]
    EmptyInput,
    /// The model request failed, retries included.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The model kept asking for tools after this many tool rounds.
    #[error("no final answer after {0} tool rounds")]
    IterationLimit(usize),
}

/// An agent instance, which maintains a conversation, a model client, and
/// the tools the model may call.
///
/// Each turn alternates between a model step and a tool step until the
/// model answers without requesting any tool.
pub struct Agent {
    model_client: ModelClient,
    tools: ToolRegistry,
    conversation: Conversation,
    stage: AgentStage,
    system_prompt: Option<String>,
    max_iterations: usize,
    context_window: ContextWindow,
    options: GenerationOptions,
    on_transcript: Option<TranscriptFn>,
    on_tool_call: Option<ToolCallFn>,
    on_tool_result: Option<ToolResultFn>,
    on_stage_change: Option<StageFn>,
}

impl Agent {
    /// Runs one user turn and returns the final answer of the model.
    ///
    /// On error the conversation is restored to what it was before this
    /// call, so the next turn starts from a consistent history.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future rolls the partial turn back and puts
    /// the agent back to [`AgentStage::Idle`].
    pub async fn run_turn<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<String, AgentError> {
        let input = input.into();
        if input.trim().is_empty() {
            return Err(AgentError::EmptyInput);
        }

        let mut turn = Turn::begin(self);
        turn.conversation.push(Item::user(input));

        let result = turn.drive().await;
        match &result {
            Ok(_) => turn.commit(),
            Err(err) => debug!("turn failed, rolling back: {err}"),
        }
        result
    }

    /// Returns the stage the agent is currently in.
    #[inline]
    pub fn stage(&self) -> AgentStage {
        self.stage
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the registered tools.
    #[inline]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Forgets the conversation.
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.set_stage(AgentStage::Idle);
    }

    fn set_stage(&mut self, stage: AgentStage) {
        if self.stage == stage {
            return;
        }
        self.stage = stage;
        if let Some(on_stage_change) = &self.on_stage_change {
            on_stage_change(stage);
        }
    }
}

/// A turn in flight. Unless committed, dropping it truncates the
/// conversation back to where the turn started.
struct Turn<'a> {
    agent: &'a mut Agent,
    checkpoint: Option<usize>,
}

impl<'a> Turn<'a> {
    fn begin(agent: &'a mut Agent) -> Self {
        let checkpoint = Some(agent.conversation.len());
        Self { agent, checkpoint }
    }

    fn commit(&mut self) {
        self.checkpoint = None;
    }
}

impl Deref for Turn<'_> {
    type Target = Agent;

    fn deref(&self) -> &Agent {
        self.agent
    }
}

impl DerefMut for Turn<'_> {
    fn deref_mut(&mut self) -> &mut Agent {
        self.agent
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.agent.conversation.truncate(checkpoint);
        }
        self.agent.set_stage(AgentStage::Idle);
    }
}
