use std::fmt::{self, Display};
use std::str::FromStr;

use roomscout_amadeus::AmadeusClient;
use roomscout_core::{
    Agent, AgentBuilder, AgentError, AgentStage, ContextWindow,
    conversation::Conversation,
};
use roomscout_model::{
    GenerationOptions, ModelProvider, ToolCallRequest, ToolCallResult,
};

use crate::tools::*;

const TRAVEL_PROMPT: &str = include_str!("./prompts/travel.md");
const CALCULATOR_PROMPT: &str = include_str!("./prompts/calculator.md");

/// The group of tools, and the matching system prompt, a session uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Toolset {
    /// Hotel lookup, description, geo search and ratings.
    #[default]
    Travel,
    /// Arithmetic helpers.
    Calculator,
}

impl Toolset {
    /// Returns the built-in system prompt of this toolset.
    #[inline]
    pub fn system_prompt(self) -> &'static str {
        match self {
            Toolset::Travel => TRAVEL_PROMPT,
            Toolset::Calculator => CALCULATOR_PROMPT,
        }
    }
}

impl Display for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toolset::Travel => f.write_str("travel"),
            Toolset::Calculator => f.write_str("calculator"),
        }
    }
}

/// Error returned when parsing an unknown [`Toolset`] name.
#[derive(Debug, thiserror::Error)]
#[error("unknown toolset `{0}`, expected `travel` or `calculator`")]
pub struct UnknownToolset(String);

impl FromStr for Toolset {
    type Err = UnknownToolset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "travel" => Ok(Toolset::Travel),
            "calculator" => Ok(Toolset::Calculator),
            _ => Err(UnknownToolset(s.to_owned())),
        }
    }
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder<P> {
    agent_builder: AgentBuilder<P>,
    toolset: Toolset,
    amadeus: Option<AmadeusClient>,
    system_prompt: Option<String>,
}

impl<P: ModelProvider + 'static> SessionBuilder<P> {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider(provider: P) -> Self {
        Self {
            agent_builder: AgentBuilder::with_model_provider(provider),
            toolset: Toolset::default(),
            amadeus: None,
            system_prompt: None,
        }
    }

    /// Chooses the tools and the default system prompt.
    #[inline]
    pub fn with_toolset(mut self, toolset: Toolset) -> Self {
        self.toolset = toolset;
        self
    }

    /// Enables the tools backed by the Amadeus API.
    #[inline]
    pub fn with_amadeus_client(mut self, client: AmadeusClient) -> Self {
        self.amadeus = Some(client);
        self
    }

    /// Replaces the system prompt of the toolset.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Limits the tool rounds of one turn.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.agent_builder =
            self.agent_builder.with_max_iterations(max_iterations);
        self
    }

    /// Limits how much history is sent to the model.
    #[inline]
    pub fn with_context_window(mut self, window: ContextWindow) -> Self {
        self.agent_builder = self.agent_builder.with_context_window(window);
        self
    }

    /// Sets the sampling options of every request.
    #[inline]
    pub fn with_generation_options(mut self, options: GenerationOptions) -> Self {
        self.agent_builder = self.agent_builder.with_generation_options(options);
        self
    }

    /// Attaches a callback to be invoked with streamed assistant text.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Attaches a callback to be invoked before a tool runs.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_tool_call(on_tool_call);
        self
    }

    /// Attaches a callback to be invoked with every tool result.
    #[inline]
    pub fn on_tool_result(
        mut self,
        on_tool_result: impl Fn(&ToolCallResult) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_tool_result(on_tool_result);
        self
    }

    /// Attaches a callback to be invoked when the agent changes its stage.
    #[inline]
    pub fn on_stage_change(
        mut self,
        on_stage_change: impl Fn(AgentStage) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_stage_change(on_stage_change);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let Self {
            mut agent_builder,
            toolset,
            amadeus,
            system_prompt,
        } = self;

        agent_builder = match toolset {
            Toolset::Travel => {
                let builder = agent_builder
                    .with_tool(FindHotelsByCityTool::new())
                    .with_tool(DescribeHotelTool::new());
                match amadeus {
                    Some(client) => builder
                        .with_tool(FindHotelsByCoordsTool::new(client.clone()))
                        .with_tool(HotelRatingTool::new(client)),
                    None => {
                        debug!("no Amadeus client, geo search is disabled");
                        builder
                    }
                }
            }
            Toolset::Calculator => agent_builder
                .with_tool(SumPlusOneTool::new())
                .with_tool(MultiplyTool::new()),
        };

        let prompt =
            system_prompt.unwrap_or_else(|| toolset.system_prompt().to_owned());
        let agent = agent_builder.with_system_prompt(prompt).build();
        info!(
            "session ready with the {toolset} toolset ({} tools)",
            agent.tools().len()
        );

        Session { agent }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and it
/// is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Sends a message and waits for the final answer.
    #[inline]
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<String, AgentError> {
        self.agent.run_turn(message).await
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        self.agent.conversation()
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Starts over with an empty conversation.
    #[inline]
    pub fn reset(&mut self) {
        self.agent.reset();
    }
}
