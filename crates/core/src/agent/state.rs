use roomscout_model::{
    ModelFinishReason, ModelMessage, ModelRequest, ToolCallRequest,
};

use super::{Agent, AgentError};
use crate::conversation::{Item as ConversationItem, TranscriptSource};
use crate::model_client::{ModelClientResponse, ModelError};

/// What the agent is doing right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AgentStage {
    /// Waiting for user input.
    #[default]
    Idle,
    /// Waiting for the model.
    ModelThinking,
    /// Running the tools the model asked for.
    RunningTools,
}

impl Agent {
    /// Alternates model and tool steps until the model stops calling tools.
    pub(super) async fn drive(&mut self) -> Result<String, AgentError> {
        let mut tool_rounds = 0;
        loop {
            self.set_stage(AgentStage::ModelThinking);
            let resp = self.model_step().await?;

            if resp.tool_calls.is_empty() {
                match resp.finish_reason {
                    Some(ModelFinishReason::Length) => {
                        warn!("answer was cut off by the token limit");
                    }
                    Some(ModelFinishReason::ContentFilter) => {
                        warn!("answer was withheld by the content filter");
                    }
                    _ => {}
                }
                return Ok(resp.transcript);
            }

            if tool_rounds == self.max_iterations {
                warn!(
                    "model still requests tools after {tool_rounds} rounds"
                );
                return Err(AgentError::IterationLimit(self.max_iterations));
            }
            tool_rounds += 1;

            self.set_stage(AgentStage::RunningTools);
            self.tool_step(resp.tool_calls).await;
        }
    }

    async fn model_step(&mut self) -> Result<ModelClientResponse, ModelError> {
        let request = ModelRequest {
            messages: self.conversation.to_messages(
                self.system_prompt.as_deref(),
                self.context_window,
            ),
            tools: self.tools.definitions(),
            options: self.options,
        };

        let on_transcript = self.on_transcript.clone();
        let resp = self
            .model_client
            .send_request(request, move |delta| {
                if let Some(on_transcript) = &on_transcript {
                    on_transcript(delta);
                }
            })
            .await?;

        let msg = if let Some(opaque_msg) = &resp.opaque_msg {
            ModelMessage::Opaque(opaque_msg.clone())
        } else {
            if !resp.tool_calls.is_empty() {
                warn!("provider gave no opaque message for a tool call turn");
            }
            // Downgrade to a text-only message.
            ModelMessage::Assistant(resp.transcript.clone())
        };
        self.conversation.push(ConversationItem {
            msg,
            transcript: resp.transcript.clone(),
            source: TranscriptSource::Assistant,
        });
        Ok(resp)
    }

    async fn tool_step(&mut self, calls: Vec<ToolCallRequest>) {
        debug!("running {} tool call(s)", calls.len());
        if let Some(on_tool_call) = &self.on_tool_call {
            for call in &calls {
                on_tool_call(call);
            }
        }

        let results = self.tools.dispatch(calls).await;
        for result in results {
            if let Some(on_tool_result) = &self.on_tool_result {
                on_tool_result(&result);
            }
            self.conversation.push(ConversationItem {
                transcript: result.content.clone(),
                msg: ModelMessage::Tool(result),
                source: TranscriptSource::Tool,
            });
        }
    }
}
