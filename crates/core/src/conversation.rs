//! Conversation-related types.

use roomscout_model::ModelMessage;

/// Who produced a conversation item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// Typed by the user.
    User,
    /// Generated by the model.
    Assistant,
    /// Returned by a tool.
    Tool,
}

/// How much history is sent with each model request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContextWindow {
    /// Send the whole conversation.
    #[default]
    Unbounded,
    /// Send only the last `n` user turns. A turn starts at a user message
    /// and runs until the next one, so tool calls and their results always
    /// travel together.
    LastTurns(usize),
}

/// Represents a conversation.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    items: Vec<Item>,
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
    pub(crate) source: TranscriptSource,
}

impl Item {
    pub(crate) fn user(input: String) -> Self {
        Self {
            msg: ModelMessage::User(input.clone()),
            transcript: input,
            source: TranscriptSource::User,
        }
    }

    /// Returns the transcript of this item.
    ///
    /// The transcript is a string representation of the message item,
    /// which can be exported later. But transcript alone is not enough
    /// to reconstruct the message item.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Returns who produced this item.
    #[inline]
    pub fn source(&self) -> TranscriptSource {
        self.source
    }

    /// Returns the message sent to the model for this item.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }
}

impl Conversation {
    /// Returns all items, oldest first.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub(crate) fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    /// Builds the message list for a model request.
    pub fn to_messages(
        &self,
        system_prompt: Option<&str>,
        window: ContextWindow,
    ) -> Vec<ModelMessage> {
        let start = match window {
            ContextWindow::Unbounded => 0,
            ContextWindow::LastTurns(n) => self
                .items
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, item)| item.source == TranscriptSource::User)
                .nth(n.max(1) - 1)
                .map_or(0, |(idx, _)| idx),
        };

        let mut messages = Vec::with_capacity(self.items.len() - start + 1);
        if let Some(prompt) = system_prompt {
            messages.push(ModelMessage::System(prompt.to_owned()));
        }
        messages.extend(self.items[start..].iter().map(|i| i.msg.clone()));
        messages
    }
}
