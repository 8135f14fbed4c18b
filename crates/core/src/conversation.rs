//! Conversation-related types.

use skillbench_model::{ModelMessage, ModelTurn, ToolCallResult};

/// An append-only conversation owned by exactly one run.
///
/// The history is an explicit value, not shared state: two runs on two
/// threads never alias a conversation, and nothing mutates it besides
/// the driver that owns it.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    items: Vec<ModelMessage>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation seeded with one system turn per non-empty
    /// context document. The documents are opaque to the driver.
    pub fn with_system_context<I>(docs: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut conversation = Self::new();
        for doc in docs {
            if !doc.trim().is_empty() {
                conversation.items.push(ModelMessage::System(doc));
            }
        }
        conversation
    }

    /// Appends a user input.
    #[inline]
    pub fn push_user<S: Into<String>>(&mut self, input: S) {
        self.items.push(ModelMessage::User(input.into()));
    }

    /// Appends a turn received from the model.
    #[inline]
    pub fn push_assistant(&mut self, turn: ModelTurn) {
        self.items.push(ModelMessage::Assistant(turn));
    }

    /// Appends the rendered result of a tool call.
    #[inline]
    pub fn push_tool_result<S: Into<String>>(&mut self, id: &str, content: S) {
        self.items.push(ModelMessage::Tool(ToolCallResult {
            id: id.to_owned(),
            content: content.into(),
        }));
    }

    /// Returns the ordered history so far.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.items
    }
}
