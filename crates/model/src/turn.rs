use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete turn received from the model provider.
///
/// The response shape is polymorphic: a turn that carries no tool call
/// requests is terminal, and its text is the final answer. A turn with
/// pending tool calls expects one tool result per request before the
/// conversation can continue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTurn {
    /// The assistant text of this turn. May be empty when the model only
    /// requested tool calls.
    #[serde(default)]
    pub text: String,
    /// Tool calls requested by the model, in issue order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelTurn {
    /// Creates a terminal text-only turn.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            tool_calls: vec![],
        }
    }

    /// Returns `true` when this turn terminates the exchange.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments object to pass to the tool.
    pub arguments: Value,
}
