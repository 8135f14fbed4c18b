use serde::{Deserialize, Serialize};
use skillbench_model::ModelTurn;

/// A preset turn for one scripted round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetTurn {
    /// The turn the model answers with.
    pub turn: ModelTurn,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetTurn {
    /// Creates a preset that answers with the specified turn.
    #[inline]
    pub fn with_turn(turn: ModelTurn) -> Self {
        Self {
            turn,
            failures: None,
        }
    }

    /// Creates a terminal text-only preset.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::with_turn(ModelTurn::text(text))
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use skillbench_model::ToolCallRequest;

    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let preset = PresetTurn::with_turn(ModelTurn {
            text: "I have left a message for you.".to_owned(),
            tool_calls: vec![ToolCallRequest {
                id: "1".to_owned(),
                name: "write_file".to_owned(),
                arguments: json!({
                    "path": "message.txt",
                    "content": "Hello, world!"
                }),
            }],
        });

        let serialized = serde_json::to_string(&preset).unwrap();
        let deserialized: PresetTurn =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(preset, deserialized);
    }
}
