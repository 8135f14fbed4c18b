use serde::{Deserialize, Serialize};
use serde_json::Value;
use skillbench_model::{
    ErrorKind, ModelMessage, ModelRequest, ModelTool, ModelTurn,
    ToolCallRequest,
};

use crate::{Error, OpenAIConfig};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: Option<String>,
    pub r#type: Option<String>,
    pub function: Option<FunctionCall>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    pub id: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        stream: false,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(turn) => Message::Assistant {
            content: if turn.text.is_empty() {
                None
            } else {
                Some(turn.text.clone())
            },
            tool_calls: if turn.tool_calls.is_empty() {
                None
            } else {
                Some(turn.tool_calls.iter().map(encode_tool_call).collect())
            },
        },
        ModelMessage::Tool(result) => Message::Tool {
            tool_call_id: result.id.clone(),
            content: result.content.clone(),
        },
    }
}

#[inline]
fn encode_tool_call(req: &ToolCallRequest) -> ToolCall {
    ToolCall {
        id: Some(req.id.clone()),
        r#type: Some("function".to_owned()),
        function: Some(FunctionCall {
            name: Some(req.name.clone()),
            arguments: Some(req.arguments.to_string()),
        }),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Converts a completion into the provider-agnostic turn shape.
pub fn parse_turn(completion: ChatCompletion) -> Result<ModelTurn, Error> {
    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(Error::new(
            "response contained no choices",
            ErrorKind::Protocol,
        ));
    };

    let mut tool_calls = Vec::new();
    for call in choice.message.tool_calls.unwrap_or_default() {
        let Some(id) = call.id else {
            return Err(Error::new(
                "tool call is missing an id",
                ErrorKind::Protocol,
            ));
        };
        let Some(function) = call.function else {
            return Err(Error::new(
                format!("tool call {id} is missing a function"),
                ErrorKind::Protocol,
            ));
        };
        let Some(name) = function.name else {
            return Err(Error::new(
                format!("tool call {id} is missing a name"),
                ErrorKind::Protocol,
            ));
        };
        let arguments = match function.arguments.as_deref() {
            None | Some("") => Value::Object(Default::default()),
            Some(raw) => serde_json::from_str(raw).map_err(|err| {
                Error::new(
                    format!("tool call {id} has invalid arguments: {err}"),
                    ErrorKind::Protocol,
                )
            })?,
        };
        tool_calls.push(ToolCallRequest {
            id,
            name,
            arguments,
        });
    }

    Ok(ModelTurn {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You are a helpful assistant.".to_owned()),
                ModelMessage::User("Hello".to_owned()),
            ],
            tools: vec![ModelTool {
                name: "run_shell".to_owned(),
                description: "Runs shell commands.".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": { "command": { "type": "string" } }
                }),
            }],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let expected = ChatCompletionRequest {
            model: "custom".to_owned(),
            messages: vec![
                Message::System {
                    content: "You are a helpful assistant.".to_owned(),
                },
                Message::User {
                    content: "Hello".to_owned(),
                },
            ],
            tools: vec![Tool {
                r#type: "function",
                function: FunctionTool {
                    name: "run_shell".to_owned(),
                    description: "Runs shell commands.".to_owned(),
                    parameters: json!({
                        "type": "object",
                        "properties": { "command": { "type": "string" } }
                    }),
                },
            }],
            stream: false,
        };
        assert_eq!(create_request(&request, &config), expected);
    }

    #[test]
    fn test_parse_text_turn() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": { "content": "All done." },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        let turn = parse_turn(completion).unwrap();
        assert_eq!(turn.text, "All done.");
        assert!(turn.is_final());
    }

    #[test]
    fn test_parse_tool_call_turn() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-2",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "write_file",
                            "arguments": "{\"path\":\"out.txt\",\"content\":\"OK\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let turn = parse_turn(completion).unwrap();
        assert!(!turn.is_final());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "write_file");
        assert_eq!(
            turn.tool_calls[0].arguments,
            json!({ "path": "out.txt", "content": "OK" })
        );
    }

    #[test]
    fn test_parse_rejects_invalid_arguments() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_1",
                        "function": { "name": "read_file", "arguments": "{oops" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        assert!(parse_turn(completion).is_err());
    }

    #[test]
    fn test_assistant_replay_roundtrip() {
        let msg = ModelMessage::Assistant(ModelTurn {
            text: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_owned(),
                name: "read_file".to_owned(),
                arguments: json!({ "path": "notes.md" }),
            }],
        });
        let Message::Assistant {
            content,
            tool_calls,
        } = create_message(&msg)
        else {
            panic!("expected an assistant message");
        };
        assert_eq!(content, None);
        let calls = tool_calls.unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(
            calls[0].function.as_ref().unwrap().arguments.as_deref(),
            Some("{\"path\":\"notes.md\"}")
        );
    }
}
