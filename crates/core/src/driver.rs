use std::time::Duration;

use skillbench_model::{ModelProvider, ModelRequest};

use crate::conversation::Conversation;
use crate::tool::{self, Dispatcher, ToolCall, ToolResult};
use crate::workspace::Workspace;


/// Knobs that bound a single run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Maximum number of model round trips before the run is cut off.
    pub max_steps: u32,
    /// Wall-clock limit applied to each shell command.
    pub shell_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            shell_timeout: Duration::from_secs(60),
        }
    }
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The model produced a turn with no tool calls.
    Completed,
    /// The step ceiling was reached before the model finished.
    MaxStepsExceeded,
    /// A model round trip failed.
    Error(String),
}

impl Termination {
    /// Whether the run reached a natural final response.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Termination::Completed)
    }
}

/// One well-formed tool call paired with its execution result.
#[derive(Clone, Debug)]
pub struct ToolExchange {
    /// The parsed call as the model requested it.
    pub call: ToolCall,
    /// What executing the call produced.
    pub result: ToolResult,
}

/// One non-final assistant turn: its text and the tool exchanges that
/// followed it. Malformed tool requests are answered in the conversation
/// but do not appear here.
#[derive(Clone, Debug)]
pub struct Turn {
    /// Free text accompanying the tool calls, possibly empty.
    pub text: String,
    /// Exchanges in the order the model requested them.
    pub exchanges: Vec<ToolExchange>,
}

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct RunResult {
    /// Non-final turns in order.
    pub trace: Vec<Turn>,
    /// Text of the final turn. Empty unless the run completed.
    pub final_text: String,
    /// How the run ended.
    pub termination: Termination,
    /// The workspace the run mutated, still alive for inspection.
    pub workspace: Workspace,
}

impl RunResult {
    /// Iterates over every tool exchange across all turns, in order.
    pub fn exchanges(&self) -> impl Iterator<Item = &ToolExchange> {
        self.trace.iter().flat_map(|turn| turn.exchanges.iter())
    }
}

/// Drives a model through a tool-calling loop against one workspace.
///
/// A driver owns its workspace and dispatcher. `run` consumes the driver
/// and yields a [`RunResult`]; `run_turn` borrows it so an interactive
/// session can reuse one driver across many user inputs.
pub struct Driver<P> {
    provider: P,
    workspace: Workspace,
    dispatcher: Dispatcher,
    config: RunConfig,
}

impl<P: ModelProvider> Driver<P> {
    /// Creates a driver over the given provider and workspace.
    pub fn new(provider: P, workspace: Workspace, config: RunConfig) -> Self {
        let dispatcher = Dispatcher::new(config.shell_timeout);
        Self {
            provider,
            workspace,
            dispatcher,
            config,
        }
    }

    /// Runs the conversation to termination and returns the result.
    ///
    /// The loop never panics on tool failure: failed tool calls are
    /// rendered back to the model, which decides how to proceed.
    pub async fn run(self, mut conversation: Conversation) -> RunResult {
        let mut trace = Vec::new();
        let mut final_text = String::new();
        let mut steps = 0u32;
        let termination = loop {
            if steps >= self.config.max_steps {
                break Termination::MaxStepsExceeded;
            }
            steps += 1;
            match self.round_trip(&mut conversation).await {
                Ok((true, turn)) => {
                    final_text = turn.text;
                    break Termination::Completed;
                }
                Ok((false, turn)) => trace.push(turn),
                Err(err) => {
                    error!("model round trip failed: {err}");
                    break Termination::Error(err.to_string());
                }
            }
        };
        debug!(
            steps,
            turns = trace.len(),
            "run terminated: {termination:?}"
        );
        RunResult {
            trace,
            final_text,
            termination,
            workspace: self.workspace,
        }
    }

    /// Runs one user-visible turn: round trips until the model produces
    /// a final response, reporting each tool exchange to `on_exchange`.
    ///
    /// Returns the final response text. If the step budget runs out
    /// mid-turn the text collected so far is returned instead.
    pub async fn run_turn<F>(
        &self,
        conversation: &mut Conversation,
        mut on_exchange: F,
    ) -> Result<String, P::Error>
    where
        F: FnMut(&ToolExchange),
    {
        for _ in 0..self.config.max_steps {
            let (is_final, turn) = self.round_trip(conversation).await?;
            for exchange in &turn.exchanges {
                on_exchange(exchange);
            }
            if is_final {
                return Ok(turn.text);
            }
        }
        warn!("step budget exhausted before the model finished the turn");
        Ok(String::new())
    }

    /// Returns a view of the workspace this driver operates on.
    #[inline]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    async fn round_trip(
        &self,
        conversation: &mut Conversation,
    ) -> Result<(bool, Turn), P::Error> {
        let request = ModelRequest {
            messages: conversation.messages().to_vec(),
            tools: tool::definitions(),
        };
        let model_turn = self.provider.send_request(&request).await?;
        conversation.push_assistant(model_turn.clone());

        let is_final = model_turn.is_final();
        let mut exchanges = Vec::new();
        for call_req in &model_turn.tool_calls {
            match ToolCall::parse(call_req) {
                Ok(call) => {
                    let result = self.dispatcher.execute(&call, &self.workspace).await;
                    conversation.push_tool_result(&result.id, result.render());
                    exchanges.push(ToolExchange { call, result });
                }
                Err(err) => {
                    warn!("rejecting malformed tool call: {}", err.reason());
                    conversation.push_tool_result(
                        &call_req.id,
                        format!("Tool call failed: {}", err.reason()),
                    );
                }
            }
        }
        Ok((
            is_final,
            Turn {
                text: model_turn.text,
                exchanges,
            },
        ))
    }
}
