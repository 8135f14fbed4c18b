//! Tool call supports.
//!
//! The tool surface is a closed set of three kinds. Modeling it as a
//! tagged variant keeps the dispatch exhaustive at compile time: a new
//! kind cannot be added without every consumer being forced to handle it.

mod dispatch;
mod error;

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skillbench_model::{ModelTool, ToolCallRequest};

pub use dispatch::Dispatcher;
pub use error::{Error, ErrorKind};

/// The closed set of tool kinds the model may invoke.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Read a text file from the workspace.
    ReadFile,
    /// Write a text file into the workspace.
    WriteFile,
    /// Run a shell command inside the workspace.
    RunShell,
}

impl ToolKind {
    /// The wire name of this tool kind.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::RunShell => "run_shell",
        }
    }
}

/// Arguments accepted by `read_file`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Workspace-relative path of the file to read.
    pub path: String,
}

/// Arguments accepted by `write_file`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Workspace-relative path of the file to write.
    pub path: String,
    /// The full UTF-8 content to write.
    pub content: String,
}

/// Arguments accepted by `run_shell`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct RunShellArgs {
    /// The command line to run.
    pub command: String,
    /// Optional workspace-relative working directory. Defaults to the
    /// workspace root.
    pub working_dir: Option<String>,
}

/// A single tool invocation requested by the model.
///
/// Immutable once parsed; the recorded trace preserves the issue order of
/// these values across all steps of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    /// The identifier the model assigned to this request.
    pub id: String,
    /// The kind-specific action to perform.
    pub action: ToolAction,
}

/// The action payload of a [`ToolCall`], one variant per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolAction {
    /// Read a file.
    ReadFile(ReadFileArgs),
    /// Write a file.
    WriteFile(WriteFileArgs),
    /// Run a shell command.
    RunShell(RunShellArgs),
}

impl ToolCall {
    /// Parses a wire-level tool call request into a typed call.
    ///
    /// Unknown tool names and malformed arguments are reported as errors;
    /// the caller is expected to feed the failure back to the model.
    pub fn parse(req: &ToolCallRequest) -> Result<Self, Error> {
        let arguments = req.arguments.clone();
        let action = match req.name.as_str() {
            "read_file" => ToolAction::ReadFile(
                serde_json::from_value(arguments)
                    .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))?,
            ),
            "write_file" => ToolAction::WriteFile(
                serde_json::from_value(arguments)
                    .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))?,
            ),
            "run_shell" => ToolAction::RunShell(
                serde_json::from_value(arguments)
                    .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))?,
            ),
            other => {
                return Err(Error::unknown_tool()
                    .with_reason(format!("Unknown tool: {other}")));
            }
        };
        Ok(Self {
            id: req.id.clone(),
            action,
        })
    }

    /// Returns the kind of this call.
    #[inline]
    pub fn kind(&self) -> ToolKind {
        match self.action {
            ToolAction::ReadFile(_) => ToolKind::ReadFile,
            ToolAction::WriteFile(_) => ToolKind::WriteFile,
            ToolAction::RunShell(_) => ToolKind::RunShell,
        }
    }

    /// The workspace-relative path this call touches, for file kinds.
    #[inline]
    pub fn path(&self) -> Option<&str> {
        match &self.action {
            ToolAction::ReadFile(args) => Some(&args.path),
            ToolAction::WriteFile(args) => Some(&args.path),
            ToolAction::RunShell(_) => None,
        }
    }

    /// The command line, for the shell kind.
    #[inline]
    pub fn command(&self) -> Option<&str> {
        match &self.action {
            ToolAction::RunShell(args) => Some(&args.command),
            _ => None,
        }
    }
}

/// Captured output of one shell invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOutput {
    /// The command line that ran.
    pub command: String,
    /// The exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

/// Successful payload of a tool call, one variant per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutput {
    /// The content of the file that was read.
    FileContent(String),
    /// How much was written, and where.
    BytesWritten {
        /// The workspace-relative path that was written.
        path: String,
        /// Number of bytes written.
        bytes: u64,
    },
    /// The captured output of a shell command.
    Shell(ShellOutput),
}

/// The result answering exactly one [`ToolCall`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolResult {
    /// The identifier of the call this result answers.
    pub id: String,
    /// Success payload or captured failure.
    pub outcome: Result<ToolOutput, Error>,
}

impl ToolResult {
    /// Returns `true` when the call succeeded.
    #[inline]
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Renders the payload the way it is fed back to the model.
    pub fn render(&self) -> String {
        match &self.outcome {
            Ok(ToolOutput::FileContent(content)) => content.clone(),
            Ok(ToolOutput::BytesWritten { path, bytes }) => {
                format!("Wrote {bytes} bytes to {path}")
            }
            Ok(ToolOutput::Shell(output)) => json!({
                "command": output.command,
                "exit_code": output.exit_code,
                "stdout": output.stdout,
                "stderr": output.stderr,
            })
            .to_string(),
            Err(err) => format!("Tool call failed: {}", err.reason()),
        }
    }
}

/// Tool declarations advertised to the model, one per kind.
pub fn definitions() -> Vec<ModelTool> {
    vec![
        ModelTool {
            name: ToolKind::ReadFile.name().to_owned(),
            description:
                "Read a UTF-8 text file from the workspace by relative path."
                    .to_owned(),
            parameters: schema_for!(ReadFileArgs).to_value(),
        },
        ModelTool {
            name: ToolKind::WriteFile.name().to_owned(),
            description:
                "Write a UTF-8 text file to the workspace by relative path."
                    .to_owned(),
            parameters: schema_for!(WriteFileArgs).to_value(),
        },
        ModelTool {
            name: ToolKind::RunShell.name().to_owned(),
            description: "Run a shell command in the workspace. \
                          Returns stdout/stderr and exit code."
                .to_owned(),
            parameters: schema_for!(RunShellArgs).to_value(),
        },
    ]
}
