use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::tool::{
    Error, ReadFileArgs, RunShellArgs, ShellOutput, ToolAction, ToolCall,
    ToolOutput, ToolResult, WriteFileArgs,
};
use crate::workspace::Workspace;

/// Executes tool calls against a workspace.
///
/// Every call produces a [`ToolResult`]; internal failures are captured
/// into the result payload, never propagated, so the driver can feed them
/// back to the model as a failed tool outcome.
pub struct Dispatcher {
    shell_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with the given shell time budget.
    #[inline]
    pub fn new(shell_timeout: Duration) -> Self {
        Self { shell_timeout }
    }

    /// Executes one call, exhaustively over the three kinds.
    pub async fn execute(
        &self,
        call: &ToolCall,
        workspace: &Workspace,
    ) -> ToolResult {
        let outcome = match &call.action {
            ToolAction::ReadFile(args) => self.read_file(args, workspace).await,
            ToolAction::WriteFile(args) => {
                self.write_file(args, workspace).await
            }
            ToolAction::RunShell(args) => self.run_shell(args, workspace).await,
        };
        if let Err(err) = &outcome {
            debug!("tool call {} failed: {}", call.id, err.reason());
        }
        ToolResult {
            id: call.id.clone(),
            outcome,
        }
    }

    async fn read_file(
        &self,
        args: &ReadFileArgs,
        workspace: &Workspace,
    ) -> Result<ToolOutput, Error> {
        let path = workspace
            .resolve(&args.path)
            .map_err(|err| Error::invalid_path().with_reason(err.reason()))?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found()
                    .with_reason(format!("no such file: {}", args.path)));
            }
            Err(err) => {
                return Err(Error::read_error().with_reason(format!("{err}")));
            }
        };
        let content = String::from_utf8(bytes).map_err(|_| {
            Error::read_error()
                .with_reason(format!("{} is not valid UTF-8", args.path))
        })?;
        Ok(ToolOutput::FileContent(content))
    }

    async fn write_file(
        &self,
        args: &WriteFileArgs,
        workspace: &Workspace,
    ) -> Result<ToolOutput, Error> {
        let path = workspace
            .resolve(&args.path)
            .map_err(|err| Error::invalid_path().with_reason(err.reason()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                Error::write_error().with_reason(format!("{err}"))
            })?;
        }
        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|err| Error::write_error().with_reason(format!("{err}")))?;

        Ok(ToolOutput::BytesWritten {
            path: args.path.clone(),
            bytes: args.content.len() as u64,
        })
    }

    async fn run_shell(
        &self,
        args: &RunShellArgs,
        workspace: &Workspace,
    ) -> Result<ToolOutput, Error> {
        let cwd = match &args.working_dir {
            Some(dir) => workspace.resolve(dir).map_err(|err| {
                Error::invalid_path().with_reason(err.reason())
            })?,
            None => workspace.root().to_path_buf(),
        };

        let child = Command::new("sh")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // kill_on_drop reaps the child when the timeout cancels the
            // wait below.
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                Error::execution_error().with_reason(format!("{err}"))
            })?;

        let output =
            match timeout(self.shell_timeout, child.wait_with_output()).await {
                Ok(output) => output.map_err(|err| {
                    Error::execution_error().with_reason(format!("{err}"))
                })?,
                Err(_) => {
                    return Err(Error::timeout().with_reason(format!(
                        "command did not finish within {:?}: {}",
                        self.shell_timeout, args.command
                    )));
                }
            };

        Ok(ToolOutput::Shell(ShellOutput {
            command: args.command.clone(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ErrorKind;

    fn fixture() -> (tempfile::TempDir, Workspace) {
        let source = tempfile::tempdir().expect("tempdir");
        std::fs::write(source.path().join("seed.txt"), "seeded").unwrap();
        let workspace = Workspace::provision(source.path(), "test").unwrap();
        (source, workspace)
    }

    fn call(id: &str, action: ToolAction) -> ToolCall {
        ToolCall {
            id: id.to_owned(),
            action,
        }
    }

    #[tokio::test]
    async fn reads_an_existing_file() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::ReadFile(ReadFileArgs {
                        path: "seed.txt".to_owned(),
                    }),
                ),
                &workspace,
            )
            .await;

        assert_eq!(result.id, "tool:1");
        assert_eq!(
            result.outcome,
            Ok(ToolOutput::FileContent("seeded".to_owned()))
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::ReadFile(ReadFileArgs {
                        path: "nope.txt".to_owned(),
                    }),
                ),
                &workspace,
            )
            .await;

        let err = result.outcome.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn write_creates_parents_and_reports_bytes() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::WriteFile(WriteFileArgs {
                        path: "nested/dir/out.txt".to_owned(),
                        content: "OK".to_owned(),
                    }),
                ),
                &workspace,
            )
            .await;

        assert_eq!(
            result.outcome,
            Ok(ToolOutput::BytesWritten {
                path: "nested/dir/out.txt".to_owned(),
                bytes: 2,
            })
        );
        let written = std::fs::read_to_string(
            workspace.root().join("nested/dir/out.txt"),
        )
        .unwrap();
        assert_eq!(written, "OK");
    }

    #[tokio::test]
    async fn write_overwrites_unconditionally() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        for content in ["one", "two"] {
            dispatcher
                .execute(
                    &call(
                        "tool:1",
                        ToolAction::WriteFile(WriteFileArgs {
                            path: "seed.txt".to_owned(),
                            content: content.to_owned(),
                        }),
                    ),
                    &workspace,
                )
                .await;
        }
        let written =
            std::fs::read_to_string(workspace.root().join("seed.txt"))
                .unwrap();
        assert_eq!(written, "two");
    }

    #[tokio::test]
    async fn traversal_is_rejected_not_clamped() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::WriteFile(WriteFileArgs {
                        path: "../escape.txt".to_owned(),
                        content: "nope".to_owned(),
                    }),
                ),
                &workspace,
            )
            .await;

        let err = result.outcome.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
        // Nothing was clamped into a sibling write either.
        assert!(!workspace.root().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn write_under_symlinked_parent_is_rejected() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        #[cfg(unix)]
        {
            let outside = tempfile::tempdir().unwrap();
            std::os::unix::fs::symlink(
                outside.path(),
                workspace.root().join("link"),
            )
            .unwrap();

            let result = dispatcher
                .execute(
                    &call(
                        "tool:1",
                        ToolAction::WriteFile(WriteFileArgs {
                            path: "link/escape.txt".to_owned(),
                            content: "nope".to_owned(),
                        }),
                    ),
                    &workspace,
                )
                .await;

            let err = result.outcome.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath);
            assert!(!outside.path().join("escape.txt").exists());
        }
    }

    #[tokio::test]
    async fn shell_captures_output_and_exit_code() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::RunShell(RunShellArgs {
                        command: "echo hello; echo oops >&2; exit 3"
                            .to_owned(),
                        working_dir: None,
                    }),
                ),
                &workspace,
            )
            .await;

        let Ok(ToolOutput::Shell(output)) = result.outcome else {
            panic!("expected shell output");
        };
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn shell_runs_in_the_workspace_root_by_default() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_secs(5));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::RunShell(RunShellArgs {
                        command: "cat seed.txt".to_owned(),
                        working_dir: None,
                    }),
                ),
                &workspace,
            )
            .await;

        let Ok(ToolOutput::Shell(output)) = result.outcome else {
            panic!("expected shell output");
        };
        assert_eq!(output.stdout, "seeded");
    }

    #[tokio::test]
    async fn slow_command_times_out_and_is_killed() {
        let (_source, workspace) = fixture();
        let dispatcher = Dispatcher::new(Duration::from_millis(100));

        let result = dispatcher
            .execute(
                &call(
                    "tool:1",
                    ToolAction::RunShell(RunShellArgs {
                        command: "sleep 1; echo survived > marker.txt"
                            .to_owned(),
                        working_dir: None,
                    }),
                ),
                &workspace,
            )
            .await;

        let err = result.outcome.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        // A shell that outlived the timeout would write the marker once
        // its sleep ends; give it that chance and verify it never does.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!workspace.root().join("marker.txt").exists());
    }
}
