//! The expectation oracle.
//!
//! [`evaluate`] replays a finished run's trace against a declarative
//! expectation spec and produces a structured verdict. It is a pure
//! function of the run and the spec: no side effects beyond re-reading
//! workspace files, deterministic and idempotent for the same run.
//!
//! Malformed expectation data never panics. A spec that cannot be
//! honored (bad path, unknown tool name) turns into a failed check
//! carrying a reason, so an unattended suite keeps running.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::driver::{RunResult, ToolExchange};
use crate::tool::ToolKind;

/// The declarative expectations of one case.
///
/// Every field is optional; an empty spec passes any completed run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Expectations {
    /// Whether the run must (or must not) have used a skill, per the
    /// routing heuristic in [`skill_was_used`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_used: Option<bool>,
    /// Tool names that must each appear at least once in the trace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_tools: Vec<String>,
    /// When present, every traced call must be one of these tool names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Substrings that must occur in at least one shell command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_run: Vec<String>,
    /// Substrings that must not occur in any shell command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not_run: Vec<String>,
    /// Upper bound on the number of shell calls in the trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shell_calls: Option<u32>,
    /// When `true`, every written path must have been read earlier in
    /// the trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_before_write: Option<bool>,
    /// Workspace-relative paths that must exist after the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Files whose content must contain a given substring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_contains: Vec<FileContains>,
    /// Substrings that must occur in the final response text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub final_text_contains: Vec<String>,
}

/// One file-content expectation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileContains {
    /// Workspace-relative path of the file to inspect.
    pub path: String,
    /// Substring that must occur in the file.
    pub text: String,
}

/// One evaluated expectation.
#[derive(Clone, Debug, Serialize)]
pub struct Check {
    /// Dotted check name, e.g. `process.must_run`.
    pub name: &'static str,
    /// Whether the expectation held.
    pub passed: bool,
    /// Human-readable account of what was checked and what was found.
    pub reason: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, reason: String) -> Self {
        Self {
            name,
            passed,
            reason,
        }
    }
}

/// The aggregate verdict of one case: the conjunction of its checks.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Verdict {
    /// Every evaluated check, in evaluation order.
    pub checks: Vec<Check>,
}

impl Verdict {
    /// Whether every constituent check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    fn push(&mut self, name: &'static str, passed: bool, reason: String) {
        self.checks.push(Check::new(name, passed, reason));
    }
}

/// Heuristic routing detector: a run counts as having used a skill
/// when it read a path containing `skill.md` (case-insensitively) or
/// ran a command referencing `scripts/`.
pub fn skill_was_used<'a, I>(exchanges: I) -> bool
where
    I: IntoIterator<Item = &'a ToolExchange>,
{
    exchanges.into_iter().any(|exchange| {
        match exchange.call.kind() {
            ToolKind::ReadFile => exchange
                .call
                .path()
                .is_some_and(|path| path.to_lowercase().contains("skill.md")),
            ToolKind::RunShell => exchange
                .call
                .command()
                .is_some_and(|command| command.contains("scripts/")),
            ToolKind::WriteFile => false,
        }
    })
}

/// Evaluates a finished run against an expectation spec.
///
/// The first check always reflects the run's termination, so a run
/// that errored or hit the step ceiling fails its case with a reason
/// instead of aborting the suite. Outcome checks re-read workspace
/// files through the containment rule rather than trusting any content
/// captured in the trace, since a later call may have rewritten a file.
pub fn evaluate(run: &RunResult, expect: &Expectations) -> Verdict {
    let mut verdict = Verdict::default();
    let exchanges: Vec<&ToolExchange> = run.exchanges().collect();

    verdict.push(
        "run.completed",
        run.termination.is_completed(),
        format!("run terminated with {:?}", run.termination),
    );

    if let Some(want) = expect.skill_used {
        let used = skill_was_used(exchanges.iter().copied());
        verdict.push(
            "routing.skill_used",
            used == want,
            format!("want skill_used={want}, got {used}"),
        );
    }

    for name in &expect.required_tools {
        let seen = exchanges
            .iter()
            .any(|exchange| exchange.call.kind().name() == name);
        verdict.push(
            "routing.required_tools",
            seen,
            format!("tool {name:?} must appear in the trace"),
        );
    }

    if let Some(allowed) = &expect.allowed_tools {
        for exchange in &exchanges {
            let name = exchange.call.kind().name();
            if !allowed.iter().any(|entry| entry == name) {
                verdict.push(
                    "routing.allowed_tools",
                    false,
                    format!("tool {name:?} was invoked but is not allowed"),
                );
            }
        }
        if verdict
            .checks
            .iter()
            .all(|check| check.name != "routing.allowed_tools")
        {
            verdict.push(
                "routing.allowed_tools",
                true,
                format!("all calls within {allowed:?}"),
            );
        }
    }

    let shell_commands: Vec<&str> = exchanges
        .iter()
        .filter_map(|exchange| exchange.call.command())
        .collect();

    for pattern in &expect.must_run {
        let seen = shell_commands
            .iter()
            .any(|command| command.contains(pattern.as_str()));
        verdict.push(
            "process.must_run",
            seen,
            format!("a shell command containing {pattern:?} must run"),
        );
    }

    for pattern in &expect.must_not_run {
        let seen = shell_commands
            .iter()
            .any(|command| command.contains(pattern.as_str()));
        verdict.push(
            "process.must_not_run",
            !seen,
            format!("no shell command may contain {pattern:?}"),
        );
    }

    if let Some(cap) = expect.max_shell_calls {
        let count = shell_commands.len();
        verdict.push(
            "process.max_shell_calls",
            count <= cap as usize,
            format!("{count} shell call(s), cap is {cap}"),
        );
    }

    if expect.read_before_write == Some(true) {
        check_read_before_write(&exchanges, &mut verdict);
    }

    for path in &expect.files {
        let (passed, reason) = match run.workspace.resolve(path) {
            Ok(resolved) => (
                resolved.exists(),
                format!("file {path:?} must exist after the run"),
            ),
            Err(err) => (false, format!("file {path:?}: {err}")),
        };
        verdict.push("outcome.file_exists", passed, reason);
    }

    for expectation in &expect.file_contains {
        let path = &expectation.path;
        let (passed, reason) = match run.workspace.resolve(path) {
            Ok(resolved) => match fs::read_to_string(&resolved) {
                Ok(content) => (
                    content.contains(&expectation.text),
                    format!(
                        "file {path:?} must contain {:?}",
                        expectation.text
                    ),
                ),
                Err(err) => (false, format!("read {path:?}: {err}")),
            },
            Err(err) => (false, format!("file {path:?}: {err}")),
        };
        verdict.push("outcome.file_contains", passed, reason);
    }

    for pattern in &expect.final_text_contains {
        verdict.push(
            "outcome.final_text_contains",
            run.final_text.contains(pattern.as_str()),
            format!("final text must contain {pattern:?}"),
        );
    }

    verdict
}

fn check_read_before_write(
    exchanges: &[&ToolExchange],
    verdict: &mut Verdict,
) {
    let mut read_paths: Vec<&str> = Vec::new();
    let mut passed = true;
    let mut reason = "every write was preceded by a read of the same path"
        .to_owned();
    for exchange in exchanges {
        match exchange.call.kind() {
            ToolKind::ReadFile => {
                if let Some(path) = exchange.call.path() {
                    read_paths.push(path);
                }
            }
            ToolKind::WriteFile => {
                if let Some(path) = exchange.call.path() {
                    if passed && !read_paths.contains(&path) {
                        passed = false;
                        reason = format!(
                            "path {path:?} was written without a prior read"
                        );
                    }
                }
            }
            ToolKind::RunShell => {}
        }
    }
    verdict.push("process.read_before_write", passed, reason);
}
