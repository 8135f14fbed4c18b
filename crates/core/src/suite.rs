//! Case suite orchestration.
//!
//! One case is one provision + run + evaluate. Cases are independent:
//! each owns its workspace, so a failure (including a provisioning
//! failure) is recorded in that case's report and the suite moves on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use skillbench_model::ModelProvider;

use crate::context;
use crate::conversation::Conversation;
use crate::driver::{Driver, RunConfig};
use crate::oracle::{self, Check, Expectations};
use crate::workspace::Workspace;

/// One declared test case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Case {
    /// Stable identifier, also used in the workspace dir name.
    pub id: String,
    /// The user prompt driving the run.
    pub prompt: String,
    /// Expectations checked against the finished run.
    #[serde(default)]
    pub expect: Expectations,
}

/// Suite-wide settings shared by every case.
#[derive(Clone, Debug)]
pub struct SuiteConfig {
    /// Source tree copied into each case's workspace.
    pub source_root: PathBuf,
    /// Workspace-relative skills directory, when skills are injected.
    pub skills_dir: Option<String>,
    /// Workspace-relative context files injected after the skills.
    pub context_files: Vec<String>,
    /// Character budget for each assembled context string.
    pub char_budget: usize,
    /// Per-run driver settings.
    pub run_config: RunConfig,
    /// Keep each case's workspace on disk for inspection.
    pub keep_workspaces: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            skills_dir: Some("skills/".to_owned()),
            context_files: Vec::new(),
            char_budget: context::DEFAULT_CHAR_BUDGET,
            run_config: RunConfig::default(),
            keep_workspaces: false,
        }
    }
}

/// The recorded outcome of one case.
#[derive(Clone, Debug, Serialize)]
pub struct CaseReport {
    /// The case identifier.
    pub id: String,
    /// Conjunction of all checks.
    pub passed: bool,
    /// Every evaluated check with its reason.
    pub checks: Vec<Check>,
    /// The first 400 characters of the final response text.
    pub final_text_excerpt: String,
    /// Where the workspace was kept, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
}

/// The aggregate report of a whole suite.
#[derive(Clone, Debug, Serialize)]
pub struct SuiteReport {
    /// Number of cases whose verdict passed.
    pub passed: usize,
    /// Number of cases run.
    pub total: usize,
    /// Per-case detail, in case order.
    pub results: Vec<CaseReport>,
}

impl SuiteReport {
    /// Whether every case passed.
    #[inline]
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

/// Runs declared cases against one provider and one source tree.
pub struct Suite<P> {
    provider: P,
    config: SuiteConfig,
}

impl<P> Suite<P>
where
    P: ModelProvider + Clone,
{
    /// Creates a suite over the given provider and settings.
    pub fn new(provider: P, config: SuiteConfig) -> Self {
        Self { provider, config }
    }

    /// Runs every case in order and aggregates the verdicts.
    pub async fn run(&self, cases: &[Case]) -> SuiteReport {
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            info!("running case {}", case.id);
            let report = self.run_case(case).await;
            if report.passed {
                info!("case {} passed", case.id);
            } else {
                warn!("case {} failed", case.id);
            }
            results.push(report);
        }

        let passed = results.iter().filter(|report| report.passed).count();
        SuiteReport {
            passed,
            total: results.len(),
            results,
        }
    }

    /// Runs a single case to a report.
    pub async fn run_case(&self, case: &Case) -> CaseReport {
        let workspace =
            match Workspace::provision(&self.config.source_root, &case.id) {
                Ok(workspace) => workspace,
                Err(err) => {
                    return CaseReport {
                        id: case.id.clone(),
                        passed: false,
                        checks: vec![Check {
                            name: "workspace.provision",
                            passed: false,
                            reason: err.to_string(),
                        }],
                        final_text_excerpt: String::new(),
                        workspace: None,
                    };
                }
            };

        let mut docs = Vec::new();
        if let Some(skills_dir) = &self.config.skills_dir {
            let skills = context::build_skills_context(
                &workspace,
                skills_dir,
                self.config.char_budget,
            );
            docs.push(skills.text);
        }
        if !self.config.context_files.is_empty() {
            let files = context::build_files_context(
                &workspace,
                &self.config.context_files,
                self.config.char_budget,
            );
            docs.push(files.text);
        }

        let mut conversation = Conversation::with_system_context(docs);
        conversation.push_user(&case.prompt);

        let driver = Driver::new(
            self.provider.clone(),
            workspace,
            self.config.run_config.clone(),
        );
        let run = driver.run(conversation).await;
        let verdict = oracle::evaluate(&run, &case.expect);

        let final_text_excerpt: String =
            run.final_text.chars().take(400).collect();
        let workspace = if self.config.keep_workspaces {
            Some(run.workspace.keep())
        } else {
            None
        };

        CaseReport {
            id: case.id.clone(),
            passed: verdict.passed(),
            checks: verdict.checks,
            final_text_excerpt,
            workspace,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use skillbench_model::{ModelTurn, ToolCallRequest};
    use skillbench_test_model::{PresetTurn, TestModelProvider};

    use super::*;
    use crate::oracle::FileContains;

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("skills/demo")).unwrap();
        fs::write(
            dir.path().join("skills/demo/SKILL.md"),
            "---\nname: demo\n---\nUse scripts/demo.sh.",
        )
        .unwrap();
        dir
    }

    fn config(source: &tempfile::TempDir) -> SuiteConfig {
        SuiteConfig {
            source_root: source.path().to_path_buf(),
            ..SuiteConfig::default()
        }
    }

    fn case(id: &str, expect: Expectations) -> Case {
        Case {
            id: id.to_owned(),
            prompt: "create out.txt containing OK".to_owned(),
            expect,
        }
    }

    fn scripted_write_provider() -> TestModelProvider {
        let mut provider = TestModelProvider::default();
        provider.add_turn(PresetTurn::with_turn(ModelTurn {
            text: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "tool:1".to_owned(),
                name: "write_file".to_owned(),
                arguments: json!({ "path": "out.txt", "content": "OK" }),
            }],
        }));
        provider.add_turn(PresetTurn::text("Created out.txt."));
        provider
    }

    #[tokio::test]
    async fn test_passing_case_produces_a_passing_report() {
        let source = source_tree();
        let suite = Suite::new(scripted_write_provider(), config(&source));

        let report = suite
            .run_case(&case(
                "write-ok",
                Expectations {
                    files: vec!["out.txt".to_owned()],
                    file_contains: vec![FileContains {
                        path: "out.txt".to_owned(),
                        text: "OK".to_owned(),
                    }],
                    ..Expectations::default()
                },
            ))
            .await;

        assert!(report.passed, "checks: {:?}", report.checks);
        assert_eq!(report.final_text_excerpt, "Created out.txt.");
        assert!(report.workspace.is_none());
    }

    #[tokio::test]
    async fn test_failing_check_fails_the_case_with_a_reason() {
        let source = source_tree();
        let suite = Suite::new(scripted_write_provider(), config(&source));

        let report = suite
            .run_case(&case(
                "wants-shell",
                Expectations {
                    must_run: vec!["pytest".to_owned()],
                    ..Expectations::default()
                },
            ))
            .await;

        assert!(!report.passed);
        let failed = report
            .checks
            .iter()
            .find(|check| !check.passed)
            .expect("failed check");
        assert_eq!(failed.name, "process.must_run");
        assert!(failed.reason.contains("pytest"));
    }

    #[tokio::test]
    async fn test_provision_failure_is_reported_not_raised() {
        let config = SuiteConfig {
            source_root: PathBuf::from("/no/such/source"),
            ..SuiteConfig::default()
        };
        let suite = Suite::new(TestModelProvider::default(), config);

        let report = suite
            .run(&[case("broken", Expectations::default())])
            .await;
        assert_eq!(report.total, 1);
        assert_eq!(report.passed, 0);
        assert_eq!(report.results[0].checks[0].name, "workspace.provision");
    }

    #[tokio::test]
    async fn test_suite_aggregates_independent_cases() {
        let source = source_tree();

        // The shared provider script serves both cases in order; each
        // case consumes one write turn and one final turn.
        let mut provider = scripted_write_provider();
        provider.add_turn(PresetTurn::text("Nothing to do."));

        let suite = Suite::new(provider, config(&source));
        let report = suite
            .run(&[
                case(
                    "first",
                    Expectations {
                        files: vec!["out.txt".to_owned()],
                        ..Expectations::default()
                    },
                ),
                case(
                    "second",
                    Expectations {
                        // The first case's write happened in its own
                        // workspace, so this must fail here.
                        files: vec!["out.txt".to_owned()],
                        ..Expectations::default()
                    },
                ),
            ])
            .await;

        assert_eq!(report.total, 2);
        assert_eq!(report.passed, 1);
        assert!(report.results[0].passed);
        assert!(!report.results[1].passed);
        assert!(!report.all_passed());
    }

    #[tokio::test]
    async fn test_kept_workspace_survives_the_run() {
        let source = source_tree();
        let mut config = config(&source);
        config.keep_workspaces = true;

        let suite = Suite::new(scripted_write_provider(), config);
        let report =
            suite.run_case(&case("keep", Expectations::default())).await;

        let root = report.workspace.expect("kept workspace");
        assert!(root.join("out.txt").exists());
        fs::remove_dir_all(&root).unwrap();
    }
}
