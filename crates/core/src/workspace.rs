//! Workspace provisioning and path containment.
//!
//! Every run owns an isolated copy of the source tree. All file access on
//! behalf of the model goes through [`Workspace::resolve`], which confines
//! caller-supplied relative paths to the copy.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

/// Error raised when a workspace cannot be provisioned.
///
/// Provisioning failures are fatal to the run: without an isolated copy
/// there is nothing safe to execute against.
#[derive(Debug)]
pub struct ProvisionError {
    message: String,
}

impl ProvisionError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ProvisionError {}

/// Error raised when a relative path cannot be safely resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathError {
    reason: String,
}

impl PathError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason this path was rejected.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl StdError for PathError {}

/// An isolated copy of a source tree, owned by exactly one run.
///
/// The backing directory is removed when the handle is dropped, unless
/// [`Workspace::keep`] detached it for inspection.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    temp: Option<TempDir>,
}

impl Workspace {
    /// Materializes a fresh copy of `source_root` for one run.
    ///
    /// Concurrent runs never share a directory: every call creates its
    /// own temp dir, so one run never observes another's writes.
    pub fn provision(
        source_root: &Path,
        run_id: &str,
    ) -> Result<Self, ProvisionError> {
        if !source_root.is_dir() {
            return Err(ProvisionError::new(format!(
                "source root {} does not exist or is not a directory",
                source_root.display()
            )));
        }

        let temp = tempfile::Builder::new()
            .prefix(&format!("skillbench-{run_id}-"))
            .tempdir()
            .map_err(|err| {
                ProvisionError::new(format!("create workspace dir: {err}"))
            })?;

        copy_tree(source_root, temp.path()).map_err(|err| {
            ProvisionError::new(format!(
                "copy {} into workspace: {err}",
                source_root.display()
            ))
        })?;

        // Canonicalize once so later prefix checks compare real paths
        // (the system temp dir is a symlink on some platforms).
        let root = temp.path().canonicalize().map_err(|err| {
            ProvisionError::new(format!("canonicalize workspace root: {err}"))
        })?;

        debug!("provisioned workspace at {}", root.display());
        Ok(Self {
            root,
            temp: Some(temp),
        })
    }

    /// Returns the absolute root of this workspace.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a caller-supplied relative path against the root.
    ///
    /// Leading separators are stripped, so an "absolute" input is treated
    /// as workspace-relative. Paths carrying parent-traversal components
    /// are rejected outright rather than stripped: silently rewriting the
    /// path would answer for a different file than the one asked about.
    /// The nearest existing ancestor of the resolved path is additionally
    /// canonicalized and prefix-checked, which catches symlinks pointing
    /// out of the workspace even when the leaf does not exist yet.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, PathError> {
        let trimmed = rel.trim_start_matches(['/', '\\']);

        let mut resolved = self.root.clone();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(PathError::new(format!(
                        "path {rel:?} contains a parent-traversal component"
                    )));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::new(format!(
                        "path {rel:?} is not workspace-relative"
                    )));
                }
            }
        }

        if !resolved.starts_with(&self.root) {
            return Err(PathError::new(format!(
                "path {rel:?} escapes the workspace root"
            )));
        }

        // Canonicalize the nearest existing ancestor, not just the leaf:
        // a not-yet-existing file under a symlinked directory would
        // otherwise slip past the prefix check and land outside.
        for ancestor in resolved.ancestors() {
            let Ok(canonical) = ancestor.canonicalize() else {
                continue;
            };
            if !canonical.starts_with(&self.root) {
                return Err(PathError::new(format!(
                    "path {rel:?} resolves outside the workspace root"
                )));
            }
            break;
        }

        Ok(resolved)
    }

    /// Detaches the backing directory so it outlives this handle, and
    /// returns its root for inspection.
    pub fn keep(mut self) -> PathBuf {
        if let Some(temp) = self.temp.take() {
            let _ = temp.keep();
        }
        self.root.clone()
    }
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
