//! System-context assembly.
//!
//! Builds the opaque text prefix the conversation loop injects as system
//! turns: discovered skill documents and explicitly listed context files,
//! concatenated under a total character budget with START/END delimiters
//! per document. The loop never parses this text; it only prepends it.

use serde::Serialize;
use walkdir::WalkDir;

use crate::workspace::Workspace;

/// Default total character budget for one assembled context string.
pub const DEFAULT_CHAR_BUDGET: usize = 200_000;

/// Metadata of one discovered skill document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkillEntry {
    /// Workspace-relative path of the `SKILL.md`.
    pub path: String,
    /// The `name:` declared in the document's frontmatter, if any.
    pub name: Option<String>,
}

/// The assembled skills prefix plus its per-skill metadata.
///
/// `text` is empty when no skill fit the budget; `skills` still lists
/// what was discovered.
#[derive(Clone, Debug, Default)]
pub struct SkillsContext {
    /// The concatenated context string, possibly empty.
    pub text: String,
    /// Every discovered skill, in path order.
    pub skills: Vec<SkillEntry>,
}

/// Metadata of one loaded context file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Workspace-relative path of the file.
    pub path: String,
    /// Character count of the loaded content.
    pub chars: usize,
}

/// The assembled file-context prefix plus its per-file metadata.
#[derive(Clone, Debug, Default)]
pub struct FilesContext {
    /// The concatenated context string, possibly empty.
    pub text: String,
    /// Every file that made it into the prefix, in list order.
    pub files: Vec<FileEntry>,
}

/// Discovers `SKILL.md` documents under `skills_dir` and concatenates
/// them into a single system-context string.
///
/// Discovery is recursive and matches the file name case-insensitively;
/// documents are visited in sorted path order. Unreadable documents are
/// skipped. Once a document would push the total past `budget`, assembly
/// stops; that document is still listed in the metadata.
pub fn build_skills_context(
    workspace: &Workspace,
    skills_dir: &str,
    budget: usize,
) -> SkillsContext {
    let Ok(skills_root) = workspace.resolve(skills_dir) else {
        return SkillsContext::default();
    };
    if !skills_root.is_dir() {
        return SkillsContext::default();
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(&skills_root)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case("SKILL.md"));
        if matches {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let mut skills = Vec::new();
    let mut chunks = String::new();
    let mut used = 0usize;

    for path in paths {
        let Ok(rel) = path.strip_prefix(workspace.root()) else {
            continue;
        };
        let rel = rel.to_string_lossy().into_owned();
        let Ok(text) = std::fs::read_to_string(&path) else {
            debug!("skipping unreadable skill at {rel}");
            continue;
        };

        let name = extract_frontmatter_name(&text);
        skills.push(SkillEntry {
            path: rel.clone(),
            name: name.clone(),
        });

        let label = name.as_deref().unwrap_or("(unnamed)");
        let addition = format!(
            "\n\n===== SKILL START: {label} | {rel} =====\n{text}\n===== SKILL END: {label} | {rel} =====\n"
        );
        let addition_chars = addition.chars().count();
        if used + addition_chars > budget {
            break;
        }
        chunks.push_str(&addition);
        used += addition_chars;
    }

    if chunks.is_empty() {
        return SkillsContext {
            text: String::new(),
            skills,
        };
    }

    let text = format!(
        "You have access to the following agent skills. Use them when relevant. \
         Follow each skill's instructions exactly, including required tools/workflows.\n\
         Skills are provided below delimited by SKILL START/END markers.{chunks}"
    );
    SkillsContext { text, skills }
}

/// Loads an explicit list of workspace files and concatenates them into
/// a single system-context string.
///
/// Unresolvable or unreadable paths are skipped, not fatal. Assembly
/// stops at the first file that would exceed `budget`.
pub fn build_files_context(
    workspace: &Workspace,
    files: &[String],
    budget: usize,
) -> FilesContext {
    let mut meta = Vec::new();
    let mut chunks = String::new();
    let mut used = 0usize;

    for rel in files {
        let Ok(path) = workspace.resolve(rel) else {
            debug!("skipping context file with unsafe path {rel:?}");
            continue;
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            debug!("skipping unreadable context file {rel:?}");
            continue;
        };

        let addition = format!(
            "\n\n===== CONTEXT START: {rel} =====\n{text}\n===== CONTEXT END: {rel} =====\n"
        );
        let addition_chars = addition.chars().count();
        if used + addition_chars > budget {
            break;
        }
        chunks.push_str(&addition);
        used += addition_chars;
        meta.push(FileEntry {
            path: rel.clone(),
            chars: text.chars().count(),
        });
    }

    if chunks.is_empty() {
        return FilesContext {
            text: String::new(),
            files: meta,
        };
    }

    let text = format!(
        "You have the following context definitions. \
         Follow these instructions to shape your responses.\n\
         Context definitions are provided below delimited by CONTEXT START/END markers.{chunks}"
    );
    FilesContext { text, files: meta }
}

/// Extracts the `name:` field from a leading `---` frontmatter block.
///
/// Returns `None` when there is no frontmatter, no closing fence, or no
/// `name:` line. The fence is only searched within the first 2000 lines.
pub fn extract_frontmatter_name(text: &str) -> Option<String> {
    let mut lines = text.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }

    let body: Vec<&str> = lines.take(2000).collect();
    let end = body.iter().position(|line| line.trim() == "---")?;
    for line in &body[..end] {
        let trimmed = line.trim();
        let key_matches = trimmed
            .get(..5)
            .is_some_and(|key| key.eq_ignore_ascii_case("name:"));
        if key_matches {
            let value = trimmed[5..].trim();
            let value = value
                .trim_matches('"')
                .trim_matches('\'')
                .trim()
                .to_owned();
            return Some(value);
        }
    }
    None
}
