/*!
 * Markdown document assembly
 *
 * Turns an ordered list of selected files into one reproducible Markdown
 * document: a preamble, optional header, one fenced section per file,
 * optional footer and a summary line.
 */

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::utils::{display_path, normalize_line_endings};

/// Substituted for files that are not valid UTF-8 text
pub const BINARY_SENTINEL: &str = "[binary or unreadable file skipped]";

/// Substituted for files that disappeared after the scan
pub const NOT_FOUND_SENTINEL: &str = "[file not found]";

/// Body of the document when nothing is selected
pub const EMPTY_SELECTION: &str = "_No files selected._";

/// Default per-file size cap in bytes
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_000_000;

const PREAMBLE: &str = "# Context Injection\n\nThe following codebase context was automatically defined as important for this prompt:\n\n";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Formatter configuration
#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// Files above this size are replaced by a sentinel
    pub max_file_size: u64,
    /// Root-level file whose content is injected after the preamble
    pub header_file: Option<String>,
    /// Root-level file whose content is injected before the summary
    pub footer_file: Option<String>,
    /// Emit the "Context Injection" preamble
    pub preamble: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            header_file: Some("context_header.md".to_string()),
            footer_file: Some("context_footer.md".to_string()),
            preamble: true,
        }
    }
}

/// How a file ended up in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SectionStatus {
    /// Content included verbatim (line endings normalised)
    Included,
    /// Not UTF-8 text
    Binary,
    /// Larger than the configured cap (actual size attached)
    TooLarge(u64),
    /// Gone from disk
    Missing,
    /// Any other read failure
    Unreadable(String),
}

impl SectionStatus {
    fn sentinel(&self) -> Option<String> {
        match self {
            SectionStatus::Included => None,
            SectionStatus::Binary => Some(BINARY_SENTINEL.to_string()),
            SectionStatus::TooLarge(size) => {
                Some(format!("[file too large to include ({} bytes)]", size))
            }
            SectionStatus::Missing => Some(NOT_FOUND_SENTINEL.to_string()),
            SectionStatus::Unreadable(reason) => Some(format!("[error reading file: {}]", reason)),
        }
    }
}

/// Per-file section metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Root-relative, forward-slash path shown in the header
    pub display_path: String,
    pub status: SectionStatus,
    /// Lines of included content (0 for sentinels)
    pub lines: usize,
    /// Characters of included content (0 for sentinels)
    pub chars: usize,
    /// UTF-8 bytes of included content (0 for sentinels)
    pub bytes: usize,
}

/// The rendered document plus what went into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDocument {
    /// Rendered Markdown
    pub text: String,
    /// One entry per file section, in document order
    pub sections: Vec<Section>,
}

impl FormattedDocument {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Sections replaced by a sentinel
    pub fn skipped_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.status != SectionStatus::Included)
            .count()
    }

    pub fn is_empty_selection(&self) -> bool {
        self.sections.is_empty()
    }
}

impl fmt::Display for FormattedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Outcome of reading one file
enum FileContent {
    Text(String),
    Failed(SectionStatus),
}

/// Builds [`FormattedDocument`]s from selected file paths
#[derive(Debug, Clone, Default)]
pub struct ContentFormatter {
    config: FormatConfig,
}

impl ContentFormatter {
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    /// Format `paths` (in the given order) relative to `root`.
    ///
    /// Never fails: unreadable files become sentinel sections and an empty
    /// list yields the empty-selection document.
    pub fn format(&self, paths: &[PathBuf], root: &Path) -> FormattedDocument {
        let canonical_root = fs::canonicalize(root).ok();
        let header = self.read_decoration(root, self.config.header_file.as_deref());
        let footer = self.read_decoration(root, self.config.footer_file.as_deref());

        // Injected decorations are not repeated as sections
        let injected: Vec<&str> = [
            (header.is_some(), self.config.header_file.as_deref()),
            (footer.is_some(), self.config.footer_file.as_deref()),
        ]
        .into_iter()
        .filter_map(|(present, name)| if present { name } else { None })
        .collect();

        let entries: Vec<(String, &PathBuf)> = paths
            .iter()
            .map(|path| {
                let shown = display_path(path, root)
                    .or_else(|| {
                        canonical_root
                            .as_deref()
                            .and_then(|canonical| display_path(path, canonical))
                    })
                    .unwrap_or_else(|| {
                        tracing::warn!(path = %path.display(), root = %root.display(), "File is not below the project root");
                        path.file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| path.to_string_lossy().to_string())
                    });
                (shown, path)
            })
            .filter(|(shown, _)| !injected.contains(&shown.as_str()))
            .collect();

        // Reads run in parallel; the indexed collect keeps input order
        let contents: Vec<FileContent> = entries
            .par_iter()
            .map(|(_, path)| read_file(path, self.config.max_file_size))
            .collect();

        let mut text = String::new();
        if self.config.preamble {
            text.push_str(PREAMBLE);
        }
        if let Some(header) = &header {
            text.push_str(header);
            text.push_str("\n\n");
        }

        let mut sections = Vec::with_capacity(entries.len());
        for ((shown, _), content) in entries.into_iter().zip(contents) {
            let section = match content {
                FileContent::Text(body) => {
                    push_section(&mut text, &shown, language_for(&shown), &body);
                    Section {
                        lines: body.lines().count(),
                        chars: body.chars().count(),
                        bytes: body.len(),
                        display_path: shown,
                        status: SectionStatus::Included,
                    }
                }
                FileContent::Failed(status) => {
                    tracing::warn!(path = %shown, ?status, "Substituting sentinel for file");
                    let sentinel = status.sentinel().unwrap_or_default();
                    push_section(&mut text, &shown, "text", &sentinel);
                    Section {
                        display_path: shown,
                        status,
                        lines: 0,
                        chars: 0,
                        bytes: 0,
                    }
                }
            };
            sections.push(section);
        }

        if let Some(footer) = &footer {
            text.push_str(footer);
            text.push_str("\n\n");
        }

        if sections.is_empty() {
            text.push_str(EMPTY_SELECTION);
        } else {
            let skipped = sections
                .iter()
                .filter(|s| s.status != SectionStatus::Included)
                .count();
            text.push_str(&format!(
                "_Files included: {} ({} skipped)_",
                sections.len(),
                skipped
            ));
        }
        text.push('\n');

        tracing::debug!(files = sections.len(), bytes = text.len(), "Document formatted");
        FormattedDocument { text, sections }
    }

    /// Read an optional header/footer from the root; failures are silent
    fn read_decoration(&self, root: &Path, name: Option<&str>) -> Option<String> {
        let path = root.join(name?);
        if !path.is_file() {
            return None;
        }
        match read_file(&path, self.config.max_file_size) {
            FileContent::Text(body) => {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            FileContent::Failed(_) => None,
        }
    }
}

/// Format `paths` with the default configuration
pub fn format(paths: &[PathBuf], root: &Path) -> FormattedDocument {
    ContentFormatter::default().format(paths, root)
}

fn push_section(out: &mut String, shown: &str, language: &str, body: &str) {
    let fence = fence_for(body);
    out.push_str("## File: ");
    out.push_str(shown);
    out.push('\n');
    out.push_str(&fence);
    out.push_str(language);
    out.push('\n');
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out.push_str("\n\n");
}

/// A backtick fence longer than any backtick run inside `body`
fn fence_for(body: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in body.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Fence language tag: the file extension, or `text`
fn language_for(shown: &str) -> &str {
    let name = shown.rsplit('/').next().unwrap_or(shown);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => "text",
    }
}

fn read_file(path: &Path, max_file_size: u64) -> FileContent {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => return FileContent::Failed(status_for(&e)),
    };
    if !metadata.is_file() {
        return FileContent::Failed(SectionStatus::Unreadable("not a regular file".to_string()));
    }
    if metadata.len() > max_file_size {
        return FileContent::Failed(SectionStatus::TooLarge(metadata.len()));
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return FileContent::Failed(status_for(&e)),
    };
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read file");

    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    if bytes.contains(&0) {
        return FileContent::Failed(SectionStatus::Binary);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => FileContent::Text(normalize_line_endings(text)),
        Err(_) => FileContent::Failed(SectionStatus::Binary),
    }
}

fn status_for(err: &io::Error) -> SectionStatus {
    match err.kind() {
        io::ErrorKind::NotFound => SectionStatus::Missing,
        kind => SectionStatus::Unreadable(kind.to_string()),
    }
}
