/*!
 * Directory scanning
 *
 * Builds an in-memory [`TreeNode`] tree of a project root, leaving out noise
 * directories. Only kinds and sizes are collected; file contents are never
 * read here.
 */

use std::collections::HashSet;
use std::fs::{self, FileType};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::WalkBuilder;
use indicatif::ProgressBar;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::filter::{FilterConfig, PathFilter};
use crate::types::{sibling_key, Diagnostic, DiagnosticReason, NodeKind, TreeNode};

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Noise filter settings
    pub filter: FilterConfig,
    /// Follow symbolic links (each real directory is still visited once)
    pub follow_symlinks: bool,
    /// Honour .gitignore / .ignore files
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            follow_symlinks: true,
            respect_gitignore: false,
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running scan
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the scan stops at the next directory it visits
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a successful scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Root of the scanned tree
    pub root: TreeNode,
    /// Entries that were skipped because of errors or cycles
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-call scan bookkeeping
struct ScanState {
    /// Canonical scan root
    root: PathBuf,
    /// Canonical paths of the directories currently being scanned
    ancestors: Vec<PathBuf>,
    /// Canonical paths of every directory entered so far
    visited: HashSet<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl ScanState {
    fn new(root: PathBuf) -> Self {
        Self {
            ancestors: vec![root.clone()],
            visited: HashSet::from([root.clone()]),
            root,
            diagnostics: Vec::new(),
        }
    }

    fn skip(&mut self, path: PathBuf, reason: DiagnosticReason) {
        tracing::warn!(path = %path.display(), %reason, "Skipping entry");
        self.diagnostics.push(Diagnostic::new(path, reason));
    }
}

/// A listed directory entry before classification
struct RawEntry {
    path: PathBuf,
    name: String,
    file_type: FileType,
}

/// An entry whose kind (after following symlinks) is known
struct Classified {
    path: PathBuf,
    name: String,
    kind: NodeKind,
    size: u64,
    /// Reached through a symbolic link
    via_link: bool,
}

/// Scanner for project directories
pub struct Scanner {
    config: ScanConfig,
    filter: PathFilter,
    /// Progress bar, ticked once per file
    pub progress: Arc<ProgressBar>,
    cancel: CancellationToken,
    #[cfg(test)]
    on_enter: Option<Box<dyn Fn(&Path) + Send + Sync>>,
}

impl Scanner {
    /// Create a new scanner
    pub fn new(config: ScanConfig, progress: Arc<ProgressBar>) -> Self {
        let filter = PathFilter::new(config.filter.clone());
        Self {
            config,
            filter,
            progress,
            cancel: CancellationToken::new(),
            #[cfg(test)]
            on_enter: None,
        }
    }

    /// Attach a cancellation token checked once per directory
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Scan `root` and return its tree together with non-fatal diagnostics.
    ///
    /// Every call starts from fresh state, so one scanner can be reused for
    /// unrelated roots.
    pub fn scan(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        let metadata =
            fs::metadata(root).map_err(|e| ScanError::from_root_io(root.to_path_buf(), e))?;
        if !metadata.is_dir() {
            return Err(ScanError::RootNotADirectory(root.to_path_buf()));
        }
        let root_path =
            fs::canonicalize(root).map_err(|e| ScanError::from_root_io(root.to_path_buf(), e))?;

        tracing::info!(root = %root_path.display(), "Starting scan");

        let mut state = ScanState::new(root_path.clone());

        self.check_cancelled()?;
        let entries = self
            .list_entries(&root_path, &mut state)
            .map_err(|e| ScanError::from_root_io(root_path.clone(), e))?;
        let children = self.build_children(entries, 1, &mut state)?;

        let name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.to_string_lossy().to_string());
        let root = TreeNode::directory(root_path, name, children);

        tracing::info!(
            files = root.file_count(),
            skipped = state.diagnostics.len(),
            "Scan complete"
        );

        Ok(ScanOutcome {
            root,
            diagnostics: state.diagnostics,
        })
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            tracing::info!("Scan cancelled");
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    /// Scan a directory below the root; a listing failure skips it
    fn scan_subdirectory(
        &self,
        path: PathBuf,
        name: String,
        depth: usize,
        state: &mut ScanState,
    ) -> Result<Option<TreeNode>, ScanError> {
        #[cfg(test)]
        if let Some(on_enter) = &self.on_enter {
            on_enter(&path);
        }
        self.check_cancelled()?;
        self.progress
            .set_message(format!("Scanning: {}", path.display()));

        let entries = match self.list_entries(&path, state) {
            Ok(entries) => entries,
            Err(e) => {
                state.skip(path, reason_for(&e));
                return Ok(None);
            }
        };
        let children = self.build_children(entries, depth + 1, state)?;
        Ok(Some(TreeNode::directory(path, name, children)))
    }

    /// Classify, filter and recurse into the entries of one directory.
    /// `depth` is the depth of the entries themselves.
    fn build_children(
        &self,
        entries: Vec<RawEntry>,
        depth: usize,
        state: &mut ScanState,
    ) -> Result<Vec<TreeNode>, ScanError> {
        let mut classified: Vec<Classified> = entries
            .into_iter()
            .filter_map(|entry| self.classify(entry, state))
            .filter(|entry| {
                let excluded = self.filter.is_excluded(&entry.name, entry.kind, depth);
                if excluded {
                    tracing::debug!(path = %entry.path.display(), "Skipping excluded directory");
                }
                !excluded
            })
            .collect();

        // Visit in display order so duplicate links resolve the same way every run
        classified.sort_by(|a, b| {
            sibling_key(a.kind, &a.name).cmp(&sibling_key(b.kind, &b.name))
        });

        let mut children = Vec::with_capacity(classified.len());
        for entry in classified {
            match entry.kind {
                NodeKind::File => {
                    self.progress.inc(1);
                    children.push(TreeNode::file(entry.path, entry.name, entry.size));
                }
                NodeKind::Directory => {
                    let real = match fs::canonicalize(&entry.path) {
                        Ok(real) => real,
                        Err(e) => {
                            state.skip(entry.path, reason_for(&e));
                            continue;
                        }
                    };
                    if state.ancestors.contains(&real) {
                        state.skip(entry.path, DiagnosticReason::SymlinkCycle);
                        continue;
                    }
                    // Directories inside the root are only entered at their real location
                    if entry.via_link && real.starts_with(&state.root) {
                        state.skip(entry.path, DiagnosticReason::DuplicateLink);
                        continue;
                    }
                    if !state.visited.insert(real.clone()) {
                        state.skip(entry.path, DiagnosticReason::DuplicateLink);
                        continue;
                    }

                    state.ancestors.push(real);
                    let node = self.scan_subdirectory(entry.path, entry.name, depth, state);
                    state.ancestors.pop();
                    if let Some(node) = node? {
                        children.push(node);
                    }
                }
            }
        }
        Ok(children)
    }

    /// Resolve the kind and size of an entry, following symlinks if enabled
    fn classify(&self, entry: RawEntry, state: &mut ScanState) -> Option<Classified> {
        let via_link = entry.file_type.is_symlink();
        let metadata = if via_link {
            if !self.config.follow_symlinks {
                tracing::debug!(path = %entry.path.display(), "Not following symlink");
                return None;
            }
            match fs::metadata(&entry.path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    state.skip(entry.path, DiagnosticReason::BrokenSymlink);
                    return None;
                }
                Err(e) => {
                    state.skip(entry.path, reason_for(&e));
                    return None;
                }
            }
        } else if entry.file_type.is_dir() {
            return Some(Classified {
                path: entry.path,
                name: entry.name,
                kind: NodeKind::Directory,
                size: 0,
                via_link,
            });
        } else {
            match fs::metadata(&entry.path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    state.skip(entry.path, reason_for(&e));
                    return None;
                }
            }
        };

        if metadata.is_dir() {
            Some(Classified {
                path: entry.path,
                name: entry.name,
                kind: NodeKind::Directory,
                size: 0,
                via_link,
            })
        } else if metadata.is_file() {
            Some(Classified {
                path: entry.path,
                name: entry.name,
                kind: NodeKind::File,
                size: metadata.len(),
                via_link,
            })
        } else {
            state.skip(entry.path, DiagnosticReason::UnsupportedType);
            None
        }
    }

    /// List the direct entries of `dir`. An error means the directory itself
    /// could not be read; failures on single entries become diagnostics.
    fn list_entries(&self, dir: &Path, state: &mut ScanState) -> io::Result<Vec<RawEntry>> {
        if self.config.respect_gitignore {
            self.list_with_ignore(dir, state)
        } else {
            self.list_with_walkdir(dir, state)
        }
    }

    fn list_with_walkdir(&self, dir: &Path, state: &mut ScanState) -> io::Result<Vec<RawEntry>> {
        let mut entries = Vec::new();
        for result in WalkDir::new(dir).min_depth(1).max_depth(1) {
            match result {
                Ok(entry) => entries.push(RawEntry {
                    name: entry.file_name().to_string_lossy().to_string(),
                    file_type: entry.file_type(),
                    path: entry.into_path(),
                }),
                Err(e) if e.depth() == 0 => return Err(io::Error::from(e)),
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    let reason = e
                        .io_error()
                        .map(reason_for)
                        .unwrap_or_else(|| DiagnosticReason::Io(e.to_string()));
                    state.skip(path, reason);
                }
            }
        }
        Ok(entries)
    }

    fn list_with_ignore(&self, dir: &Path, state: &mut ScanState) -> io::Result<Vec<RawEntry>> {
        // The ignore walker folds listing failures into per-entry errors, so
        // probe the directory itself first.
        fs::read_dir(dir)?;

        let mut walker = WalkBuilder::new(dir);
        walker
            .max_depth(Some(1))
            .hidden(false)
            .require_git(false)
            .follow_links(false);

        let mut entries = Vec::new();
        for result in walker.build() {
            match result {
                Ok(entry) if entry.depth() == 0 => {}
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    entries.push(RawEntry {
                        name: entry.file_name().to_string_lossy().to_string(),
                        file_type,
                        path: entry.into_path(),
                    });
                }
                Err(e) => {
                    let reason = e
                        .io_error()
                        .map(reason_for)
                        .unwrap_or_else(|| DiagnosticReason::Io(e.to_string()));
                    state.skip(dir.to_path_buf(), reason);
                }
            }
        }
        Ok(entries)
    }
}

/// Map an I/O failure onto a diagnostic reason
fn reason_for(err: &io::Error) -> DiagnosticReason {
    match err.kind() {
        io::ErrorKind::PermissionDenied => DiagnosticReason::PermissionDenied,
        _ => DiagnosticReason::Io(err.to_string()),
    }
}

/// Scan `root` with the default configuration
pub fn scan(root: &Path) -> Result<ScanOutcome, ScanError> {
    Scanner::new(ScanConfig::default(), Arc::new(ProgressBar::hidden())).scan(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    fn hidden_scanner(config: ScanConfig) -> Scanner {
        Scanner::new(config, Arc::new(ProgressBar::hidden()))
    }

    #[test]
    fn test_scan_orders_and_filters() -> io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/nested"))?;
        fs::create_dir_all(root.join(".git/objects"))?;
        fs::create_dir_all(root.join("Docs"))?;
        File::create(root.join("b.txt"))?.write_all(b"bb")?;
        File::create(root.join("A.md"))?.write_all(b"a")?;
        File::create(root.join("src/main.rs"))?.write_all(b"fn main() {}")?;
        File::create(root.join(".git/HEAD"))?;

        let outcome = scan(root).unwrap();
        assert_eq!(names(&outcome.root), vec!["Docs", "src", "A.md", "b.txt"]);
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.root.walk().all(|(_, n)| n.name != ".git"));

        let src = &outcome.root.children[1];
        assert_eq!(names(src), vec!["nested", "main.rs"]);
        assert_eq!(src.children[1].size_bytes, 12);
        assert!(src.children[1].path.is_absolute());
        assert!(src.children[1].path.starts_with(&outcome.root.path));
        Ok(())
    }

    #[test]
    fn test_root_errors() -> io::Result<()> {
        let temp_dir = tempdir()?;
        let missing = temp_dir.path().join("missing");
        assert!(matches!(scan(&missing), Err(ScanError::RootNotFound(_))));

        let file = temp_dir.path().join("file.txt");
        File::create(&file)?;
        assert!(matches!(scan(&file), Err(ScanError::RootNotADirectory(_))));
        Ok(())
    }

    #[test]
    fn test_cancelled_scan_discards_results() -> io::Result<()> {
        let temp_dir = tempdir()?;
        fs::create_dir(temp_dir.path().join("a"))?;

        let token = CancellationToken::new();
        token.cancel();
        let scanner = hidden_scanner(ScanConfig::default()).with_cancellation(token);
        assert!(matches!(scanner.scan(temp_dir.path()), Err(ScanError::Cancelled)));
        Ok(())
    }

    #[test]
    fn test_cancel_between_directories() -> io::Result<()> {
        let temp_dir = tempdir()?;
        for dir in ["a", "b", "c"] {
            fs::create_dir(temp_dir.path().join(dir))?;
            File::create(temp_dir.path().join(dir).join("file.txt"))?;
        }

        let token = CancellationToken::new();
        let trigger = token.clone();
        let mut scanner = hidden_scanner(ScanConfig::default()).with_cancellation(token);
        scanner.on_enter = Some(Box::new(move |path: &Path| {
            if path.ends_with("b") {
                trigger.cancel();
            }
        }));

        assert!(matches!(scanner.scan(temp_dir.path()), Err(ScanError::Cancelled)));
        // "a" was fully scanned before the cancellation landed
        assert_eq!(scanner.progress.position(), 1);
        Ok(())
    }

    #[test]
    fn test_respect_gitignore() -> io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir(root.join("generated"))?;
        File::create(root.join("generated/out.txt"))?;
        File::create(root.join("keep.txt"))?;
        File::create(root.join("skip.log"))?;
        writeln!(File::create(root.join(".gitignore"))?, "*.log\ngenerated/")?;

        let outcome = scan(root).unwrap();
        assert_eq!(
            names(&outcome.root),
            vec!["generated", ".gitignore", "keep.txt", "skip.log"]
        );

        let scanner = hidden_scanner(ScanConfig {
            respect_gitignore: true,
            ..ScanConfig::default()
        });
        let outcome = scanner.scan(root).unwrap();
        assert_eq!(names(&outcome.root), vec![".gitignore", "keep.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_diagnosed() -> io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir(root.join("inner"))?;
        File::create(root.join("inner/file.txt"))?;
        std::os::unix::fs::symlink(root, root.join("inner/loop"))?;
        std::os::unix::fs::symlink(root.join("nowhere"), root.join("dangling"))?;

        let outcome = scan(root).unwrap();
        let inner = &outcome.root.children[0];
        assert_eq!(names(inner), vec!["file.txt"]);

        let reasons: Vec<&DiagnosticReason> =
            outcome.diagnostics.iter().map(|d| &d.reason).collect();
        assert!(reasons.contains(&&DiagnosticReason::SymlinkCycle));
        assert!(reasons.contains(&&DiagnosticReason::BrokenSymlink));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_alias_keeps_real_directory() -> io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir(root.join("zeta"))?;
        File::create(root.join("zeta/real.rs"))?;
        // Sorts before its target
        std::os::unix::fs::symlink(root.join("zeta"), root.join("alias"))?;

        let outcome = scan(root).unwrap();
        assert_eq!(names(&outcome.root), vec!["zeta"]);
        assert_eq!(names(&outcome.root.children[0]), vec!["real.rs"]);

        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].path, outcome.root.path.join("alias"));
        assert_eq!(outcome.diagnostics[0].reason, DiagnosticReason::DuplicateLink);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_link_outside_root_is_followed_once() -> io::Result<()> {
        let outside = tempdir()?;
        fs::create_dir(outside.path().join("shared"))?;
        File::create(outside.path().join("shared/lib.rs"))?;

        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        std::os::unix::fs::symlink(outside.path().join("shared"), root.join("first"))?;
        std::os::unix::fs::symlink(outside.path().join("shared"), root.join("second"))?;

        let outcome = scan(root).unwrap();
        assert_eq!(names(&outcome.root), vec!["first"]);
        assert_eq!(names(&outcome.root.children[0]), vec!["lib.rs"]);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].reason, DiagnosticReason::DuplicateLink);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_followed() -> io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        File::create(root.join("real.txt"))?.write_all(b"12345")?;
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("alias.txt"))?;

        let outcome = scan(root).unwrap();
        assert_eq!(names(&outcome.root), vec!["alias.txt", "real.txt"]);
        assert_eq!(outcome.root.children[0].size_bytes, 5);
        assert_eq!(outcome.root.children[0].kind, NodeKind::File);

        let scanner = hidden_scanner(ScanConfig {
            follow_symlinks: false,
            ..ScanConfig::default()
        });
        let outcome = scanner.scan(root).unwrap();
        assert_eq!(names(&outcome.root), vec!["real.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        let locked = root.join("locked");
        fs::create_dir(&locked)?;
        File::create(root.join("ok.txt"))?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

        // Running as root bypasses permission bits
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let outcome = scan(root).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

        assert_eq!(names(&outcome.root), vec!["ok.txt"]);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].reason, DiagnosticReason::PermissionDenied);
        Ok(())
    }
}
