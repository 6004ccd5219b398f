/*!
 * Noise path filtering
 *
 * Decides whether a directory entry is infrastructure (version control,
 * dependency caches, build output, editor metadata) rather than project
 * content. Pure and I/O free.
 */

use glob_match::glob_match;
use once_cell::sync::Lazy;

use crate::types::NodeKind;

/// Directory names excluded by default, at any depth
pub static DEFAULT_EXCLUDED_DIRS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Version Control
        ".git",
        ".svn",
        ".hg",
        ".bzr",
        // Dependencies
        "node_modules",
        "bower_components",
        ".npm",
        ".yarn",
        ".pnpm-store",
        // Python
        "__pycache__",
        ".pytest_cache",
        ".mypy_cache",
        ".ruff_cache",
        ".tox",
        "venv",
        ".venv",
        ".eggs",
        // Build & Dist
        "target",
        "dist",
        "build",
        "out",
        ".gradle",
        ".next",
        ".nuxt",
        // IDEs & Editors
        ".idea",
        ".vscode",
        ".vs",
        // Caches & Tooling
        ".cache",
        "coverage",
        ".terraform",
        ".direnv",
    ]
});

/// Directory name globs excluded by default
pub static DEFAULT_EXCLUDED_GLOBS: Lazy<Vec<&'static str>> = Lazy::new(|| vec!["*.egg-info"]);

/// How directory names are compared against the exclusion list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    /// Matches the usual behaviour of the host filesystem
    pub fn platform_default() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            CaseSensitivity::Insensitive
        } else {
            CaseSensitivity::Sensitive
        }
    }
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Filter configuration
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Directory names excluded by exact match
    pub excluded_dirs: Vec<String>,
    /// Globs matched against directory names
    pub excluded_globs: Vec<String>,
    /// Case handling for both of the above
    pub case_sensitivity: CaseSensitivity,
    /// Directories deeper than this are excluded (root children are depth 1)
    pub max_depth: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_globs: DEFAULT_EXCLUDED_GLOBS.iter().map(|s| s.to_string()).collect(),
            case_sensitivity: CaseSensitivity::default(),
            max_depth: None,
        }
    }
}

/// Predicate over directory entries
#[derive(Debug, Clone)]
pub struct PathFilter {
    excluded_dirs: Vec<String>,
    excluded_globs: Vec<String>,
    case_sensitivity: CaseSensitivity,
    max_depth: Option<usize>,
}

impl PathFilter {
    pub fn new(config: FilterConfig) -> Self {
        let fold = |s: String| match config.case_sensitivity {
            CaseSensitivity::Sensitive => s,
            CaseSensitivity::Insensitive => s.to_lowercase(),
        };
        Self {
            excluded_dirs: config.excluded_dirs.into_iter().map(fold).collect(),
            excluded_globs: config.excluded_globs.into_iter().map(fold).collect(),
            case_sensitivity: config.case_sensitivity,
            max_depth: config.max_depth,
        }
    }

    /// Whether the entry is noise and must be left out of the tree.
    ///
    /// Files are never excluded here, whatever their name.
    pub fn is_excluded(&self, name: &str, kind: NodeKind, depth: usize) -> bool {
        if kind == NodeKind::File {
            return false;
        }

        if self.max_depth.is_some_and(|max| depth > max) {
            return true;
        }

        let name = match self.case_sensitivity {
            CaseSensitivity::Sensitive => name.to_string(),
            CaseSensitivity::Insensitive => name.to_lowercase(),
        };

        self.excluded_dirs.iter().any(|d| *d == name)
            || self.excluded_globs.iter().any(|g| glob_match(g, &name))
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
