/*!
 * context-studio - Assemble selected project files into a single Markdown
 * block for LLM prompts
 *
 * Scans a project tree while skipping noise directories, tracks a tri-state
 * file selection over it, and renders the selected files as one
 * deterministic Markdown document with an approximate token count.
 */

pub mod config;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod formatter;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod selection;
pub mod types;
pub mod utils;


// Re-export main components for easier access
pub use config::{Args, Config};
pub use error::{Result, ScanError, SelectionError, StudioError};
pub use estimator::{estimate, Heuristic, TokenEstimator};
pub use filter::{CaseSensitivity, FilterConfig, PathFilter};
pub use formatter::{format, ContentFormatter, FormatConfig, FormattedDocument, Section, SectionStatus};
pub use report::{DocumentReport, FileReportInfo, Reporter};
pub use scanner::{scan, CancellationToken, ScanConfig, ScanOutcome, Scanner};
pub use selection::SelectionTree;
pub use types::{Diagnostic, DiagnosticReason, NodeKind, NodeView, SelectionState, TreeNode};
pub use utils::{display_path, format_file_size};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
