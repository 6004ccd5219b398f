/*!
 * Configuration handling for context-studio
 */

use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;

use crate::error::Result;
use crate::estimator::Heuristic;
use crate::filter::{CaseSensitivity, FilterConfig};
use crate::formatter::{FormatConfig, DEFAULT_MAX_FILE_SIZE};
use crate::scanner::ScanConfig;

/// Command-line arguments for the headless shell
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "context-studio",
    version = env!("CARGO_PKG_VERSION"),
    about = "Assemble selected project files into one Markdown block for LLM prompts",
    long_about = "Scans a project directory (skipping version control, dependency and build directories), selects files by glob, and prints a single reproducible Markdown document with an approximate token count."
)]
pub struct Args {
    /// Project root to scan
    #[clap(default_value = ".")]
    pub directory_path: PathBuf,

    /// Glob (relative to the root) of files or directories to select; repeatable
    #[clap(long = "select", short = 's', value_name = "GLOB")]
    pub select: Vec<String>,

    /// Select every scanned file
    #[clap(long)]
    pub all: bool,

    /// Write the document to this file instead of stdout
    #[clap(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Comma-separated directory names to exclude in addition to the defaults
    #[clap(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Comma-separated directory name globs to exclude
    #[clap(long, value_delimiter = ',')]
    pub exclude_glob: Vec<String>,

    /// Do not apply the built-in noise directory list
    #[clap(long)]
    pub no_default_excludes: bool,

    /// Respect .gitignore and .ignore files
    #[clap(long)]
    pub respect_gitignore: bool,

    /// Do not follow symbolic links
    #[clap(long)]
    pub no_follow_symlinks: bool,

    /// Match excluded names ignoring case
    #[clap(long, conflicts_with = "case_sensitive")]
    pub case_insensitive: bool,

    /// Match excluded names exactly
    #[clap(long)]
    pub case_sensitive: bool,

    /// Exclude directories nested deeper than this
    #[clap(long)]
    pub max_depth: Option<usize>,

    /// Files larger than this many bytes are replaced by a sentinel
    #[clap(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Omit the "Context Injection" preamble
    #[clap(long)]
    pub no_preamble: bool,

    /// Token estimation heuristic
    #[clap(long, value_enum, default_value_t = Heuristic::default())]
    pub heuristic: Heuristic,

    /// Print the scanned tree with selection states as JSON and exit
    #[clap(long)]
    pub tree_json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, env = "CONTEXT_STUDIO_LOG", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON
    #[clap(long)]
    pub log_json: bool,

    /// Skip the summary report
    #[clap(long)]
    pub no_report: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Project root to scan
    pub root: PathBuf,

    /// Selection globs applied after the scan
    pub selections: Vec<String>,

    /// Select every file
    pub select_all: bool,

    /// Output file (stdout if absent)
    pub output_file: Option<PathBuf>,

    /// Scanner settings
    pub scan: ScanConfig,

    /// Formatter settings
    pub format: FormatConfig,

    /// Token estimation heuristic
    pub heuristic: Heuristic,

    /// Dump the tree as JSON instead of formatting
    pub tree_json: bool,

    /// Print the summary report
    pub report: bool,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Self {
        let mut filter = if args.no_default_excludes {
            FilterConfig {
                excluded_dirs: Vec::new(),
                excluded_globs: Vec::new(),
                ..FilterConfig::default()
            }
        } else {
            FilterConfig::default()
        };
        filter.excluded_dirs.extend(args.exclude);
        filter.excluded_globs.extend(args.exclude_glob);
        filter.max_depth = args.max_depth;
        if args.case_insensitive {
            filter.case_sensitivity = CaseSensitivity::Insensitive;
        } else if args.case_sensitive {
            filter.case_sensitivity = CaseSensitivity::Sensitive;
        }

        Self {
            root: args.directory_path,
            selections: args.select,
            select_all: args.all,
            output_file: args.output,
            scan: ScanConfig {
                filter,
                follow_symlinks: !args.no_follow_symlinks,
                respect_gitignore: args.respect_gitignore,
            },
            format: FormatConfig {
                max_file_size: args.max_file_size,
                preamble: !args.no_preamble,
                ..FormatConfig::default()
            },
            heuristic: args.heuristic,
            tree_json: args.tree_json,
            report: !args.no_report,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        crate::ensure!(
            self.root.is_dir(),
            Config,
            "Target directory not found: {}",
            self.root.display()
        );

        if let Some(parent) = self.output_file.as_ref().and_then(|p| p.parent()) {
            crate::ensure!(
                parent.as_os_str().is_empty() || parent.is_dir(),
                Config,
                "Output directory not found: {}",
                parent.display()
            );
        }

        crate::ensure!(
            self.format.max_file_size > 0,
            InvalidArgument,
            "--max-file-size must be greater than zero"
        );

        for pattern in &self.selections {
            crate::ensure!(
                !pattern.trim().is_empty(),
                InvalidArgument,
                "Empty selection pattern"
            );
        }

        Ok(())
    }
}
