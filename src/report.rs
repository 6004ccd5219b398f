/*!
 * Reporting for context-studio runs
 *
 * Renders what went into a document as console tables using the tabled
 * library. Reports go to stderr so stdout stays clean for the document.
 */

use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::estimator::Heuristic;
use crate::formatter::{FormattedDocument, SectionStatus};
use crate::types::{Diagnostic, DiagnosticReason};
use crate::utils::{format_file_size, format_number};

/// Files beyond this count are collapsed into the largest ten
const MAX_LISTED_FILES: usize = 15;
const TOP_FILES: usize = 10;

/// Information about one file section in the report
#[derive(Debug, Clone)]
pub struct FileReportInfo {
    /// Root-relative display path
    pub path: String,
    pub status: SectionStatus,
    pub lines: usize,
    pub chars: usize,
    /// Estimated tokens of the included content
    pub tokens: usize,
}

/// Statistics for one formatted document
#[derive(Debug, Clone)]
pub struct DocumentReport {
    /// Where the document was written
    pub destination: String,
    /// Time taken for scan and format
    pub duration: Duration,
    /// Files in the scanned tree
    pub files_scanned: usize,
    /// Total size of the scanned tree
    pub bytes_scanned: u64,
    /// Heuristic used for the token columns
    pub heuristic: Heuristic,
    /// Estimated tokens of the whole document
    pub total_tokens: usize,
    pub files: Vec<FileReportInfo>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentReport {
    /// Collect report data from a rendered document
    pub fn new(
        document: &FormattedDocument,
        heuristic: Heuristic,
        diagnostics: &[Diagnostic],
        destination: impl Into<String>,
    ) -> Self {
        let files = document
            .sections
            .iter()
            .map(|section| FileReportInfo {
                path: section.display_path.clone(),
                status: section.status.clone(),
                lines: section.lines,
                chars: section.chars,
                tokens: heuristic.estimate_counts(section.chars, section.bytes),
            })
            .collect();

        Self {
            destination: destination.into(),
            duration: Duration::ZERO,
            files_scanned: 0,
            bytes_scanned: 0,
            heuristic,
            total_tokens: heuristic
                .estimate_counts(document.text.chars().count(), document.text.len()),
            files,
            diagnostics: diagnostics.to_vec(),
        }
    }

    /// Attach scan totals
    pub fn with_scan_totals(mut self, files: usize, bytes: u64) -> Self {
        self.files_scanned = files;
        self.bytes_scanned = bytes;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.lines).sum()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status != SectionStatus::Included)
            .count()
    }
}

/// Report generator for document statistics
#[derive(Debug, Default)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    /// Generate the full console report
    pub fn generate_report(&self, report: &DocumentReport) -> String {
        let mut out = String::new();

        if !report.files.is_empty() {
            let files_title = if report.files.len() > MAX_LISTED_FILES {
                "TOP 10 LARGEST FILES BY CHARACTER COUNT"
            } else {
                "INCLUDED FILES"
            };
            out.push_str(files_title);
            out.push('\n');
            out.push_str(&self.create_files_table(report));
            out.push_str("\n\n");
        }

        if !report.diagnostics.is_empty() {
            out.push_str("SKIPPED DURING SCAN\n");
            out.push_str(&self.create_diagnostics_table(report));
            out.push_str("\n\n");
        }

        out.push_str("SUMMARY\n");
        out.push_str(&self.create_summary_table(report));
        out
    }

    /// Print the report to stderr
    pub fn print_report(&self, report: &DocumentReport) {
        eprintln!("\n{}", self.generate_report(report));
    }

    // Shorten long paths by keeping their trailing segments
    fn format_path(&self, path: &str, max_len: usize) -> String {
        if path.chars().count() <= max_len {
            return path.to_string();
        }

        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() <= 2 {
            let keep = max_len.saturating_sub(3);
            let tail: String = path
                .chars()
                .rev()
                .take(keep)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return format!("...{}", tail);
        }

        let mut current_len = 3;
        let mut segments = Vec::new();
        for part in parts.iter().rev() {
            let part_len = part.chars().count() + 1;
            if current_len + part_len <= max_len {
                segments.push(*part);
                current_len += part_len;
            } else {
                break;
            }
        }

        let mut result = String::from("...");
        for part in segments.iter().rev() {
            result.push('/');
            result.push_str(part);
        }
        result
    }

    fn status_label(status: &SectionStatus) -> String {
        match status {
            SectionStatus::Included => "included".to_string(),
            SectionStatus::Binary => "binary".to_string(),
            SectionStatus::TooLarge(size) => format!("too large ({})", format_file_size(*size)),
            SectionStatus::Missing => "missing".to_string(),
            SectionStatus::Unreadable(reason) => format!("unreadable ({})", reason),
        }
    }

    fn reason_label(reason: &DiagnosticReason) -> String {
        match reason {
            DiagnosticReason::PermissionDenied => "permission denied".to_string(),
            DiagnosticReason::SymlinkCycle => "symlink cycle".to_string(),
            DiagnosticReason::BrokenSymlink => "broken symlink".to_string(),
            DiagnosticReason::DuplicateLink => "duplicate link".to_string(),
            DiagnosticReason::UnsupportedType => "unsupported file type".to_string(),
            DiagnosticReason::Io(detail) => format!("io error ({})", detail),
        }
    }

    fn style(table: &mut Table) {
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));
    }

    fn create_summary_table(&self, report: &DocumentReport) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: &'static str,

            #[tabled(rename = "Value")]
            value: String,
        }

        let rows = vec![
            SummaryRow {
                key: "Output",
                value: report.destination.clone(),
            },
            SummaryRow {
                key: "Process Time",
                value: format!("{:.4?}", report.duration),
            },
            SummaryRow {
                key: "Files Scanned",
                value: format!(
                    "{} ({})",
                    format_number(report.files_scanned),
                    format_file_size(report.bytes_scanned)
                ),
            },
            SummaryRow {
                key: "Files Included",
                value: format!(
                    "{} ({} skipped)",
                    format_number(report.files.len()),
                    report.skipped()
                ),
            },
            SummaryRow {
                key: "Total Lines",
                value: format_number(report.total_lines()),
            },
            SummaryRow {
                key: "LLM Tokens",
                value: format!(
                    "~{} tokens ({} heuristic)",
                    format_number(report.total_tokens),
                    report.heuristic
                ),
            },
        ];

        let mut table = Table::new(rows);
        Self::style(&mut table);
        table.to_string()
    }

    fn create_files_table(&self, report: &DocumentReport) -> String {
        #[derive(Tabled)]
        struct FileRow {
            #[tabled(rename = "File Path")]
            path: String,

            #[tabled(rename = "Status")]
            status: String,

            #[tabled(rename = "Lines")]
            lines: String,

            #[tabled(rename = "Est. Tokens")]
            tokens: String,
        }

        let mut files: Vec<&FileReportInfo> = report.files.iter().collect();
        files.sort_by(|a, b| b.chars.cmp(&a.chars).then_with(|| a.path.cmp(&b.path)));
        if files.len() > MAX_LISTED_FILES {
            files.truncate(TOP_FILES);
        }

        let rows: Vec<FileRow> = files
            .iter()
            .map(|info| FileRow {
                path: self.format_path(&info.path, 60),
                status: Self::status_label(&info.status),
                lines: format_number(info.lines),
                tokens: format_number(info.tokens),
            })
            .collect();

        let mut table = Table::new(rows);
        Self::style(&mut table);
        table.to_string()
    }

    fn create_diagnostics_table(&self, report: &DocumentReport) -> String {
        #[derive(Tabled)]
        struct DiagnosticRow {
            #[tabled(rename = "Path")]
            path: String,

            #[tabled(rename = "Reason")]
            reason: String,
        }

        let rows: Vec<DiagnosticRow> = report
            .diagnostics
            .iter()
            .map(|d| DiagnosticRow {
                path: self.format_path(&d.path.to_string_lossy(), 60),
                reason: Self::reason_label(&d.reason),
            })
            .collect();

        let mut table = Table::new(rows);
        Self::style(&mut table);
        table.to_string()
    }
}
