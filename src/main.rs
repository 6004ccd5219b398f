/*!
 * Command-line interface for context-studio
 */

use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use context_studio::config::{Args, Config};
use context_studio::formatter::ContentFormatter;
use context_studio::logging::init_tracing;
use context_studio::report::{DocumentReport, Reporter};
use context_studio::scanner::Scanner;
use context_studio::selection::SelectionTree;
use context_studio::types::{Diagnostic, NodeView};
use context_studio::TokenEstimator;

#[derive(Serialize)]
struct TreeExport<'a> {
    nodes: Vec<NodeView>,
    diagnostics: &'a [Diagnostic],
}

fn main() -> context_studio::Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.generate {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    init_tracing(&args.log_level, args.log_json);

    let config = Config::from_args(args);
    config.validate()?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {pos} files ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix("Scanning");
    progress.set_message(config.root.display().to_string());

    let start_time = Instant::now();

    let scanner = Scanner::new(config.scan.clone(), Arc::new(progress.clone()));
    let outcome = scanner.scan(&config.root);
    progress.finish_and_clear();
    let outcome = outcome?;

    let mut tree = SelectionTree::build(&outcome.root);
    if config.select_all {
        tree.select_all();
    }
    for pattern in &config.selections {
        if tree.select_matching(pattern) == 0 {
            tracing::warn!(pattern = %pattern, "Selection pattern matched no files");
        }
    }

    if config.tree_json {
        let export = TreeExport {
            nodes: tree.nodes().collect(),
            diagnostics: &outcome.diagnostics,
        };
        let json = serde_json::to_string_pretty(&export)?;
        println!("{}", json);
        return Ok(());
    }

    let paths = tree.resolve();
    let document = ContentFormatter::new(config.format.clone()).format(&paths, &outcome.root.path);
    let tokens = config.heuristic.estimate(document.as_str());
    tracing::info!(files = paths.len(), tokens, "Document ready");

    let destination = match &config.output_file {
        Some(path) => {
            fs::write(path, document.as_str())?;
            path.display().to_string()
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(document.as_str().as_bytes())?;
            handle.flush()?;
            "stdout".to_string()
        }
    };

    if config.report {
        let report = DocumentReport::new(&document, config.heuristic, &outcome.diagnostics, destination)
            .with_scan_totals(outcome.root.file_count(), outcome.root.total_size())
            .with_duration(start_time.elapsed());
        Reporter::new().print_report(&report);
    }

    Ok(())
}
