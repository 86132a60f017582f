use crate::commands::{SessionInput, load_session};
use crate::config::Config;
use crate::error::BlameError;
use crate::provenance::diagnostics::Diagnostic;
use crate::provenance::session::{BuildOptions, CodeView, ProgressFn, build_code_view_concurrent};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub fn handle_build(session: &Path, output: Option<&Path>, progress: bool) -> Result<(), BlameError> {
    let start = Instant::now();
    let input = load_session(session)?;
    let operation_count = input.operations.len();
    let message_count = input.messages.len();

    let view = build_view(input, Config::get(), progress)?;

    let json = serde_json::to_string_pretty(&view.code_data())?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }

    eprintln!(
        "Built {} files from {} operations and {} messages in {}",
        view.files.len(),
        operation_count,
        message_count,
        humantime::format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );
    for line in diagnostics_summary(&view.diagnostics) {
        eprintln!("{}", line);
    }
    Ok(())
}

pub fn build_view(input: SessionInput, config: &Config, progress: bool) -> Result<CodeView, BlameError> {
    let options = BuildOptions {
        context_ids: input.context_ids,
        ..config.build_options()
    };

    let bar = if progress {
        let paths: HashSet<&str> = input
            .operations
            .iter()
            .filter(|op| !op.is_recursive_delete())
            .map(|op| op.path.as_str())
            .collect();
        let bar = ProgressBar::new(paths.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} replaying [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Some(bar)
    } else {
        None
    };

    let callback: Option<ProgressFn> = bar.clone().map(|bar| {
        Arc::new(move |path: &str| {
            bar.set_message(path.to_string());
            bar.inc(1);
        }) as ProgressFn
    });

    let view = smol::block_on(build_code_view_concurrent(
        input.operations,
        input.messages,
        &options,
        callback,
    ))?;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(view)
}

/// One line per diagnostic kind, with counts
pub fn diagnostics_summary(diagnostics: &[Diagnostic]) -> Vec<String> {
    if diagnostics.is_empty() {
        return vec!["No diagnostics".to_string()];
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for diagnostic in diagnostics {
        *counts.entry(diagnostic.label()).or_default() += 1;
    }
    let mut lines = vec![format!("{} diagnostics:", diagnostics.len())];
    lines.extend(counts.iter().map(|(label, count)| format!("  {}: {}", label, count)));
    lines
}
