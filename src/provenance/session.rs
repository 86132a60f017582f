use crate::error::BlameError;
use crate::navigation::xref::{CrossReferenceIndex, MessageIndex};
use crate::observability::log_performance;
use crate::provenance::compactor::{BlameRange, assign_colors, compact_file};
use crate::provenance::diagnostics::{Diagnostic, Diagnostics};
use crate::provenance::file_tree::{FileTreeNode, build_file_tree, relative_paths};
use crate::provenance::message::{AnnotatedMessage, Message};
use crate::provenance::operation::{FileOperation, OperationKind};
use crate::provenance::replay::{ReplayConfig, ReplayOutcome, replay_file};
use crate::provenance::sequencer::sequence_operations;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Called with a path each time that path finishes replaying
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// message id -> broader grouping id that should share a color
    pub context_ids: HashMap<String, String>,
    pub palette_size: usize,
    pub lcs_line_limit: usize,
    pub max_parallel_files: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            context_ids: HashMap::new(),
            palette_size: 12,
            lcs_line_limit: ReplayConfig::default().lcs_line_limit,
            max_parallel_files: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// First operation on the path was a Write
    Added,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub path: String,
    pub rel_path: String,
    pub content: String,
    pub status: FileStatus,
    /// SHA-256 of the final content, hex encoded
    pub blob_sha: String,
    pub blame_ranges: Vec<BlameRange>,
}

impl FileData {
    /// The range containing a 1-based line
    pub fn range_at(&self, line: u32) -> Option<&BlameRange> {
        let pos = self.blame_ranges.partition_point(|r| r.end_line < line);
        self.blame_ranges.get(pos).filter(|r| r.contains(line))
    }

    pub fn line_count(&self) -> u32 {
        self.blame_ranges.last().map_or(0, |r| r.end_line)
    }
}

/// Everything a presentation layer needs for one session
#[derive(Debug, Clone)]
pub struct CodeView {
    pub files: BTreeMap<String, FileData>,
    pub messages: Vec<AnnotatedMessage>,
    pub file_tree: Vec<FileTreeNode>,
    pub message_index: MessageIndex,
    pub xref: CrossReferenceIndex,
    pub diagnostics: Vec<Diagnostic>,
}

/// Serialized shape of a `CodeView` for renderers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeData<'a> {
    pub file_data: &'a BTreeMap<String, FileData>,
    pub messages_data: &'a [AnnotatedMessage],
    pub file_tree: &'a [FileTreeNode],
    pub diagnostics: &'a [Diagnostic],
}

impl CodeView {
    pub fn file(&self, path: &str) -> Option<&FileData> {
        self.files.get(path)
    }

    pub fn range_at(&self, path: &str, line: u32) -> Option<&BlameRange> {
        self.files.get(path)?.range_at(line)
    }

    pub fn code_data(&self) -> CodeData<'_> {
        CodeData {
            file_data: &self.files,
            messages_data: &self.messages,
            file_tree: &self.file_tree,
            diagnostics: &self.diagnostics,
        }
    }
}

pub fn build_code_view(
    operations: Vec<FileOperation>,
    messages: Vec<Message>,
    options: &BuildOptions,
) -> Result<CodeView, BlameError> {
    smol::block_on(build_code_view_concurrent(operations, messages, options, None))
}

/// Sequence, replay (files concurrently), compact and index a session.
pub async fn build_code_view_concurrent(
    operations: Vec<FileOperation>,
    messages: Vec<Message>,
    options: &BuildOptions,
    progress: Option<ProgressFn>,
) -> Result<CodeView, BlameError> {
    let start = Instant::now();
    let operation_count = operations.len();

    let message_index = MessageIndex::build(messages)?;
    let mut diagnostics = Diagnostics::new();
    let sequenced = sequence_operations(operations, &mut diagnostics)?;

    let config = ReplayConfig {
        lcs_line_limit: options.lcs_line_limit,
    };
    let outcomes = replay_concurrent(sequenced, &config, options.max_parallel_files, progress).await;
    for outcome in &outcomes {
        diagnostics.extend(outcome.diagnostics.clone());
    }

    let colors = assign_colors(&outcomes, &options.context_ids, options.palette_size);
    let present: Vec<&ReplayOutcome> = outcomes.iter().filter(|o| o.is_present()).collect();
    let rel_paths = relative_paths(present.iter().map(|o| o.path.as_str()));

    let mut files = BTreeMap::new();
    for outcome in present {
        let blame_ranges = compact_file(outcome, &message_index, &options.context_ids, &colors);
        let status = file_status(&outcome.operations);
        let content = outcome.state.content().to_string();
        files.insert(
            outcome.path.clone(),
            FileData {
                path: outcome.path.clone(),
                rel_path: rel_paths
                    .get(&outcome.path)
                    .cloned()
                    .unwrap_or_else(|| outcome.path.clone()),
                blob_sha: blob_sha(&content),
                content,
                status,
                blame_ranges,
            },
        );
    }

    let xref = CrossReferenceIndex::build(
        files.values().flat_map(|f| f.blame_ranges.iter()),
        &message_index,
        &mut diagnostics,
    );
    let file_tree = build_file_tree(files.values().map(|f| (f.path.as_str(), f.status)));
    let messages = message_index.annotated();

    log_performance(
        "build_code_view",
        start.elapsed(),
        Some(serde_json::json!({
            "operations": operation_count,
            "files": files.len(),
            "messages": messages.len(),
            "diagnostics": diagnostics.len(),
        })),
        None,
    );

    Ok(CodeView {
        files,
        messages,
        file_tree,
        message_index,
        xref,
        diagnostics: diagnostics.into_sorted(),
    })
}

/// Replay each path on the blocking pool, at most `max_parallel` at a time.
/// Results come back in path order.
async fn replay_concurrent(
    sequenced: BTreeMap<String, Vec<FileOperation>>,
    config: &ReplayConfig,
    max_parallel: usize,
    progress: Option<ProgressFn>,
) -> Vec<ReplayOutcome> {
    let semaphore = Arc::new(smol::lock::Semaphore::new(max_parallel.max(1)));
    let mut tasks = Vec::with_capacity(sequenced.len());

    for (path, ops) in sequenced {
        let config = config.clone();
        let semaphore = Arc::clone(&semaphore);
        let progress = progress.clone();

        let task = smol::spawn(async move {
            let _permit = semaphore.acquire().await;

            smol::unblock(move || {
                let start = Instant::now();
                let operation_count = ops.len();
                let outcome = replay_file(&path, ops, &config);
                log_performance(
                    "replay_file",
                    start.elapsed(),
                    Some(serde_json::json!({
                        "path": path,
                        "operations": operation_count,
                        "lines": outcome.state.line_count(),
                    })),
                    None,
                );
                if let Some(progress) = progress {
                    progress(&path);
                }
                outcome
            })
            .await
        });

        tasks.push(task);
    }

    futures::future::join_all(tasks).await
}

/// Decided by the first Write or Edit; deletes before the file existed do not count
fn file_status(operations: &[FileOperation]) -> FileStatus {
    match operations
        .iter()
        .map(FileOperation::kind)
        .find(|kind| *kind != OperationKind::Delete)
    {
        Some(OperationKind::Write) => FileStatus::Added,
        _ => FileStatus::Modified,
    }
}

pub fn blob_sha(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
