//! Orders extracted operations per file by transcript position.

use crate::error::BlameError;
use crate::provenance::diagnostics::{Diagnostic, Diagnostics};
use crate::provenance::operation::FileOperation;
use crate::utils::debug_log;
use std::collections::BTreeMap;

/// Operations grouped by path, each group sorted by `sequence_index`
pub type SequencedOperations = BTreeMap<String, Vec<FileOperation>>;

/// Group `operations` by path and sort each group by sequence index.
///
/// Duplicate sequence indices on one path are recorded as `OrderingError`
/// and resolved by extraction order. Recursive deletes are fanned out to
/// every path at or below the deleted directory.
pub fn sequence_operations(
    operations: Vec<FileOperation>,
    diagnostics: &mut Diagnostics,
) -> Result<SequencedOperations, BlameError> {
    for op in &operations {
        op.validate()?;
    }

    let mut groups: SequencedOperations = BTreeMap::new();
    let mut recursive_deletes = Vec::new();

    for op in operations {
        if op.is_recursive_delete() {
            recursive_deletes.push(op);
        } else {
            groups.entry(op.path.clone()).or_default().push(op);
        }
    }

    for delete in recursive_deletes {
        let targets: Vec<String> = groups
            .keys()
            .filter(|path| is_at_or_below(path, &delete.path))
            .cloned()
            .collect();

        if targets.is_empty() {
            debug_log(&format!(
                "recursive delete of {} (#{}) matches no tracked path",
                delete.path, delete.sequence_index
            ));
            continue;
        }

        for target in targets {
            let mut fanned = delete.clone();
            fanned.path = target.clone();
            if let Some(group) = groups.get_mut(&target) {
                group.push(fanned);
            }
        }
    }

    for (path, ops) in groups.iter_mut() {
        // Stable: equal indices keep extraction order
        ops.sort_by_key(|op| op.sequence_index);
        record_duplicate_indices(path, ops, diagnostics);
    }

    Ok(groups)
}

fn record_duplicate_indices(path: &str, ops: &[FileOperation], diagnostics: &mut Diagnostics) {
    let mut i = 0;
    while i < ops.len() {
        let mut j = i + 1;
        while j < ops.len() && ops[j].sequence_index == ops[i].sequence_index {
            j += 1;
        }
        if j - i > 1 {
            diagnostics.record(Diagnostic::OrderingError {
                path: path.to_string(),
                sequence_index: ops[i].sequence_index,
                tool_ids: ops[i..j].iter().map(|op| op.tool_id.clone()).collect(),
            });
        }
        i = j;
    }
}

fn is_at_or_below(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return false;
    }
    path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}
