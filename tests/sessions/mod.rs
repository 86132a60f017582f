#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use transcript_blame::provenance::message::Message;
use transcript_blame::provenance::operation::FileOperation;
use transcript_blame::provenance::session::CodeView;
use transcript_blame::utils::line_count;

/// `len` messages named `m0..`, with a prompt every `prompt_every` messages
pub fn transcript(len: usize, prompt_every: usize) -> Vec<Message> {
    (0..len)
        .map(|i| Message::new(&format!("m{}", i), i, i % prompt_every == 0))
        .collect()
}

const TOKENS: &[&str] = &["alpha", "beta", "gamma", "delta", "}", "", "fn x() {"];

fn random_block(rng: &mut StdRng, max_lines: usize) -> String {
    let lines = rng.gen_range(0..=max_lines);
    let mut block = (0..lines)
        .map(|_| TOKENS[rng.gen_range(0..TOKENS.len())])
        .collect::<Vec<_>>()
        .join("\n");
    if lines > 0 && rng.gen_bool(0.5) {
        block.push('\n');
    }
    block
}

/// A seeded random session over a handful of paths. Edits often target
/// text that is absent or duplicated, so recovery paths get exercised.
pub fn random_session(seed: u64, operation_count: usize) -> (Vec<FileOperation>, Vec<Message>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let paths = ["src/a.rs", "src/b.rs", "src/nested/c.rs", "README.md"];
    let message_count = operation_count + 1;

    let mut operations = Vec::with_capacity(operation_count);
    for i in 0..operation_count {
        let path = paths[rng.gen_range(0..paths.len())];
        let seq = i as u64 + 1;
        let message_id = format!("m{}", rng.gen_range(1..message_count));
        let op = match rng.gen_range(0..10) {
            0..=2 => FileOperation::write(path, &random_block(&mut rng, 8), seq, &message_id),
            3..=8 => {
                let old = TOKENS[rng.gen_range(0..TOKENS.len())];
                let new = random_block(&mut rng, 3);
                let edit = FileOperation::edit(path, old, &new, seq, &message_id);
                if rng.gen_bool(0.1) {
                    edit.with_replace_all()
                } else {
                    edit
                }
            }
            _ => FileOperation::delete(path, seq, &message_id),
        };
        operations.push(op);
    }

    (operations, transcript(message_count, 5))
}

/// Blame ranges must tile 1..=line_count(content) exactly
pub fn assert_partitions(view: &CodeView) {
    for (path, file) in &view.files {
        let mut next = 1u32;
        for range in &file.blame_ranges {
            assert_eq!(range.path, *path);
            assert_eq!(range.start_line, next, "gap or overlap in {}", path);
            assert!(range.end_line >= range.start_line, "empty range in {}", path);
            next = range.end_line + 1;
        }
        assert_eq!(
            (next - 1) as usize,
            line_count(&file.content),
            "ranges of {} do not cover its content",
            path
        );
    }
}

/// A session JSON file in a temporary directory, for driving the binary
pub struct SessionFile {
    dir: TempDir,
    path: PathBuf,
}

impl SessionFile {
    pub fn new(operations: &[FileOperation], messages: &[Message]) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("session.json");
        let body = json!({
            "operations": operations,
            "messages": messages,
        });
        fs::write(&path, serde_json::to_vec_pretty(&body).unwrap()).expect("write session");
        SessionFile { dir, path }
    }

    pub fn raw(contents: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("session.json");
        fs::write(&path, contents).expect("write session");
        SessionFile { dir, path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}
