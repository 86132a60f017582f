//! Relative paths and a nested directory tree for the files in a session.

use crate::provenance::session::FileStatus;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileTreeNode {
    Directory {
        name: String,
        children: Vec<FileTreeNode>,
    },
    File {
        name: String,
        path: String,
        status: FileStatus,
    },
}

impl FileTreeNode {
    pub fn name(&self) -> &str {
        match self {
            FileTreeNode::Directory { name, .. } | FileTreeNode::File { name, .. } => name,
        }
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Number of leading directory components shared by every path.
/// File names never count, so a single file keeps just its name.
fn common_directory_depth(paths: &[Vec<&str>]) -> usize {
    let Some(first) = paths.first() else {
        return 0;
    };
    let min_dir_depth = paths
        .iter()
        .map(|parts| parts.len().saturating_sub(1))
        .min()
        .unwrap_or(0);

    let mut depth = 0;
    while depth < min_dir_depth && paths.iter().all(|parts| parts[depth] == first[depth]) {
        depth += 1;
    }
    depth
}

/// Map each path to its path relative to the directory all paths share.
pub fn relative_paths<'a, I>(paths: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let paths: Vec<&str> = paths.into_iter().collect();
    let parts: Vec<Vec<&str>> = paths.iter().map(|p| components(p)).collect();
    let depth = common_directory_depth(&parts);

    paths
        .iter()
        .zip(parts.iter())
        .map(|(path, parts)| (path.to_string(), parts[depth.min(parts.len())..].join("/")))
        .collect()
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, (String, FileStatus)>,
}

impl DirBuilder {
    fn into_children(self) -> Vec<FileTreeNode> {
        let mut children: Vec<FileTreeNode> = self
            .dirs
            .into_iter()
            .map(|(name, dir)| FileTreeNode::Directory {
                name,
                children: dir.into_children(),
            })
            .collect();
        children.extend(
            self.files
                .into_iter()
                .map(|(name, (path, status))| FileTreeNode::File { name, path, status }),
        );
        children
    }
}

/// Directories first, then files, each sorted by name. The shared directory
/// prefix is stripped.
pub fn build_file_tree<'a, I>(files: I) -> Vec<FileTreeNode>
where
    I: IntoIterator<Item = (&'a str, FileStatus)>,
{
    let files: Vec<(&str, FileStatus)> = files.into_iter().collect();
    let parts: Vec<Vec<&str>> = files.iter().map(|(p, _)| components(p)).collect();
    let depth = common_directory_depth(&parts);

    let mut root = DirBuilder::default();
    for ((path, status), parts) in files.iter().zip(parts.iter()) {
        let rest = &parts[depth.min(parts.len())..];
        let Some((file_name, dirs)) = rest.split_last() else {
            continue;
        };
        let mut current = &mut root;
        for dir in dirs {
            current = current.dirs.entry(dir.to_string()).or_default();
        }
        current
            .files
            .insert(file_name.to_string(), (path.to_string(), *status));
    }
    root.into_children()
}
