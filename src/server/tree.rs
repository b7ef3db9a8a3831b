//! Workspace tree listing
//!
//! Builds the nested directory tree shown in the editor's file panel.
//! Directories come before files, each group sorted by name, and `.git` is
//! never listed or entered.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::server::file_api::FileApiError;

/// Directory name excluded from every listing
pub const EXCLUDED_DIR: &str = ".git";

/// Default for [`TreeOptions::max_depth`]
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Directory,
    File,
    /// 元数据读取失败（竞争删除、权限不足等）
    Unknown,
}

/// One entry of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Always present, empty for files
    pub children: Vec<FileNode>,
}

#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    /// Entries deeper than this many levels below the root are omitted;
    /// directories at the limit are listed with no children.
    pub max_depth: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Arena slot used while walking; children refer to later slots.
struct PendingNode {
    name: String,
    path: PathBuf,
    node_type: NodeType,
    children: Vec<usize>,
}

struct ListedEntry {
    name: String,
    path: PathBuf,
    node_type: NodeType,
    dir_key: Option<(u64, u64)>,
}

#[cfg(unix)]
fn dir_key(metadata: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn dir_key(_metadata: &Metadata) -> Option<(u64, u64)> {
    None
}

/// List the immediate entries of `dir`: directories first, then files, then
/// entries whose type could not be determined, each group sorted by name.
fn list_entries(dir: &Path) -> std::io::Result<Vec<ListedEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut unknown = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read entry in [{}]: {}", dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        // lstat: symlinks are listed as files and never followed
        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {
                if name == EXCLUDED_DIR {
                    continue;
                }
                dirs.push(ListedEntry {
                    name,
                    path,
                    node_type: NodeType::Directory,
                    dir_key: dir_key(&metadata),
                });
            }
            Ok(_) => files.push(ListedEntry {
                name,
                path,
                node_type: NodeType::File,
                dir_key: None,
            }),
            Err(e) => {
                warn!("Path [{}] is nil: {}", path.display(), e);
                unknown.push(ListedEntry {
                    name,
                    path,
                    node_type: NodeType::Unknown,
                    dir_key: None,
                });
            }
        }
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));
    unknown.sort_by(|a, b| a.name.cmp(&b.name));

    dirs.extend(files);
    dirs.extend(unknown);
    Ok(dirs)
}

/// Build the listing tree rooted at `root`.
///
/// Failing to read the root is an error; anything below it is best-effort:
/// unreadable entries become [`NodeType::Unknown`] nodes and unreadable
/// directories are listed without children.
pub fn build_tree(root: &Path, options: &TreeOptions) -> Result<FileNode, FileApiError> {
    let root_metadata = fs::metadata(root).map_err(|e| FileApiError::from_io(root, e))?;
    if !root_metadata.is_dir() {
        return Err(FileApiError::NotADirectory(root.to_path_buf()));
    }
    let max_depth = options.max_depth.max(1);

    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned());

    let mut arena = vec![PendingNode {
        name: root_name,
        path: root.to_path_buf(),
        node_type: NodeType::Directory,
        children: Vec::new(),
    }];

    let mut visited: HashSet<(u64, u64)> = HashSet::new();
    if let Some(key) = dir_key(&root_metadata) {
        visited.insert(key);
    }

    // Stack-based traversal to avoid deep recursion
    let mut stack: Vec<(usize, usize)> = vec![(0, 0)];

    while let Some((index, depth)) = stack.pop() {
        let entries = match list_entries(&arena[index].path) {
            Ok(entries) => entries,
            Err(e) => {
                if index == 0 {
                    return Err(FileApiError::from_io(root, e));
                }
                warn!(
                    "Failed to list directory [{}]: {}",
                    arena[index].path.display(),
                    e
                );
                continue;
            }
        };

        let child_depth = depth + 1;
        for entry in entries {
            let child_index = arena.len();
            arena[index].children.push(child_index);

            let descend = entry.node_type == NodeType::Directory;
            let key = entry.dir_key;
            let path = entry.path.clone();

            arena.push(PendingNode {
                name: entry.name,
                path: entry.path,
                node_type: entry.node_type,
                children: Vec::new(),
            });

            if !descend {
                continue;
            }
            if child_depth >= max_depth {
                warn!("Depth limit {} reached at [{}]", max_depth, path.display());
                continue;
            }
            if let Some(key) = key {
                if !visited.insert(key) {
                    warn!("Directory cycle detected at [{}]", path.display());
                    continue;
                }
            }
            stack.push((child_index, child_depth));
        }
    }

    debug!("Built tree for {:?} with {} nodes", root, arena.len());

    Ok(assemble(arena))
}

/// Turn the arena into nested nodes. Children always sit at higher indices
/// than their parent, so a reverse pass sees every child finished first.
fn assemble(arena: Vec<PendingNode>) -> FileNode {
    let mut built: Vec<Option<FileNode>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (index, pending) in arena.into_iter().enumerate().rev() {
        let children = pending
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(FileNode {
            name: pending.name,
            path: pending.path.to_string_lossy().into_owned(),
            node_type: pending.node_type,
            children,
        });
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| FileNode {
            name: String::new(),
            path: String::new(),
            node_type: NodeType::Directory,
            children: Vec::new(),
        })
}
