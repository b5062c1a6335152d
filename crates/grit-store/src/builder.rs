use std::collections::BTreeMap;
use std::io::Read;

use grit_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;
use crate::tree::{EntryMode, Tree, TreeEntry};

/// One working-tree file, as described by a directory walker.
#[derive(Debug)]
pub struct WorkingFile<R> {
    /// Path relative to the work-tree root, `/`-separated.
    pub path: String,
    /// Regular, executable or symlink.
    pub mode: EntryMode,
    /// Exact number of bytes `source` yields.
    pub size: u64,
    /// The file's contents (or link target, for symlinks).
    pub source: R,
}

#[derive(Debug, Default)]
struct DirNode {
    files: BTreeMap<String, TreeEntry>,
    dirs: BTreeMap<String, DirNode>,
}

/// Turns a stream of working files into blobs plus nested trees.
///
/// Blobs are written as files are added; trees are written bottom-up by
/// [`finish`](Self::finish). Directories that end up with no files produce
/// no tree.
pub struct TreeBuilder<'a> {
    store: &'a dyn ObjectStore,
    root: DirNode,
    files_added: u64,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            root: DirNode::default(),
            files_added: 0,
        }
    }

    /// Number of files added so far.
    pub fn files_added(&self) -> u64 {
        self.files_added
    }

    /// Store `file` as a blob and record it under its directory.
    pub fn add<R: Read>(&mut self, mut file: WorkingFile<R>) -> StoreResult<ObjectId> {
        if file.mode.is_tree() || file.mode == EntryMode::Gitlink {
            return Err(StoreError::InvalidPath(format!(
                "{}: mode {} is not a file mode",
                file.path, file.mode
            )));
        }
        let (dirs, name) = split_path(&file.path)?;

        self.check_free(&file.path, &dirs, name)?;

        // Directories are only recorded once their first blob is stored.
        let id = self
            .store
            .write_stream(file.mode.object_type(), file.size, &mut file.source)?;
        let mut node = &mut self.root;
        for dir in &dirs {
            node = node.dirs.entry((*dir).to_string()).or_default();
        }
        node.files
            .insert(name.to_string(), TreeEntry::new(file.mode, name, id));
        self.files_added += 1;

        debug!(path = %file.path, %id, mode = %file.mode, "blob added");
        Ok(id)
    }

    fn check_free(&self, path: &str, dirs: &[&str], name: &str) -> StoreResult<()> {
        let mut node = Some(&self.root);
        for (depth, dir) in dirs.iter().enumerate() {
            let Some(current) = node else { break };
            if current.files.contains_key(*dir) {
                return Err(conflict(path, &dirs[..=depth].join("/")));
            }
            node = current.dirs.get(*dir);
        }
        match node {
            Some(parent) if parent.dirs.contains_key(name) || parent.files.contains_key(name) => {
                Err(conflict(path, path))
            }
            _ => Ok(()),
        }
    }

    /// Write every tree and return the root tree's id.
    pub fn finish(self) -> StoreResult<ObjectId> {
        let root = match write_dir(self.store, &self.root)? {
            Some(id) => id,
            None => self.store.write_tree(&Tree::empty())?,
        };
        debug!(%root, files = self.files_added, "tree written");
        Ok(root)
    }
}

impl std::fmt::Debug for TreeBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("files_added", &self.files_added)
            .finish()
    }
}

fn write_dir(store: &dyn ObjectStore, node: &DirNode) -> StoreResult<Option<ObjectId>> {
    let mut entries: Vec<TreeEntry> = node.files.values().cloned().collect();
    for (name, child) in &node.dirs {
        if let Some(id) = write_dir(store, child)? {
            entries.push(TreeEntry::new(EntryMode::Directory, name.clone(), id));
        }
    }
    if entries.is_empty() {
        return Ok(None);
    }
    store.write_tree(&Tree::new(entries)).map(Some)
}

fn split_path(path: &str) -> StoreResult<(Vec<&str>, &str)> {
    let mut parts: Vec<&str> = path.split('/').collect();
    for part in &parts {
        if part.is_empty() || *part == "." || *part == ".." || part.contains('\0') {
            return Err(StoreError::InvalidPath(format!(
                "{path:?}: bad component {part:?}"
            )));
        }
    }
    // `split` always yields at least one item.
    let name = parts.pop().unwrap_or_default();
    Ok((parts, name))
}

fn conflict(path: &str, at: &str) -> StoreError {
    StoreError::InvalidPath(format!("{path}: {at} is already used as a file or directory"))
}
