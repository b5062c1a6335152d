use std::path::{Path, PathBuf};

use grit_store::{LooseObjectStore, StoreError, StoreResult};
use tracing::debug;

/// Name of the git dir inside a work tree.
pub const GIT_DIR: &str = ".git";

/// Find the work-tree root: `start` or the nearest ancestor holding `.git`.
pub fn discover(start: &Path) -> StoreResult<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(GIT_DIR).is_dir() {
            debug!(root = %dir.display(), "repository discovered");
            return Ok(dir.to_path_buf());
        }
    }
    Err(StoreError::NotARepository(start.to_path_buf()))
}

/// Discover the repository around `start` and open its object store.
pub fn open(start: &Path) -> StoreResult<(PathBuf, LooseObjectStore)> {
    let root = discover(start)?;
    let store = LooseObjectStore::open_with_repo_config(&root.join(GIT_DIR))?;
    Ok((root, store))
}
