use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use grit_store::{EntryMode, WorkingFile};
use walkdir::WalkDir;

use crate::repo::GIT_DIR;

/// A file found in the work tree, not yet opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    /// `/`-separated path relative to the work-tree root.
    pub path: String,
    pub mode: EntryMode,
    pub full_path: PathBuf,
}

impl FoundFile {
    /// Open the file (or read the link target) for hashing.
    pub fn open(&self) -> io::Result<WorkingFile<Box<dyn Read>>> {
        let (size, source): (u64, Box<dyn Read>) = match self.mode {
            EntryMode::Symlink => {
                let bytes = link_target_bytes(&fs::read_link(&self.full_path)?);
                (bytes.len() as u64, Box::new(Cursor::new(bytes)))
            }
            _ => {
                let file = File::open(&self.full_path)?;
                (file.metadata()?.len(), Box::new(file))
            }
        };
        Ok(WorkingFile {
            path: self.path.clone(),
            mode: self.mode,
            size,
            source,
        })
    }
}

/// Every file under `root`, in path order, skipping `.git`.
pub fn work_tree_files(root: &Path) -> anyhow::Result<Vec<FoundFile>> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != OsStr::new(GIT_DIR));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.context("walking work tree")?;
        let file_type = entry.file_type();
        let mode = if file_type.is_symlink() {
            EntryMode::Symlink
        } else if file_type.is_file() {
            file_mode(&entry.metadata().context("reading file metadata")?)
        } else {
            continue;
        };

        let relative = entry.path().strip_prefix(root)?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component.as_os_str().to_str() {
                Some(part) => parts.push(part),
                None => bail!("path is not valid UTF-8: {}", entry.path().display()),
            }
        }
        files.push(FoundFile {
            path: parts.join("/"),
            mode,
            full_path: entry.path().to_path_buf(),
        });
    }
    Ok(files)
}

#[cfg(unix)]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        EntryMode::Executable
    } else {
        EntryMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> EntryMode {
    EntryMode::Regular
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_and_skips_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        fs::create_dir_all(root.join("src/empty")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("README"), "readme\n").unwrap();

        let files = work_tree_files(root).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["README", "src/main.rs"]);
        assert!(files.iter().all(|f| f.mode == EntryMode::Regular));
    }

    #[test]
    fn opened_file_reports_size_and_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        let files = work_tree_files(dir.path()).unwrap();

        let mut working = files[0].open().unwrap();
        assert_eq!(working.path, "a.txt");
        assert_eq!(working.size, 6);
        let mut content = String::new();
        working.source.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello\n");
    }

    #[cfg(unix)]
    #[test]
    fn executable_and_symlink_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", dir.path().join("link")).unwrap();

        let files = work_tree_files(dir.path()).unwrap();
        assert_eq!(files[0].path, "link");
        assert_eq!(files[0].mode, EntryMode::Symlink);
        assert_eq!(files[1].mode, EntryMode::Executable);

        let mut link = files[0].open().unwrap();
        let mut target = String::new();
        link.source.read_to_string(&mut target).unwrap();
        assert_eq!(target, "run.sh");
        assert_eq!(link.size, 6);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_link_target_is_kept_verbatim() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let target = OsStr::from_bytes(b"caf\xe9");
        std::os::unix::fs::symlink(target, dir.path().join("link")).unwrap();

        let files = work_tree_files(dir.path()).unwrap();
        let mut link = files[0].open().unwrap();
        let mut bytes = Vec::new();
        link.source.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"caf\xe9");
        assert_eq!(link.size, 4);
    }
}
