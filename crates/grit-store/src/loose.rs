use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use grit_types::{ObjectHeader, ObjectId, ObjectType};
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, Span};

use crate::config::StoreConfig;
use crate::error::{CodecError, StoreError, StoreResult};
use crate::object::StoredObject;
use crate::reader::ObjectReader;
use crate::traits::ObjectStore;
use crate::tree::TreeEntryReader;
use crate::writer::ObjectWriter;

/// Contents of a fresh repository's `HEAD`.
pub const HEAD_CONTENTS: &str = "ref: refs/heads/master\n";

/// Directories created by [`LooseObjectStore::init`], relative to the git dir.
const LAYOUT_DIRS: [&str; 5] = ["objects", "objects/pack", "refs", "refs/heads", "refs/tags"];

/// Git-compatible loose object store.
///
/// Each object lives zlib-compressed at `<git_dir>/objects/<2 hex>/<38 hex>`.
/// New objects are written to a staging file in `objects/pack/` while they are
/// hashed, then renamed into place once their id is known, so a reader never
/// observes a partial object.
pub struct LooseObjectStore {
    git_dir: PathBuf,
    objects_dir: PathBuf,
    config: StoreConfig,
    span: Span,
}

impl LooseObjectStore {
    /// Create the repository layout and `HEAD` under `git_dir`.
    ///
    /// Fails with [`StoreError::PathExists`] before touching the disk if
    /// `git_dir` or any layout path already exists.
    pub fn init(git_dir: &Path, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let head = git_dir.join("HEAD");
        let existing = std::iter::once(git_dir.to_path_buf())
            .chain(LAYOUT_DIRS.iter().map(|dir| git_dir.join(dir)))
            .chain(std::iter::once(head.clone()))
            .find(|path| path.exists());
        if let Some(path) = existing {
            return Err(StoreError::PathExists(path));
        }

        for dir in LAYOUT_DIRS {
            fs::create_dir_all(git_dir.join(dir))?;
        }
        fs::write(&head, HEAD_CONTENTS)?;

        let store = Self::with_config(git_dir, config);
        info!(parent: &store.span, "initialized repository");
        Ok(store)
    }

    /// Open an existing repository.
    pub fn open(git_dir: &Path, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        if !git_dir.join("objects").is_dir() {
            return Err(StoreError::NotARepository(git_dir.to_path_buf()));
        }
        Ok(Self::with_config(git_dir, config))
    }

    /// Open an existing repository using `<git_dir>/grit.toml` if present.
    pub fn open_with_repo_config(git_dir: &Path) -> StoreResult<Self> {
        Self::open(git_dir, StoreConfig::load_or_default(git_dir)?)
    }

    fn with_config(git_dir: &Path, config: StoreConfig) -> Self {
        let span = info_span!("loose_store", git_dir = %git_dir.display());
        Self {
            git_dir: git_dir.to_path_buf(),
            objects_dir: git_dir.join("objects"),
            config,
            span,
        }
    }

    /// The repository's git dir.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Where `id` lives (or would live). Pure; touches nothing.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.fanout();
        self.objects_dir.join(dir).join(file)
    }

    /// The path of an existing object. Never creates anything.
    pub fn resolve(&self, id: &ObjectId) -> StoreResult<PathBuf> {
        let path = self.object_path(id);
        match fs::metadata(&path) {
            Ok(_) => Ok(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(*id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a uniquely named staging file in `objects/pack/`.
    pub fn stage_new_object(&self) -> StoreResult<StagedObject> {
        let file = tempfile::Builder::new()
            .prefix(&self.config.staging_prefix)
            .tempfile_in(self.objects_dir.join("pack"))?;
        Ok(StagedObject { file })
    }

    /// Atomically move a finished staging file to the path for `id`.
    ///
    /// An existing object at that path is replaced; same id means same bytes.
    pub fn publish(&self, staged: StagedObject, id: &ObjectId) -> StoreResult<PathBuf> {
        let dest = self.object_path(id);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.config.fsync_on_publish {
            staged.file.as_file().sync_all()?;
        }
        staged
            .file
            .persist(&dest)
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(dest)
    }

    /// Open an object for streaming decode.
    pub fn open_object(&self, id: &ObjectId) -> StoreResult<ObjectReader<File>> {
        let path = self.resolve(id)?;
        let file = File::open(path)?;
        ObjectReader::new(file).map_err(|e| StoreError::from(e).for_object(id))
    }

    /// Type and size of an object, without reading its payload.
    pub fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        let mut reader = self.open_object(id)?;
        reader
            .header()
            .map_err(|e| StoreError::from(e).for_object(id))
    }

    /// Stream the entries of a tree object.
    pub fn tree_entries(&self, id: &ObjectId) -> StoreResult<TreeEntryReader<ObjectReader<File>>> {
        let mut reader = self.open_object(id)?;
        let header = reader
            .header()
            .map_err(|e| StoreError::from(e).for_object(id))?;
        if header.kind != ObjectType::Tree {
            return Err(StoreError::UnexpectedType {
                id: *id,
                expected: ObjectType::Tree,
                actual: header.kind,
            });
        }
        Ok(TreeEntryReader::new(reader))
    }
}

impl ObjectStore for LooseObjectStore {
    fn write_stream(
        &self,
        kind: ObjectType,
        size: u64,
        source: &mut dyn Read,
    ) -> StoreResult<ObjectId> {
        let _enter = self.span.enter();

        let staged = self.stage_new_object()?;
        let mut writer = ObjectWriter::with_level(staged, self.config.compression());
        writer.write_header(kind, size)?;
        io::copy(source, &mut writer).map_err(CodecError::from_io)?;
        let staged = writer.close()?;
        let id = writer.hash()?;

        let path = self.publish(staged, &id)?;
        debug!(%id, %kind, size, path = %path.display(), "object published");
        Ok(id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let _enter = self.span.enter();

        let mut reader = match self.open_object(id) {
            Ok(reader) => reader,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let header = reader
            .header()
            .map_err(|e| StoreError::from(e).for_object(id))?;
        let data = reader
            .read_payload()
            .map_err(|e| StoreError::from(e).for_object(id))?;
        debug!(%id, kind = %header.kind, size = header.size, "object read");
        Ok(Some(StoredObject::new(header.kind, data)))
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        match self.resolve(id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for LooseObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LooseObjectStore")
            .field("git_dir", &self.git_dir)
            .field("config", &self.config)
            .finish()
    }
}

/// A staging file that has not been published yet.
///
/// Dropping it without [`LooseObjectStore::publish`] deletes the file, so
/// an abandoned write never leaves debris in `objects/pack/`.
#[derive(Debug)]
pub struct StagedObject {
    file: NamedTempFile,
}

impl StagedObject {
    /// Current location of the staging file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Write for StagedObject {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
