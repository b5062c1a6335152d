use std::io;
use std::path::PathBuf;

use grit_types::{ObjectId, ObjectType, TypeError};

/// Errors from encoding or decoding a single object stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The header's type token is not blob, tree or commit.
    #[error("unknown object type: {0:?}")]
    UnknownObjectType(String),

    /// The header framing is violated (bad size token, oversized token).
    #[error("malformed object header: {reason}")]
    MalformedHeader { reason: String },

    /// The stream ended before the expected delimiter or payload byte.
    #[error("truncated object stream: {context}")]
    TruncatedStream { context: &'static str },

    /// More payload bytes were offered than the header declared.
    #[error("payload overflow: {attempted} bytes offered with {declared} declared bytes left")]
    Overflow { declared: u64, attempted: u64 },

    /// The payload length differs from the declared size.
    #[error("payload size mismatch: declared {declared}, got {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    /// Payload bytes were written before a header.
    #[error("object header not written")]
    HeaderNotWritten,

    /// Payload bytes were requested before the header was parsed.
    #[error("object header not read")]
    HeaderNotRead,

    /// A second header was written to the same writer.
    #[error("object header already written")]
    HeaderAlreadyWritten,

    /// The writer has already been closed.
    #[error("object writer is closed")]
    Closed,

    /// A tree payload record is malformed.
    #[error("malformed tree entry at payload offset {offset}: {reason}")]
    MalformedTreeEntry { offset: u64, reason: String },

    /// A tree entry name cannot be encoded.
    #[error("invalid tree entry name: {0:?}")]
    InvalidEntryName(String),

    /// The source is not a valid zlib stream.
    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),

    /// I/O error from the underlying sink or source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<TypeError> for CodecError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::UnknownObjectType(name) => Self::UnknownObjectType(name),
            other => Self::MalformedHeader {
                reason: other.to_string(),
            },
        }
    }
}

impl CodecError {
    /// Wrap into an `io::Error` so codec failures can cross `Read`/`Write`.
    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Self::Io(err) => err,
            Self::TruncatedStream { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, self),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }

    /// Recover a codec error that was wrapped by [`into_io`](Self::into_io).
    pub(crate) fn from_io(err: io::Error) -> Self {
        if err.get_ref().map(|e| e.is::<CodecError>()).unwrap_or(false) {
            match err.into_inner().map(|inner| inner.downcast::<CodecError>()) {
                Some(Ok(codec)) => *codec,
                Some(Err(other)) => Self::Io(io::Error::other(other)),
                None => Self::Io(io::Error::other("empty codec error")),
            }
        } else {
            Self::Io(err)
        }
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// A repository layout path already exists.
    #[error("path already exists: {}", .0.display())]
    PathExists(PathBuf),

    /// The directory does not contain an object database.
    #[error("not a repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// The object exists but has a different type than required.
    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedType {
        id: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    /// A working-tree path cannot be placed in a tree.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The store configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Encoding or decoding an object failed.
    #[error("{}", codec_context(.id))]
    Codec {
        id: Option<ObjectId>,
        #[source]
        source: CodecError,
    },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn codec_context(id: &Option<ObjectId>) -> String {
    match id {
        Some(id) => format!("corrupt object {id}"),
        None => "object codec error".to_string(),
    }
}

impl From<CodecError> for StoreError {
    fn from(source: CodecError) -> Self {
        match source {
            CodecError::Io(err) => Self::Io(err),
            source => Self::Codec { id: None, source },
        }
    }
}

impl StoreError {
    /// Attach the object id a codec failure belongs to.
    pub(crate) fn for_object(self, id: &ObjectId) -> Self {
        match self {
            Self::Codec { id: None, source } => Self::Codec {
                id: Some(*id),
                source,
            },
            other => other,
        }
    }

    /// The codec error underneath, if any.
    pub fn codec(&self) -> Option<&CodecError> {
        match self {
            Self::Codec { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
