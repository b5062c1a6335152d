use std::io::{self, Read, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use grit_crypto::ObjectHasher;
use grit_types::{ObjectHeader, ObjectId, ObjectType};

use crate::error::{CodecError, CodecResult};

/// Streaming object encoder.
///
/// Frames a payload as `"<type> <size>\0<payload>"`, zlib-compresses it into
/// the sink, and hashes the uncompressed framed bytes on the way through.
///
/// A writer is single-use:
///
/// 1. [`write_header`](Self::write_header) declares type and exact size,
/// 2. payload bytes go in through [`write_payload`](Self::write_payload) or
///    [`std::io::Write`],
/// 3. [`close`](Self::close) finishes the zlib stream and hands back the sink.
///
/// Offering more bytes than declared fails with [`CodecError::Overflow`];
/// closing with fewer fails with [`CodecError::SizeMismatch`].
pub struct ObjectWriter<W: Write> {
    encoder: Option<ZlibEncoder<W>>,
    hasher: Option<ObjectHasher>,
    header: Option<ObjectHeader>,
    remaining: u64,
}

impl<W: Write> ObjectWriter<W> {
    /// Wrap a sink using the default compression level.
    pub fn new(sink: W) -> Self {
        Self::with_level(sink, Compression::default())
    }

    /// Wrap a sink using an explicit compression level.
    pub fn with_level(sink: W, level: Compression) -> Self {
        Self {
            encoder: Some(ZlibEncoder::new(sink, level)),
            hasher: None,
            header: None,
            remaining: 0,
        }
    }

    /// Emit the framed header and arm the writer for `size` payload bytes.
    pub fn write_header(&mut self, kind: ObjectType, size: u64) -> CodecResult<()> {
        let encoder = self.encoder.as_mut().ok_or(CodecError::Closed)?;
        if self.header.is_some() {
            return Err(CodecError::HeaderAlreadyWritten);
        }

        let header = ObjectHeader::new(kind, size);
        let framed = header.encode();
        encoder.write_all(&framed)?;

        self.hasher = Some(ObjectHasher::new(&framed));
        self.header = Some(header);
        self.remaining = size;
        Ok(())
    }

    /// Hash and compress payload bytes.
    ///
    /// If `buf` is longer than the remaining declared size, the bytes that
    /// still fit are written and hashed and the call fails with
    /// [`CodecError::Overflow`].
    pub fn write_payload(&mut self, buf: &[u8]) -> CodecResult<usize> {
        let encoder = self.encoder.as_mut().ok_or(CodecError::Closed)?;
        let hasher = self.hasher.as_mut().ok_or(CodecError::HeaderNotWritten)?;

        let fits = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let accepted = &buf[..fits];
        encoder.write_all(accepted)?;
        hasher.update(accepted);

        let declared = self.remaining;
        self.remaining -= fits as u64;

        if fits < buf.len() {
            return Err(CodecError::Overflow {
                declared,
                attempted: buf.len() as u64,
            });
        }
        Ok(fits)
    }

    /// Payload bytes still expected before the object is complete.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The declared header, once written.
    pub fn header(&self) -> Option<ObjectHeader> {
        self.header
    }

    /// Running digest of the framed bytes written so far.
    ///
    /// Once the full payload has been written this is the object's id.
    pub fn hash(&self) -> CodecResult<ObjectId> {
        self.hasher
            .as_ref()
            .map(ObjectHasher::current)
            .ok_or(CodecError::HeaderNotWritten)
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.encoder.is_none()
    }

    /// Finish the compressed stream and return the sink.
    ///
    /// Can only succeed once. A writer that saw no header, or fewer payload
    /// bytes than declared, fails and gives up its sink. The dropped encoder
    /// still flushes a stream trailer into it, so the sink's bytes must be
    /// discarded.
    pub fn close(&mut self) -> CodecResult<W> {
        let encoder = self.encoder.take().ok_or(CodecError::Closed)?;
        let header = self.header.ok_or(CodecError::HeaderNotWritten)?;
        if self.remaining > 0 {
            return Err(CodecError::SizeMismatch {
                declared: header.size,
                actual: header.size - self.remaining,
            });
        }
        Ok(encoder.finish()?)
    }
}

impl<W: Write> Write for ObjectWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_payload(buf).map_err(CodecError::into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Err(CodecError::Closed.into_io()),
        }
    }
}

impl<W: Write> std::fmt::Debug for ObjectWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectWriter")
            .field("header", &self.header)
            .field("remaining", &self.remaining)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Compute the id `source` would be stored under, without storing it.
pub fn hash_reader(kind: ObjectType, size: u64, mut source: impl Read) -> CodecResult<ObjectId> {
    let mut writer = ObjectWriter::with_level(io::sink(), Compression::none());
    writer.write_header(kind, size)?;
    io::copy(&mut source, &mut writer).map_err(CodecError::from_io)?;
    writer.close()?;
    writer.hash()
}
