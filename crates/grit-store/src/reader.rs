use std::io::{self, BufRead, BufReader, Read};

use flate2::read::ZlibDecoder;
use grit_types::{ObjectHeader, ObjectType};

use crate::error::{CodecError, CodecResult};

/// Longest accepted type token (`"commit"` is 6; leave room for junk detection).
const MAX_TYPE_TOKEN: u64 = 16;
/// Longest accepted decimal size token (`u64::MAX` has 20 digits).
const MAX_SIZE_TOKEN: u64 = 20;

/// Streaming object decoder.
///
/// Inflates a loose object, parses its `"<type> <size>\0"` header, then
/// yields exactly `size` payload bytes through [`std::io::Read`].
pub struct ObjectReader<R: Read> {
    inner: BufReader<ZlibDecoder<R>>,
    header: Option<ObjectHeader>,
    remaining: u64,
}

impl<R: Read> ObjectReader<R> {
    /// Begin decompressing `source`.
    ///
    /// The first block is inflated eagerly so a source that is not a zlib
    /// stream fails here with [`CodecError::Decompress`].
    pub fn new(source: R) -> CodecResult<Self> {
        let mut inner = BufReader::new(ZlibDecoder::new(source));
        inner.fill_buf().map_err(inflate_error)?;
        Ok(Self {
            inner,
            header: None,
            remaining: 0,
        })
    }

    /// Parse the object header. Later calls return the cached header.
    pub fn header(&mut self) -> CodecResult<ObjectHeader> {
        if let Some(header) = self.header {
            return Ok(header);
        }

        let kind_token = self.read_token(b' ', MAX_TYPE_TOKEN, "object type")?;
        let kind = ObjectType::from_name(&kind_token)?;
        let size_token = self.read_token(0, MAX_SIZE_TOKEN, "object size")?;
        let size = parse_size(&size_token)?;

        let header = ObjectHeader::new(kind, size);
        self.header = Some(header);
        self.remaining = size;
        Ok(header)
    }

    /// Payload bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the whole payload and check it ends where the header says.
    ///
    /// Bytes after the declared size fail with [`CodecError::SizeMismatch`];
    /// a payload cut short fails with [`CodecError::TruncatedStream`].
    pub fn read_payload(&mut self) -> CodecResult<Vec<u8>> {
        let header = self.header()?;
        let capacity = usize::try_from(self.remaining.min(1 << 20)).unwrap_or(0);
        let mut payload = Vec::with_capacity(capacity);
        self.read_to_end(&mut payload).map_err(CodecError::from_io)?;

        let trailing = io::copy(&mut self.inner, &mut io::sink()).map_err(inflate_error)?;
        if trailing > 0 {
            return Err(CodecError::SizeMismatch {
                declared: header.size,
                actual: header.size + trailing,
            });
        }
        Ok(payload)
    }

    fn read_token(&mut self, delim: u8, max: u64, context: &'static str) -> CodecResult<Vec<u8>> {
        let mut token = Vec::new();
        let read = (&mut self.inner)
            .take(max + 1)
            .read_until(delim, &mut token)
            .map_err(inflate_error)?;

        if token.last() == Some(&delim) {
            token.pop();
            return Ok(token);
        }
        if read as u64 > max {
            return Err(CodecError::MalformedHeader {
                reason: format!("{context} token longer than {max} bytes"),
            });
        }
        Err(CodecError::TruncatedStream { context })
    }
}

impl<R: Read> Read for ObjectReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.header.is_none() {
            return Err(CodecError::HeaderNotRead.into_io());
        }
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let got = self
            .inner
            .read(&mut buf[..want])
            .map_err(|e| inflate_error(e).into_io())?;
        if got == 0 {
            return Err(CodecError::TruncatedStream { context: "payload" }.into_io());
        }
        self.remaining -= got as u64;
        Ok(got)
    }
}

impl<R: Read> std::fmt::Debug for ObjectReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectReader")
            .field("header", &self.header)
            .field("remaining", &self.remaining)
            .finish()
    }
}

fn parse_size(token: &[u8]) -> CodecResult<u64> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return Err(CodecError::MalformedHeader {
            reason: format!("size {:?} is not a decimal number", String::from_utf8_lossy(token)),
        });
    }
    // Digits only, so the token is valid UTF-8.
    let text = std::str::from_utf8(token).map_err(|e| CodecError::MalformedHeader {
        reason: e.to_string(),
    })?;
    text.parse().map_err(|_| CodecError::MalformedHeader {
        reason: format!("size {text} does not fit in 64 bits"),
    })
}

fn inflate_error(err: io::Error) -> CodecError {
    match err.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => CodecError::Decompress(err),
        _ => CodecError::Io(err),
    }
}
