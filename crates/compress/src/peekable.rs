use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Chain, Cursor, Read};

/// Look at the start of a stream, then read it from the beginning anyway.
///
/// Used to sniff magic bytes and copier headers on input that can only be
/// read once (container entries, decoders).
pub struct PeekableReader<R> {
    inner: R,
    head: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, head: Vec::new() }
    }

    /// Up to `limit` leading bytes; fewer only if the stream is shorter.
    /// Bytes already peeked are not read again.
    pub fn peek(&mut self, limit: usize) -> Result<&[u8]> {
        if let Some(missing) = limit.checked_sub(self.head.len()).filter(|missing| *missing > 0) {
            (&mut self.inner).take(missing as u64).read_to_end(&mut self.head).or_raise(|| ErrorKind::Io)?;
        }
        Ok(&self.head[..limit.min(self.head.len())])
    }

    /// The whole stream, peeked bytes first.
    pub fn into_reader(self) -> Chain<Cursor<Vec<u8>>, R> {
        Cursor::new(self.head).chain(self.inner)
    }
}
