use alloc::vec::Vec;
use core::ops::AddAssign;

use log::trace;

use crate::stream::{copy_out, resolve_seek, Endianness, Result, SeekDirection, Stream};

/// A stream over an owned, growable byte buffer.
///
/// The length of the stream is always known, so every read and seek is checked against it.
/// Cloning a `BufferStream` copies the bytes along with the position and preferred endianness;
/// the clone is fully independent of the original.
///
/// More bytes can be appended at any time with [`BufferStream::append`] or
/// [`BufferStream::append_stream`], which moves the end of the stream forward without changing
/// the current position.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BufferStream {
    data: Vec<u8>,
    pos: usize,
    endianness: Endianness,
}

impl BufferStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream over `data`, positioned at the start.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            endianness: Endianness::Default,
        }
    }

    /// Returns the total number of bytes in the stream, regardless of the position.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the stream holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Accesses all bytes of the stream, including those already read.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Extracts the inner buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Appends `bytes` to the end of the stream.
    pub fn append(&mut self, bytes: &[u8]) {
        trace!("appending {} bytes to stream of length {}", bytes.len(), self.data.len());
        self.data.extend_from_slice(bytes);
    }

    /// Appends the unread remainder of `source` to the end of this stream.
    ///
    /// On success `source` has been consumed: its position is left at its own end. If `source`
    /// has no known end this fails with [`crate::StreamError::Unsupported`] and neither stream
    /// changes.
    pub fn append_stream<S: Stream + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        let remainder = source.read_all()?;
        self.append(&remainder);
        Ok(())
    }

    /// Moves the unread remainder of another buffer onto the end of this one, without the
    /// intermediate copy [`BufferStream::append_stream`] makes.
    fn drain_from(&mut self, source: &mut BufferStream) {
        self.append(&source.data[source.pos..]);
        source.pos = source.data.len();
    }
}

impl Stream for BufferStream {
    fn preferred_endianness(&self) -> Endianness {
        self.endianness
    }

    fn set_preferred_endianness(&mut self, value: Endianness) {
        self.endianness = value;
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        copy_out(&self.data, &mut self.pos, buf)
    }

    fn tell(&self) -> usize {
        self.pos
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.data.len() - self.pos)
    }

    fn seek_from(&mut self, offset: isize, dir: SeekDirection) -> Result<()> {
        self.pos = resolve_seek(self.pos, Some(self.data.len()), offset, dir)?;
        Ok(())
    }
}

impl From<Vec<u8>> for BufferStream {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for BufferStream {
    fn from(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }
}

impl Extend<u8> for BufferStream {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        self.data.extend(iter);
    }
}

impl AddAssign<&[u8]> for BufferStream {
    fn add_assign(&mut self, bytes: &[u8]) {
        self.append(bytes);
    }
}

impl AddAssign<&mut BufferStream> for BufferStream {
    fn add_assign(&mut self, source: &mut BufferStream) {
        self.drain_from(source);
    }
}
