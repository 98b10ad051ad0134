use crate::stream::{copy_out, resolve_seek, Endianness, Result, SeekDirection, Stream};

/// A stream over a byte region owned by the caller.
///
/// The stream borrows the region and never copies it. Unlike [`crate::BufferStream`], it does
/// not treat the region as having a known end: seeking relative to [`SeekDirection::End`],
/// [`Stream::available_bytes`] and [`Stream::read_all`] all fail with
/// [`crate::StreamError::Unsupported`], and forward seeks are never checked against the region.
/// Callers that need those operations must track the size of the data themselves.
///
/// Reads are still confined to the borrowed slice. A read that would run past it fails with
/// [`crate::StreamError::OutOfRange`] and leaves the position unchanged.
#[derive(Clone, Debug)]
pub struct ExternalStream<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
}

impl<'a> ExternalStream<'a> {
    /// Constructor
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            endianness: Endianness::Default,
        }
    }
}

impl<'a> Stream for ExternalStream<'a> {
    fn preferred_endianness(&self) -> Endianness {
        self.endianness
    }

    fn set_preferred_endianness(&mut self, value: Endianness) {
        self.endianness = value;
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        copy_out(self.data, &mut self.pos, buf)
    }

    fn tell(&self) -> usize {
        self.pos
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.data.len().saturating_sub(self.pos))
    }

    fn seek_from(&mut self, offset: isize, dir: SeekDirection) -> Result<()> {
        self.pos = resolve_seek(self.pos, None, offset, dir)?;
        Ok(())
    }
}

impl<'a> From<&'a [u8]> for ExternalStream<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}
