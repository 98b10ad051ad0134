use alloc::string::String;
use alloc::vec::Vec;
use core::mem::size_of;

use log::{debug, trace};
use zerocopy::byteorder::{BE, I16, I32, I64, LE, U16, U32, U64};
use zerocopy::FromBytes;

use crate::cast::numeric_cast;

/// Result type used by every stream operation.
pub type Result<T> = core::result::Result<T, StreamError>;

/// Byte order used when decoding multi-byte values.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum Endianness {
    /// Use the native byte order of the target.
    #[default]
    Default,
    /// Least significant byte first.
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
}

impl Endianness {
    /// The byte order of the target this crate was compiled for.
    pub const NATIVE: Endianness = if cfg!(target_endian = "big") {
        Endianness::BigEndian
    } else {
        Endianness::LittleEndian
    };

    /// Returns the concrete byte order, substituting [`Endianness::NATIVE`] for
    /// [`Endianness::Default`].
    pub fn resolve(self) -> Endianness {
        match self {
            Endianness::Default => Self::NATIVE,
            order => order,
        }
    }
}

/// Reference point for a seek offset.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SeekDirection {
    /// Relative to the current position.
    Current,
    /// Relative to the start of the stream.
    Begin,
    /// Relative to the end of the stream. Only meaningful for streams with a known length.
    End,
}

/// Error type for stream operations.
///
/// Every operation that returns one of these leaves the stream position where it was before the
/// call.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StreamError {
    /// A read or seek would cross the end of the stream, or would move before its start.
    OutOfRange,

    /// The operation needs to know where the stream ends, but the backing storage has no
    /// known end.
    Unsupported,

    /// An integer conversion between offset and position types did not fit the destination.
    Narrowing,

    /// Decoded string data is not well-formed UTF-8.
    InvalidEncoding,

    /// A decoder was called with parameters that cannot describe a value, such as a fixed-point
    /// number wider than 64 bits.
    InvalidArgument,
}

impl core::error::Error for StreamError {}

impl core::fmt::Display for StreamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfRange => f.write_str("The operation would cross the bounds of the stream"),
            Self::Unsupported => f.write_str("The stream has no known end"),
            Self::Narrowing => f.write_str("The value does not fit the destination integer type"),
            Self::InvalidEncoding => f.write_str("The data is not valid UTF-8"),
            Self::InvalidArgument => f.write_str("The decoder arguments are invalid"),
        }
    }
}

/// A seekable source of bytes with endian-aware decoding.
///
/// Implementations provide the position primitives ([`Stream::tell`], [`Stream::seek_from`]),
/// a single copy primitive ([`Stream::read_into`]) and storage for the preferred endianness.
/// Everything else is derived from those and shared by all implementations.
///
/// All reads are all-or-nothing: either the whole request is satisfied and the position advances
/// by exactly the number of bytes consumed, or the call fails and the position is unchanged.
pub trait Stream {
    /// Returns the byte order used by the `read_*` methods that don't name one explicitly.
    fn preferred_endianness(&self) -> Endianness;

    /// Sets the byte order used by the `read_*` methods that don't name one explicitly.
    fn set_preferred_endianness(&mut self, value: Endianness);

    /// Fills `buf` with the next `buf.len()` bytes of the stream and advances the position.
    ///
    /// If fewer bytes are available, this fails without copying anything or moving the position.
    /// An empty `buf` always succeeds.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Returns the current position, in bytes from the start of the stream.
    fn tell(&self) -> usize;

    /// Moves the position to `offset` bytes relative to `dir`.
    fn seek_from(&mut self, offset: isize, dir: SeekDirection) -> Result<()>;

    /// Returns `true` if at least one more byte can be read.
    ///
    /// Fails with [`StreamError::Unsupported`] if the stream has no known end.
    fn has_bytes_available(&mut self) -> Result<bool> {
        Ok(self.available_bytes()? > 0)
    }

    /// Returns the number of bytes between the current position and the end of the stream.
    ///
    /// This locates the end by seeking to it and back, so it fails with
    /// [`StreamError::Unsupported`] if the stream has no known end. The position is unchanged
    /// either way.
    fn available_bytes(&mut self) -> Result<usize> {
        let pos = self.tell();
        self.seek_from(0, SeekDirection::End)?;
        let end = self.tell();
        self.seek_unsigned_from(pos, SeekDirection::Begin)?;
        Ok(end.saturating_sub(pos))
    }

    /// Moves the position by `offset` bytes relative to the current position.
    fn seek(&mut self, offset: isize) -> Result<()> {
        self.seek_from(offset, SeekDirection::Current)
    }

    /// Moves the position forward by `offset` bytes.
    ///
    /// Fails with [`StreamError::Narrowing`] if `offset` does not fit in `isize`.
    fn seek_unsigned(&mut self, offset: usize) -> Result<()> {
        self.seek(numeric_cast(offset)?)
    }

    /// Moves the position to `offset` bytes relative to `dir`.
    ///
    /// Fails with [`StreamError::Narrowing`] if `offset` does not fit in `isize`.
    fn seek_unsigned_from(&mut self, offset: usize, dir: SeekDirection) -> Result<()> {
        self.seek_from(numeric_cast(offset)?, dir)
    }

    /// Returns an upper limit on how many bytes a read from the current position can copy, if
    /// the backing storage knows one.
    ///
    /// This only lets [`Stream::read`] reject an oversized request before allocating; it is not
    /// the logical end of the stream. The default returns `None`.
    fn remaining_hint(&self) -> Option<usize> {
        None
    }

    /// Reads exactly `size` bytes and returns them in a new vector.
    ///
    /// A `size` larger than the stream can supply fails with [`StreamError::OutOfRange`] before
    /// any memory is allocated.
    fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        if self.remaining_hint().is_some_and(|remaining| size > remaining) {
            debug!("rejected read of {size} bytes at {}", self.tell());
            return Err(StreamError::OutOfRange);
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| StreamError::OutOfRange)?;
        buf.resize(size, 0);
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads everything from the current position to the end of the stream.
    ///
    /// Fails with [`StreamError::Unsupported`] if the stream has no known end; nothing is copied
    /// in that case.
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let size = self.available_bytes()?;
        self.read(size)
    }

    /// Reads a small array of bytes, with a constant length.
    #[inline(always)]
    fn read_cbytes<const N: usize>(&mut self) -> Result<[u8; N]>
    where
        Self: Sized,
    {
        let mut buf = [0u8; N];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads a single `u8` value.
    #[inline(always)]
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a single `i8` value.
    #[inline(always)]
    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a `u16` in the preferred byte order.
    fn read_u16(&mut self) -> Result<u16> {
        match self.preferred_endianness().resolve() {
            Endianness::BigEndian => self.read_u16_be(),
            _ => self.read_u16_le(),
        }
    }

    /// Reads a `u16` in big-endian byte order.
    #[inline(always)]
    fn read_u16_be(&mut self) -> Result<u16> {
        Ok(read_word::<U16<BE>, _>(self)?.get())
    }

    /// Reads a `u16` in little-endian byte order.
    #[inline(always)]
    fn read_u16_le(&mut self) -> Result<u16> {
        Ok(read_word::<U16<LE>, _>(self)?.get())
    }

    /// Reads a `u32` in the preferred byte order.
    fn read_u32(&mut self) -> Result<u32> {
        match self.preferred_endianness().resolve() {
            Endianness::BigEndian => self.read_u32_be(),
            _ => self.read_u32_le(),
        }
    }

    /// Reads a `u32` in big-endian byte order.
    #[inline(always)]
    fn read_u32_be(&mut self) -> Result<u32> {
        Ok(read_word::<U32<BE>, _>(self)?.get())
    }

    /// Reads a `u32` in little-endian byte order.
    #[inline(always)]
    fn read_u32_le(&mut self) -> Result<u32> {
        Ok(read_word::<U32<LE>, _>(self)?.get())
    }

    /// Reads a `u64` in the preferred byte order.
    fn read_u64(&mut self) -> Result<u64> {
        match self.preferred_endianness().resolve() {
            Endianness::BigEndian => self.read_u64_be(),
            _ => self.read_u64_le(),
        }
    }

    /// Reads a `u64` in big-endian byte order.
    #[inline(always)]
    fn read_u64_be(&mut self) -> Result<u64> {
        Ok(read_word::<U64<BE>, _>(self)?.get())
    }

    /// Reads a `u64` in little-endian byte order.
    #[inline(always)]
    fn read_u64_le(&mut self) -> Result<u64> {
        Ok(read_word::<U64<LE>, _>(self)?.get())
    }

    /// Reads an `i16` in the preferred byte order.
    fn read_i16(&mut self) -> Result<i16> {
        match self.preferred_endianness().resolve() {
            Endianness::BigEndian => self.read_i16_be(),
            _ => self.read_i16_le(),
        }
    }

    /// Reads an `i16` in big-endian byte order.
    #[inline(always)]
    fn read_i16_be(&mut self) -> Result<i16> {
        Ok(read_word::<I16<BE>, _>(self)?.get())
    }

    /// Reads an `i16` in little-endian byte order.
    #[inline(always)]
    fn read_i16_le(&mut self) -> Result<i16> {
        Ok(read_word::<I16<LE>, _>(self)?.get())
    }

    /// Reads an `i32` in the preferred byte order.
    fn read_i32(&mut self) -> Result<i32> {
        match self.preferred_endianness().resolve() {
            Endianness::BigEndian => self.read_i32_be(),
            _ => self.read_i32_le(),
        }
    }

    /// Reads an `i32` in big-endian byte order.
    #[inline(always)]
    fn read_i32_be(&mut self) -> Result<i32> {
        Ok(read_word::<I32<BE>, _>(self)?.get())
    }

    /// Reads an `i32` in little-endian byte order.
    #[inline(always)]
    fn read_i32_le(&mut self) -> Result<i32> {
        Ok(read_word::<I32<LE>, _>(self)?.get())
    }

    /// Reads an `i64` in the preferred byte order.
    fn read_i64(&mut self) -> Result<i64> {
        match self.preferred_endianness().resolve() {
            Endianness::BigEndian => self.read_i64_be(),
            _ => self.read_i64_le(),
        }
    }

    /// Reads an `i64` in big-endian byte order.
    #[inline(always)]
    fn read_i64_be(&mut self) -> Result<i64> {
        Ok(read_word::<I64<BE>, _>(self)?.get())
    }

    /// Reads an `i64` in little-endian byte order.
    #[inline(always)]
    fn read_i64_le(&mut self) -> Result<i64> {
        Ok(read_word::<I64<LE>, _>(self)?.get())
    }

    /// Reads a signed fixed-point number in the preferred byte order.
    ///
    /// See [`Stream::read_fixed_point_be`] for the encoding.
    fn read_fixed_point(&mut self, integer_length: u32, fractional_length: u32) -> Result<f64> {
        let order = self.preferred_endianness().resolve();
        decode_fixed_point(self, order, integer_length, fractional_length)
    }

    /// Reads a signed fixed-point number stored in big-endian byte order.
    ///
    /// The value occupies `integer_length + fractional_length` bits, rounded up to whole bytes.
    /// Those bits are a two's complement integer whose sign bit is the most significant of the
    /// `integer_length + fractional_length` bits; the result is that integer divided by
    /// `2^fractional_length`. For example, `[0x00, 0x80]` read as 8.8 fixed point is `0.5`.
    ///
    /// Fails with [`StreamError::InvalidArgument`] if the total width is 0 or more than 64 bits.
    fn read_fixed_point_be(&mut self, integer_length: u32, fractional_length: u32) -> Result<f64> {
        decode_fixed_point(self, Endianness::BigEndian, integer_length, fractional_length)
    }

    /// Reads a signed fixed-point number stored in little-endian byte order.
    ///
    /// See [`Stream::read_fixed_point_be`] for the encoding.
    fn read_fixed_point_le(&mut self, integer_length: u32, fractional_length: u32) -> Result<f64> {
        decode_fixed_point(self, Endianness::LittleEndian, integer_length, fractional_length)
    }

    /// Reads bytes up to a zero byte. The terminator is consumed but not returned.
    ///
    /// If the data runs out before a terminator is found, this fails and the position is
    /// restored.
    fn read_null_terminated_bytes(&mut self) -> Result<Vec<u8>> {
        rewind_on_error(self, |s| {
            let mut bytes = Vec::new();
            loop {
                match s.read_u8()? {
                    0 => return Ok(bytes),
                    b => bytes.push(b),
                }
            }
        })
    }

    /// Reads a zero-terminated UTF-8 string. The terminator is consumed but not returned.
    fn read_null_terminated_string(&mut self) -> Result<String> {
        rewind_on_error(self, |s| into_string(s.read_null_terminated_bytes()?))
    }

    /// Reads a string prefixed with a single length byte, returning the raw bytes.
    fn read_pascal_bytes(&mut self) -> Result<Vec<u8>> {
        rewind_on_error(self, |s| {
            let len = s.read_u8()?;
            s.read(usize::from(len))
        })
    }

    /// Reads a UTF-8 string prefixed with a single length byte.
    fn read_pascal_string(&mut self) -> Result<String> {
        rewind_on_error(self, |s| into_string(s.read_pascal_bytes()?))
    }

    /// Reads exactly `length` bytes and returns them as a UTF-8 string.
    ///
    /// No terminator is expected; zero bytes are kept as they are.
    fn read_string(&mut self, length: usize) -> Result<String> {
        rewind_on_error(self, |s| into_string(s.read(length)?))
    }

    /// Reads a zero-terminated string as a `bstr::BString`, without validating it.
    #[cfg(feature = "bstr")]
    fn read_null_terminated_bstring(&mut self) -> Result<bstr::BString> {
        Ok(bstr::BString::from(self.read_null_terminated_bytes()?))
    }

    /// Reads a length-prefixed string as a `bstr::BString`, without validating it.
    #[cfg(feature = "bstr")]
    fn read_pascal_bstring(&mut self) -> Result<bstr::BString> {
        Ok(bstr::BString::from(self.read_pascal_bytes()?))
    }

    /// Reads exactly `length` bytes as a `bstr::BString`, without validating them.
    #[cfg(feature = "bstr")]
    fn read_bstring(&mut self, length: usize) -> Result<bstr::BString> {
        Ok(bstr::BString::from(self.read(length)?))
    }
}

/// Computes the position a seek would move to, without committing it.
///
/// `end` is the length of a bounded stream, or `None` if the stream has no known end. Only the
/// lower bound and `usize` overflow are checked when `end` is `None`.
pub(crate) fn resolve_seek(
    position: usize,
    end: Option<usize>,
    offset: isize,
    dir: SeekDirection,
) -> Result<usize> {
    let magnitude = offset.unsigned_abs();
    let candidate = match dir {
        SeekDirection::Begin if offset < 0 => None,
        SeekDirection::Begin => Some(magnitude),
        SeekDirection::End => {
            let Some(end) = end else {
                debug!("rejected seek from end: stream has no known end");
                return Err(StreamError::Unsupported);
            };
            if offset > 0 {
                None
            } else {
                end.checked_sub(magnitude)
            }
        }
        SeekDirection::Current if offset < 0 => position.checked_sub(magnitude),
        SeekDirection::Current => position.checked_add(magnitude),
    };

    match (candidate, end) {
        (Some(pos), Some(end)) if pos > end => {
            debug!("rejected seek to {pos}: past end of stream at {end}");
            Err(StreamError::OutOfRange)
        }
        (Some(pos), _) => Ok(pos),
        (None, _) => {
            debug!("rejected seek by {offset} from {dir:?} at position {position}");
            Err(StreamError::OutOfRange)
        }
    }
}

/// Copies `buf.len()` bytes of `data` starting at `*pos` and advances `*pos`, or fails without
/// touching either if `data` is too short.
pub(crate) fn copy_out(data: &[u8], pos: &mut usize, buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }

    let end = pos.checked_add(buf.len());
    let Some(src) = end.and_then(|end| data.get(*pos..end)) else {
        trace!(
            "rejected read of {} bytes at {}: only {} available",
            buf.len(),
            *pos,
            data.len().saturating_sub(*pos)
        );
        return Err(StreamError::OutOfRange);
    };

    buf.copy_from_slice(src);
    *pos += buf.len();
    Ok(())
}

const MAX_WORD: usize = 8;

fn read_word<W, S>(stream: &mut S) -> Result<W>
where
    W: FromBytes,
    S: Stream + ?Sized,
{
    let mut buf = [0u8; MAX_WORD];
    let bytes = &mut buf[..size_of::<W>()];
    stream.read_into(bytes)?;
    W::read_from_bytes(bytes).map_err(|_| StreamError::OutOfRange)
}

fn decode_fixed_point<S: Stream + ?Sized>(
    stream: &mut S,
    order: Endianness,
    integer_length: u32,
    fractional_length: u32,
) -> Result<f64> {
    let width = integer_length
        .checked_add(fractional_length)
        .filter(|w| (1..=64).contains(w))
        .ok_or(StreamError::InvalidArgument)?;

    let mut buf = [0u8; MAX_WORD];
    let bytes = &mut buf[..width.div_ceil(8) as usize];
    stream.read_into(bytes)?;

    let assemble = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    let raw = match order {
        Endianness::LittleEndian => bytes.iter().rev().fold(0, assemble),
        _ => bytes.iter().fold(0, assemble),
    };

    // Sign-extend from bit `width - 1`; bits above the value width are discarded.
    let shift = 64 - width;
    let signed = ((raw << shift) as i64) >> shift;
    Ok(signed as f64 / (1u128 << fractional_length) as f64)
}

/// Runs `decode`, restoring the stream position if it fails.
fn rewind_on_error<S, T>(stream: &mut S, decode: impl FnOnce(&mut S) -> Result<T>) -> Result<T>
where
    S: Stream + ?Sized,
{
    let start = stream.tell();
    let result = decode(stream);
    if result.is_err() && stream.tell() != start {
        let rewound = stream.seek_unsigned_from(start, SeekDirection::Begin);
        debug_assert!(rewound.is_ok(), "cannot rewind to position {start}: {rewound:?}");
    }
    result
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| StreamError::InvalidEncoding)
}
