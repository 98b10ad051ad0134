//! Seekable binary streams with endian-aware decoding of integers, fixed-point numbers and
//! strings.
//!
//! All decoding lives on the [`Stream`] trait and is shared by its two implementations:
//!
//! * [`BufferStream`] owns a growable `Vec<u8>` and always knows its length.
//! * [`ExternalStream`] borrows a byte region managed by the caller and treats it as having no
//!   known end.
//!
//! Multi-byte decoders come in explicit big-endian (`_be`) and little-endian (`_le`) forms, plus
//! a form that uses the stream's [`Stream::preferred_endianness`]. A preference of
//! [`Endianness::Default`] means the target's native byte order.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]
#![forbid(unused_must_use)]
#![warn(missing_docs)]

extern crate alloc;

mod buffer;
mod cast;
mod external;
mod stream;


pub use buffer::BufferStream;
pub use cast::numeric_cast;
pub use external::ExternalStream;
pub use stream::{Endianness, Result, SeekDirection, Stream, StreamError};
