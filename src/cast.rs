use crate::stream::{Result, StreamError};

/// Converts `value` to another integer type, failing with [`StreamError::Narrowing`] instead of
/// truncating when the value does not fit the destination type.
///
/// This is used wherever signed seek offsets meet unsigned positions and lengths.
#[inline]
pub fn numeric_cast<T, U>(value: T) -> Result<U>
where
    U: TryFrom<T>,
{
    U::try_from(value).map_err(|_| StreamError::Narrowing)
}
