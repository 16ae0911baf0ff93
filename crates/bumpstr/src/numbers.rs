use thiserror::Error;

use crate::{
    buffer::Buffer,
    view::{View, is_space},
};

/// Longest input accepted by [`parse_int`], terminator included.
const SCRATCH_LEN: usize = 32;

/// Why [`parse_int`] rejected its input. Variants are listed in the order
/// they are checked.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseIntError {
    /// No digits, or the input is too long to be a number at all.
    #[error("not a valid number")]
    Invalid,
    /// A number followed by anything else, whitespace included.
    #[error("extra characters at end of input")]
    TrailingCharacters,
    /// The number does not fit in 64 bits.
    #[error("out of range of type long")]
    OutOfRange,
    /// The number fits in 64 bits but is above `i32::MAX`.
    #[error("greater than INT_MAX")]
    TooLarge,
    /// The number fits in 64 bits but is below `i32::MIN`.
    #[error("less than INT_MIN")]
    TooSmall,
}

/// Parse `view` as an `i32`.
///
/// Leading whitespace and a sign are accepted. The base follows the usual C
/// convention: `0x`/`0X` selects hexadecimal, a leading `0` octal, anything
/// else decimal.
///
/// ```rust
/// use bumpstr::{ParseIntError, View, parse_int};
///
/// assert_eq!(parse_int(View::from("  2")), Ok(2));
/// assert_eq!(parse_int(View::from("0x1F")), Ok(31));
/// assert_eq!(parse_int(View::from("3.2")), Err(ParseIntError::TrailingCharacters));
/// ```
///
/// # Errors
///
/// See [`ParseIntError`].
pub fn parse_int(view: View<'_>) -> Result<i32, ParseIntError> {
    let mut storage = [0u8; SCRATCH_LEN];
    let mut scratch = Buffer::from_fixed(&mut storage);
    scratch
        .try_append(view)
        .map_err(|_| ParseIntError::Invalid)?;

    let wide = parse_long(scratch.as_bytes())?;
    i32::try_from(wide).map_err(|_| {
        if wide > 0 {
            ParseIntError::TooLarge
        } else {
            ParseIntError::TooSmall
        }
    })
}

fn parse_long(bytes: &[u8]) -> Result<i64, ParseIntError> {
    let mut at = bytes.iter().take_while(|&&b| is_space(b)).count();
    let negative = match bytes.get(at) {
        Some(b'-') => {
            at += 1;
            true
        }
        Some(b'+') => {
            at += 1;
            false
        }
        _ => false,
    };

    let rest = &bytes[at..];
    let radix = match rest {
        [b'0', b'x' | b'X', digit, ..] if digit.is_ascii_hexdigit() => {
            at += 2;
            16
        }
        [b'0', ..] => 8,
        _ => 10,
    };

    // Accumulate towards the sign so that `i64::MIN` is reachable. `None`
    // marks overflow; digits are still consumed past it.
    let mut value = Some(0i64);
    let mut digits = 0;
    for digit in bytes[at..]
        .iter()
        .map_while(|&b| char::from(b).to_digit(radix))
    {
        digits += 1;
        value = value
            .and_then(|v| v.checked_mul(i64::from(radix)))
            .and_then(|v| {
                if negative {
                    v.checked_sub(i64::from(digit))
                } else {
                    v.checked_add(i64::from(digit))
                }
            });
    }

    if digits == 0 {
        return Err(ParseIntError::Invalid);
    }
    if at + digits != bytes.len() {
        return Err(ParseIntError::TrailingCharacters);
    }
    value.ok_or(ParseIntError::OutOfRange)
}
