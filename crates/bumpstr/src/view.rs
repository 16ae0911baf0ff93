//! Non-owning views over byte sequences.
//!
//! Every operation here is bytewise and, apart from [`View::dup`] and
//! [`View::dup_in`], allocation-free: views produced from a view borrow the
//! same backing storage. Search operations report "not found" by returning
//! the view's length, so the result can be used directly as a slice bound.

use core::{cmp::Ordering, fmt, iter::FusedIterator};

use bstr::BStr;

use crate::{
    arena::Arena,
    buffer::Buffer,
    numbers::{self, ParseIntError},
};

/// Longest byte sequence a view (or buffer) may hold: lengths are 31-bit.
pub const MAX_LEN: usize = i32::MAX as usize;

/// Whitespace as the C locale defines it: space, `\t`, `\n`, `\v`, `\f`,
/// `\r`.
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

/// Resolve a `[start, end)` pair where negative values count back from
/// `len`.
///
/// # Panics
///
/// Panics unless `0 <= start <= end <= len` after normalisation.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub(crate) fn normalize_range(len: usize, start: i32, end: i32) -> (usize, usize) {
    debug_assert!(len <= MAX_LEN);
    let len = len as i64;
    let resolve = |i: i32| if i < 0 { i64::from(i) + len } else { i64::from(i) };
    let (start, end) = (resolve(start), resolve(end));
    assert!(
        0 <= start && start <= end && end <= len,
        "range [{start}, {end}) out of bounds for length {len}"
    );
    (start as usize, end as usize)
}

/// An immutable `(pointer, length)` view of bytes it does not own.
///
/// Ordering is lexicographic over bytes, with a strict prefix sorting before
/// the longer sequence.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct View<'a> {
    bytes: &'a [u8],
}

impl<'a> View<'a> {
    /// View `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than [`MAX_LEN`].
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        assert!(bytes.len() <= MAX_LEN, "view exceeds the 31-bit length limit");
        Self { bytes }
    }

    /// The viewed bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Number of viewed bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the first `n` bytes of both views are equal. `false` if either
    /// view is shorter than `n`.
    #[must_use]
    pub fn equal_n(self, other: View<'_>, n: usize) -> bool {
        self.len() >= n && other.len() >= n && self.bytes[..n] == other.bytes[..n]
    }

    /// Three-way comparison, suitable for `sort_by(View::compare)`.
    #[must_use]
    pub fn compare(&self, other: &View<'_>) -> Ordering {
        self.bytes.cmp(other.bytes)
    }

    /// Bytes `[start, end)`. Negative indices count back from the end, so
    /// `substr(-2, -1)` is the second-to-last byte.
    ///
    /// # Panics
    ///
    /// Panics unless `0 <= start <= end <= len` once negative indices are
    /// resolved.
    #[must_use]
    pub fn substr(self, start: i32, end: i32) -> View<'a> {
        let (start, end) = normalize_range(self.len(), start, end);
        View {
            bytes: &self.bytes[start..end],
        }
    }

    /// Copy the bytes into a new heap buffer.
    #[must_use]
    pub fn dup(self) -> Buffer<'static> {
        let mut copy = Buffer::with_capacity(self.len() + 1);
        copy.append(self);
        copy
    }

    /// Copy the bytes into `arena`.
    #[must_use]
    pub fn dup_in<'b>(self, arena: &'b Arena) -> ViewMut<'b> {
        ViewMut::new(arena.alloc_copy(self.bytes))
    }

    /// Narrow the view past leading and trailing whitespace.
    #[must_use]
    pub fn trim(self) -> View<'a> {
        let start = self
            .bytes
            .iter()
            .position(|&b| !is_space(b))
            .unwrap_or(self.len());
        let rest = &self.bytes[start..];
        let end = rest.iter().rposition(|&b| !is_space(b)).map_or(0, |i| i + 1);
        View {
            bytes: &rest[..end],
        }
    }

    /// Index of the first `c`, or `len` if absent.
    #[must_use]
    pub fn find_byte(self, c: u8) -> usize {
        self.bytes
            .iter()
            .position(|&b| b == c)
            .unwrap_or(self.len())
    }

    /// Index of the last `c`, or `len` if absent.
    #[must_use]
    pub fn rfind_byte(self, c: u8) -> usize {
        self.bytes
            .iter()
            .rposition(|&b| b == c)
            .unwrap_or(self.len())
    }

    /// Length of the leading run of bytes that appear in `accept`.
    #[must_use]
    pub fn span(self, accept: View<'_>) -> usize {
        self.bytes
            .iter()
            .take_while(|b| accept.bytes.contains(b))
            .count()
    }

    /// Length of the leading run of bytes that do not appear in `reject`.
    #[must_use]
    pub fn cspan(self, reject: View<'_>) -> usize {
        self.bytes
            .iter()
            .take_while(|b| !reject.bytes.contains(b))
            .count()
    }

    /// Index of the first occurrence of `needle`, or `len` if absent. An
    /// empty needle matches at 0.
    #[must_use]
    pub fn find(self, needle: View<'_>) -> usize {
        if needle.len() > self.len() {
            return self.len();
        }
        (0..=self.len() - needle.len())
            .find(|&i| self.bytes[i..i + needle.len()] == *needle.bytes)
            .unwrap_or(self.len())
    }

    /// The rest of the view from its first byte that appears in `accept`;
    /// empty if there is none.
    #[must_use]
    pub fn break_any(self, accept: View<'_>) -> View<'a> {
        View {
            bytes: &self.bytes[self.cspan(accept)..],
        }
    }

    /// Next token after `*cursor`: skips bytes in `delim`, returns the run
    /// of bytes up to the next delimiter, and advances `*cursor` past it.
    ///
    /// Returns an empty view once the input is exhausted.
    ///
    /// ```rust
    /// use bumpstr::View;
    ///
    /// let line = View::from("  good \t morning \t ");
    /// let mut cursor = 0;
    /// assert_eq!(line.tokenize(" \t".into(), &mut cursor), "good");
    /// assert_eq!(line.tokenize(" \t".into(), &mut cursor), "morning");
    /// assert!(line.tokenize(" \t".into(), &mut cursor).is_empty());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `*cursor > len`.
    pub fn tokenize(self, delim: View<'_>, cursor: &mut usize) -> View<'a> {
        let rest = View {
            bytes: &self.bytes[*cursor..],
        };
        let skip = rest.span(delim);
        let from = &rest.bytes[skip..];
        let end = View { bytes: from }.cspan(delim);
        *cursor += skip + end;
        View {
            bytes: &from[..end],
        }
    }

    /// Iterate over the tokens [`View::tokenize`] would return.
    #[must_use]
    pub fn tokens<'d>(self, delim: View<'d>) -> Tokens<'a, 'd> {
        Tokens {
            source: self,
            delim,
            cursor: 0,
        }
    }

    /// Number of occurrences of `c`.
    #[must_use]
    pub fn count_byte(self, c: u8) -> usize {
        self.bytes.iter().filter(|&&b| b == c).count()
    }

    /// Whether the view begins with `prefix`.
    #[must_use]
    pub fn starts_with(self, prefix: View<'_>) -> bool {
        self.equal_n(prefix, prefix.len())
    }

    /// Whether the view ends with `suffix`.
    #[must_use]
    pub fn ends_with(self, suffix: View<'_>) -> bool {
        self.len() >= suffix.len() && self.bytes[self.len() - suffix.len()..] == *suffix.bytes
    }

    /// Parse as an `i32`; see [`parse_int`](crate::parse_int).
    ///
    /// # Errors
    ///
    /// See [`ParseIntError`].
    pub fn parse_int(self) -> Result<i32, ParseIntError> {
        numbers::parse_int(self)
    }
}

impl<'a> From<&'a [u8]> for View<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        View::new(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for View<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        View::new(bytes)
    }
}

impl<'a> From<&'a str> for View<'a> {
    fn from(s: &'a str) -> Self {
        View::new(s.as_bytes())
    }
}

impl AsRef<[u8]> for View<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

macro_rules! impl_eq_bytes {
    ($($rhs:ty),*) => {
        $(
            impl PartialEq<$rhs> for View<'_> {
                fn eq(&self, other: &$rhs) -> bool {
                    self.bytes == AsRef::<[u8]>::as_ref(other)
                }
            }
        )*
    };
}

impl_eq_bytes!(str, &str, [u8], &[u8]);

impl<const N: usize> PartialEq<&[u8; N]> for View<'_> {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.bytes == other.as_slice()
    }
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(BStr::new(self.bytes), f)
    }
}

impl fmt::Display for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(BStr::new(self.bytes), f)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for View<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.bytes)
    }
}

/// Iterator returned by [`View::tokens`].
#[derive(Debug, Clone)]
pub struct Tokens<'a, 'd> {
    source: View<'a>,
    delim: View<'d>,
    cursor: usize,
}

impl<'a> Iterator for Tokens<'a, '_> {
    type Item = View<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.source.tokenize(self.delim, &mut self.cursor);
        (!token.is_empty()).then_some(token)
    }
}

impl FusedIterator for Tokens<'_, '_> {}

/// A view whose bytes may be rewritten in place.
pub struct ViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> ViewMut<'a> {
    /// View `bytes` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than [`MAX_LEN`].
    #[must_use]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        assert!(bytes.len() <= MAX_LEN, "view exceeds the 31-bit length limit");
        Self { bytes }
    }

    /// Reborrow as a read-only view.
    #[must_use]
    pub fn as_view(&self) -> View<'_> {
        View { bytes: self.bytes }
    }

    /// Give up mutability, keeping the original lifetime.
    #[must_use]
    pub fn into_view(self) -> View<'a> {
        View { bytes: self.bytes }
    }

    /// The viewed bytes.
    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Replace every `from` byte with `to`.
    pub fn translate(&mut self, from: u8, to: u8) {
        for b in self.bytes.iter_mut().filter(|b| **b == from) {
            *b = to;
        }
    }

    /// Upper-case ASCII letters; other bytes are left alone.
    pub fn make_ascii_uppercase(&mut self) {
        self.bytes.make_ascii_uppercase();
    }

    /// Lower-case ASCII letters; other bytes are left alone.
    pub fn make_ascii_lowercase(&mut self) {
        self.bytes.make_ascii_lowercase();
    }
}

impl<'a> From<&'a mut [u8]> for ViewMut<'a> {
    fn from(bytes: &'a mut [u8]) -> Self {
        ViewMut::new(bytes)
    }
}

impl fmt::Debug for ViewMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

impl fmt::Display for ViewMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_view(), f)
    }
}
