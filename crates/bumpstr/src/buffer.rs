//! Growable or fixed-capacity byte accumulation buffers.
//!
//! A [`Buffer`] starts out either on storage it borrows (a caller-supplied
//! array, see [`Buffer::from_fixed`]) or on storage it owns, drawn from the
//! allocator it was built with. Growing operations move a borrowed buffer onto
//! owned storage the first time it runs out of room; the move is one-way. The
//! `try_*` operations never grow: they fail with
//! [`Error::InsufficientCapacity`] and leave the contents as they were.
//!
//! Whenever a buffer has any capacity at all, the byte just past its contents
//! is `0`, so [`Buffer::as_bytes_with_nul`] is always available.

use alloc::alloc::{Layout, handle_alloc_error};
use core::{cmp, fmt, mem, ptr::NonNull, slice};

use crate::{
    alloc_hook::{Heap, Realloc},
    error::Error,
    view::{MAX_LEN, View, ViewMut, normalize_range},
};

/// Where a buffer's bytes currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// A caller-supplied array the buffer borrows and never frees.
    Fixed,
    /// Storage the buffer obtained from its allocator and frees itself.
    Owned,
}

enum Storage<'a> {
    Fixed(&'a mut [u8]),
    /// Every byte of `ptr[..cap]` is initialised. `cap == 0` owns nothing.
    Owned { ptr: NonNull<u8>, cap: usize },
}

impl<'a> Storage<'a> {
    const EMPTY: Self = Storage::Owned {
        ptr: NonNull::dangling(),
        cap: 0,
    };

    fn capacity(&self) -> usize {
        match self {
            Storage::Fixed(bytes) => bytes.len(),
            Storage::Owned { cap, .. } => *cap,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Fixed(bytes) => &**bytes,
            // SAFETY: `ptr` is valid for `cap` initialised bytes (or dangling
            // with `cap == 0`) and owned by this storage.
            Storage::Owned { ptr, cap } => unsafe { slice::from_raw_parts(ptr.as_ptr(), *cap) },
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::Fixed(bytes) => &mut **bytes,
            // SAFETY: as in `bytes`; `&mut self` makes the access exclusive.
            Storage::Owned { ptr, cap } => unsafe {
                slice::from_raw_parts_mut(ptr.as_ptr(), *cap)
            },
        }
    }
}

/// A byte string builder with a trailing `0` terminator.
///
/// The allocator `A` is chosen at construction and serves every allocation
/// the buffer makes: [`Heap`] by default, or a borrowed
/// [`Arena`](crate::Arena) via [`Buffer::new_in`].
///
/// # Examples
///
/// ```rust
/// use bumpstr::{Buffer, StorageMode};
///
/// let mut storage = [0u8; 8];
/// let mut buffer = Buffer::from_fixed(&mut storage);
/// buffer.append("good ".into());
/// assert_eq!(buffer.mode(), StorageMode::Fixed);
///
/// buffer.append("morning".into());
/// assert_eq!(buffer.mode(), StorageMode::Owned);
/// assert_eq!(buffer, "good morning");
/// ```
pub struct Buffer<'a, A: Realloc = Heap> {
    storage: Storage<'a>,
    len: usize,
    alloc: A,
}

// SAFETY: owned storage is exclusively owned by the buffer, and fixed storage
// is a unique borrow; the allocator decides the rest.
unsafe impl<A: Realloc + Send> Send for Buffer<'_, A> {}
// SAFETY: shared access never mutates the storage.
unsafe impl<A: Realloc + Sync> Sync for Buffer<'_, A> {}

impl Buffer<'static> {
    /// An empty heap buffer. Nothing is allocated until the first write.
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Heap)
    }

    /// An empty heap buffer holding at least `cap` bytes, terminator
    /// included.
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self::with_capacity_in(cap, Heap)
    }
}

impl<'a> Buffer<'a> {
    /// A buffer writing into `storage` until it needs more room, then moving
    /// to the heap.
    #[must_use]
    pub fn from_fixed(storage: &'a mut [u8]) -> Self {
        Self::from_fixed_in(storage, Heap)
    }
}

impl<'a, A: Realloc> Buffer<'a, A> {
    /// An empty buffer that will allocate from `alloc`.
    pub const fn new_in(alloc: A) -> Self {
        Self {
            storage: Storage::EMPTY,
            len: 0,
            alloc,
        }
    }

    /// An empty buffer holding at least `cap` bytes from `alloc`.
    pub fn with_capacity_in(cap: usize, alloc: A) -> Self {
        let mut buffer = Self::new_in(alloc);
        buffer.reserve(cap);
        buffer
    }

    /// A buffer writing into `storage` until it needs more room, then moving
    /// to storage from `alloc`.
    pub fn from_fixed_in(storage: &'a mut [u8], alloc: A) -> Self {
        if let Some(first) = storage.first_mut() {
            *first = 0;
        }
        Self {
            storage: Storage::Fixed(storage),
            len: 0,
            alloc,
        }
    }

    /// The allocator this buffer grows with.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Number of bytes held, terminator excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes of storage, terminator slot included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Whether the buffer is still on caller-supplied storage.
    #[must_use]
    pub fn mode(&self) -> StorageMode {
        match self.storage {
            Storage::Fixed(_) => StorageMode::Fixed,
            Storage::Owned { .. } => StorageMode::Owned,
        }
    }

    /// The contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage.bytes()[..self.len]
    }

    /// The contents followed by their `0` terminator.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        if self.capacity() == 0 {
            return b"\0";
        }
        &self.storage.bytes()[..=self.len]
    }

    /// View the contents.
    #[must_use]
    pub fn as_view(&self) -> View<'_> {
        View::new(self.as_bytes())
    }

    /// View the contents mutably, e.g. to case-fold them in place.
    pub fn as_view_mut(&mut self) -> ViewMut<'_> {
        let len = self.len;
        ViewMut::new(&mut self.storage.bytes_mut()[..len])
    }

    /// Drop the contents, keeping the storage.
    pub fn clear(&mut self) {
        self.set_len(0);
    }

    /// Shorten the contents to `len` bytes. Has no effect if the buffer is
    /// already that short.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.set_len(len);
        }
    }

    /// Free owned storage and return to the empty state. A buffer on fixed
    /// storage keeps it and only forgets its contents. Calling this again,
    /// or on a buffer that never allocated, does nothing.
    pub fn destroy(&mut self) {
        self.release();
        self.set_len(0);
    }

    /// Make room for at least `min_capacity` bytes, terminator included,
    /// moving to owned storage if the current storage is too small.
    pub fn reserve(&mut self, min_capacity: usize) {
        if self.capacity() < min_capacity {
            self.grow_to(min_capacity);
        }
    }

    /// Append `bytes`, growing as needed.
    ///
    /// # Panics
    ///
    /// Panics if the result would exceed [`MAX_LEN`].
    pub fn append(&mut self, bytes: View<'_>) {
        self.make_room(self.len + bytes.len());
        self.push_within(bytes.as_bytes());
    }

    /// Append `bytes` if they fit in the current storage.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientCapacity`] if they do not; the buffer is left
    /// unchanged.
    pub fn try_append(&mut self, bytes: View<'_>) -> Result<(), Error> {
        self.check_room(self.len + bytes.len())?;
        self.push_within(bytes.as_bytes());
        Ok(())
    }

    /// Append formatted text, growing as needed. Usually called through
    /// `format_args!`; `write!` works too, since a buffer is a
    /// [`fmt::Write`].
    ///
    /// ```rust
    /// use bumpstr::Buffer;
    ///
    /// let mut buffer = Buffer::new();
    /// buffer.print(format_args!("{} {}", 123, "red balloons"));
    /// assert_eq!(buffer, "123 red balloons");
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if a formatting trait implementation returns an error.
    pub fn print(&mut self, args: fmt::Arguments<'_>) {
        fmt::Write::write_fmt(self, args)
            .expect("a formatting trait implementation returned an error when the underlying stream did not");
    }

    /// Append formatted text if it fits in the current storage.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientCapacity`] with the capacity the whole text would
    /// have needed; the buffer is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if a formatting trait implementation returns an error.
    pub fn try_print(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error> {
        let start = self.len;
        let mut sink = Bounded {
            buffer: &mut *self,
            overflow: 0,
        };
        fmt::Write::write_fmt(&mut sink, args)
            .expect("a formatting trait implementation returned an error when the underlying stream did not");
        let overflow = sink.overflow;
        if overflow > 0 {
            let required = self.len + overflow + 1;
            self.set_len(start);
            return Err(Error::InsufficientCapacity {
                required,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Replace the first occurrence of `from` with `to`, growing as needed.
    /// Returns whether an occurrence was found; an empty `from` never is.
    pub fn replace(&mut self, from: View<'_>, to: View<'_>) -> bool {
        let Some(at) = self.position_of(from) else {
            return false;
        };
        let new_len = self.len - from.len() + to.len();
        self.make_room(new_len);
        self.splice_within(at, at + from.len(), to);
        true
    }

    /// Replace the first occurrence of `from` with `to` if the result fits in
    /// the current storage.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientCapacity`] if `from` was found but the result does
    /// not fit; the buffer is left unchanged.
    pub fn try_replace(&mut self, from: View<'_>, to: View<'_>) -> Result<bool, Error> {
        let Some(at) = self.position_of(from) else {
            return Ok(false);
        };
        self.check_room(self.len - from.len() + to.len())?;
        self.splice_within(at, at + from.len(), to);
        Ok(true)
    }

    /// Replace bytes `[start, end)` with `with`, growing as needed. Indices
    /// resolve as in [`View::substr`]. Inserting is `start == end`; deleting
    /// is an empty `with`.
    ///
    /// # Panics
    ///
    /// Panics unless `0 <= start <= end <= len` once negative indices are
    /// resolved.
    pub fn splice(&mut self, start: i32, end: i32, with: View<'_>) {
        let (start, end) = normalize_range(self.len, start, end);
        self.make_room(self.len - (end - start) + with.len());
        self.splice_within(start, end, with);
    }

    /// [`Buffer::splice`] without growing.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientCapacity`] if the result does not fit; the buffer
    /// is left unchanged.
    ///
    /// # Panics
    ///
    /// As [`Buffer::splice`].
    pub fn try_splice(&mut self, start: i32, end: i32, with: View<'_>) -> Result<(), Error> {
        let (start, end) = normalize_range(self.len, start, end);
        self.check_room(self.len - (end - start) + with.len())?;
        self.splice_within(start, end, with);
        Ok(())
    }

    /// Move the buffer onto storage from `alloc`. A buffer on fixed storage
    /// stays there; an owned one is copied with its capacity and its old
    /// storage freed.
    pub fn rehome_in<B: Realloc>(mut self, alloc: B) -> Buffer<'a, B> {
        let len = self.len;
        match mem::replace(&mut self.storage, Storage::EMPTY) {
            Storage::Fixed(fixed) => Buffer {
                storage: Storage::Fixed(fixed),
                len,
                alloc,
            },
            owned => {
                self.storage = owned;
                let mut moved = Buffer::new_in(alloc);
                if self.capacity() > 0 {
                    moved.grow_to(self.capacity());
                    moved.push_within(self.as_bytes());
                }
                moved
            }
        }
    }

    /// Panic unless the length and terminator invariants hold.
    #[cfg(any(test, feature = "fuzzing"))]
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        assert!(self.len <= MAX_LEN);
        if self.capacity() == 0 {
            assert_eq!(self.len, 0);
        } else {
            assert!(self.len < self.capacity(), "no room for the terminator");
            assert_eq!(self.storage.bytes()[self.len], 0, "missing terminator");
        }
    }

    /// Storage past the contents, terminator slot included.
    #[cfg(feature = "std")]
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.storage.bytes_mut()[len..]
    }

    /// Bytes that can still be appended without growing.
    pub(crate) fn room(&self) -> usize {
        self.capacity().saturating_sub(self.len + 1)
    }

    /// Set the length and write the terminator.
    ///
    /// # Panics
    ///
    /// Panics if `len` leaves no room for the terminator.
    pub(crate) fn set_len(&mut self, len: usize) {
        if self.capacity() == 0 {
            assert_eq!(len, 0, "buffer without storage cannot hold bytes");
            self.len = 0;
            return;
        }
        self.storage.bytes_mut()[len] = 0;
        self.len = len;
    }

    /// Copy `bytes` after the contents. The caller has made room.
    pub(crate) fn push_within(&mut self, bytes: &[u8]) {
        if bytes.is_empty() && self.capacity() == 0 {
            return;
        }
        let start = self.len;
        self.storage.bytes_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        self.set_len(start + bytes.len());
    }

    fn position_of(&self, needle: View<'_>) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let at = self.as_view().find(needle);
        (at < self.len).then_some(at)
    }

    /// Remove `[start, end)` and insert `with` there. The caller has made
    /// room for the result.
    fn splice_within(&mut self, start: usize, end: usize, with: View<'_>) {
        let len = self.len;
        let new_len = len - (end - start) + with.len();
        let bytes = self.storage.bytes_mut();
        bytes.copy_within(end..len, start + with.len());
        bytes[start..start + with.len()].copy_from_slice(with.as_bytes());
        self.set_len(new_len);
    }

    fn check_room(&self, new_len: usize) -> Result<(), Error> {
        let capacity = self.capacity();
        if new_len >= capacity {
            return Err(Error::InsufficientCapacity {
                required: new_len + 1,
                capacity,
            });
        }
        Ok(())
    }

    /// Grow, doubling, until `new_len` bytes and the terminator fit.
    fn make_room(&mut self, new_len: usize) {
        assert!(
            new_len <= MAX_LEN,
            "buffer of {new_len} bytes exceeds the 31-bit length limit"
        );
        let capacity = self.capacity();
        if capacity < new_len + 1 {
            self.grow_to(cmp::max(capacity.saturating_mul(2), new_len + 1));
        }
    }

    fn grow_to(&mut self, new_cap: usize) {
        let old_cap = self.capacity();
        debug_assert!(new_cap > old_cap);
        let (fresh, preserved) = match self.storage {
            Storage::Owned { ptr, cap } => {
                let old = (cap > 0).then_some(ptr);
                // SAFETY: `ptr` came from `self.alloc` with `cap` bytes and
                // is replaced below, so it is never used again.
                let fresh = unsafe { self.alloc.realloc(old, cap, new_cap) };
                (fresh, cap)
            }
            Storage::Fixed(ref fixed) => {
                // SAFETY: a fresh request.
                let fresh = unsafe { self.alloc.realloc(None, 0, new_cap) };
                if let Some(fresh) = fresh {
                    // SAFETY: `fresh` is valid for `new_cap > len` bytes and
                    // cannot overlap the borrowed array.
                    unsafe {
                        fresh
                            .as_ptr()
                            .copy_from_nonoverlapping(fixed.as_ptr(), self.len);
                    }
                }
                debug_trace!(len = self.len, cap = new_cap, "buffer moved to owned storage");
                (fresh, self.len)
            }
        };
        let fresh = fresh.unwrap_or_else(|| handle_alloc_error(byte_layout(new_cap)));
        // SAFETY: `preserved <= new_cap`; zeroing the rest keeps every owned
        // byte initialised.
        unsafe {
            fresh
                .as_ptr()
                .add(preserved)
                .write_bytes(0, new_cap - preserved);
        }
        debug_trace!(from = old_cap, to = new_cap, "buffer grown");
        self.storage = Storage::Owned {
            ptr: fresh,
            cap: new_cap,
        };
    }

    fn release(&mut self) {
        if let Storage::Owned { ptr, cap } = self.storage {
            if cap > 0 {
                // SAFETY: `ptr` came from `self.alloc` with `cap` bytes and the
                // storage is reset right after.
                unsafe { self.alloc.realloc(Some(ptr), cap, 0) };
                self.storage = Storage::EMPTY;
            }
        }
    }
}

fn byte_layout(size: usize) -> Layout {
    Layout::array::<u8>(size).unwrap_or_else(|_| panic!("capacity overflow: {size} bytes"))
}

/// Formatting sink that stops writing once the buffer is full but keeps
/// counting, so the caller can report how much room the text needed.
struct Bounded<'b, 'a, A: Realloc> {
    buffer: &'b mut Buffer<'a, A>,
    overflow: usize,
}

impl<A: Realloc> fmt::Write for Bounded<'_, '_, A> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.overflow > 0 || s.len() > self.buffer.room() {
            self.overflow += s.len();
        } else {
            self.buffer.push_within(s.as_bytes());
        }
        Ok(())
    }
}

impl<A: Realloc> fmt::Write for Buffer<'_, A> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(View::from(s));
        Ok(())
    }
}

impl<A: Realloc> Drop for Buffer<'_, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl Default for Buffer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Realloc + Clone> Clone for Buffer<'_, A> {
    /// Clones onto owned storage, even from a buffer on fixed storage.
    fn clone(&self) -> Self {
        let mut copy = Buffer::new_in(self.alloc.clone());
        copy.make_room(self.len);
        copy.push_within(self.as_bytes());
        copy
    }
}

impl<A: Realloc> AsRef<[u8]> for Buffer<'_, A> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<A: Realloc, B: Realloc> PartialEq<Buffer<'_, B>> for Buffer<'_, A> {
    fn eq(&self, other: &Buffer<'_, B>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<A: Realloc> Eq for Buffer<'_, A> {}

impl<A: Realloc> PartialEq<View<'_>> for Buffer<'_, A> {
    fn eq(&self, other: &View<'_>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

macro_rules! impl_eq_bytes {
    ($($rhs:ty),*) => {
        $(
            impl<A: Realloc> PartialEq<$rhs> for Buffer<'_, A> {
                fn eq(&self, other: &$rhs) -> bool {
                    self.as_bytes() == AsRef::<[u8]>::as_ref(other)
                }
            }
        )*
    };
}

impl_eq_bytes!(str, &str, [u8], &[u8]);

impl<A: Realloc> fmt::Debug for Buffer<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

impl<A: Realloc> fmt::Display for Buffer<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_view(), f)
    }
}

#[cfg(feature = "serde")]
impl<A: Realloc> serde::Serialize for Buffer<'_, A> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}
