//! The reallocation hook a [`Buffer`](crate::Buffer) draws its storage from.
//!
//! A hook is told `(old pointer or none, old size, new size)` and answers with
//! the new region, mirroring a general grow/shrink/free primitive. The value
//! implementing the hook is the allocation context: binding a buffer to
//! `&arena_a` or `&arena_b` routes its storage to that arena without any
//! global state.

use alloc::alloc::{self as global, Layout, handle_alloc_error};
use core::ptr::NonNull;

/// Reallocation hook.
///
/// # Safety
///
/// Implementations must honour the contract documented on
/// [`Realloc::realloc`]. In particular a returned region must stay valid, at
/// a fixed address, until it is handed back to `realloc` (or, for allocators
/// that release in bulk, until the allocator itself is torn down, which the
/// borrow checker orders after every borrower).
pub unsafe trait Realloc {
    /// Allocate, grow, shrink or release a region.
    ///
    /// - `(None, _, 0)` does nothing and returns `None`.
    /// - `(None, _, n)` returns a fresh region valid for `n` bytes.
    /// - `(Some(p), old, 0)` releases `p` and returns `None`.
    /// - `(Some(p), old, n)` returns a region valid for `n` bytes whose first
    ///   `min(old, n)` bytes equal those of `p`; `p` must not be used again.
    ///
    /// Running out of memory is fatal and never reported through the return
    /// value.
    ///
    /// # Safety
    ///
    /// `ptr`, when present, must come from a previous call on the same
    /// allocator, must not have been released since, and `old_size` must be
    /// the size that call was asked for.
    unsafe fn realloc(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>>;
}

unsafe impl<R: Realloc + ?Sized> Realloc for &R {
    #[inline]
    unsafe fn realloc(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).realloc(ptr, old_size, new_size) }
    }
}

/// The process's global allocator. Used when a buffer is not bound to an
/// arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heap;

unsafe impl Realloc for Heap {
    unsafe fn realloc(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        match (ptr, new_size) {
            (None, 0) => None,
            (None, size) => {
                let layout = byte_layout(size);
                // SAFETY: `layout` has a non-zero size.
                let raw = unsafe { global::alloc(layout) };
                Some(NonNull::new(raw).unwrap_or_else(|| handle_alloc_error(layout)))
            }
            (Some(old), 0) => {
                // SAFETY: the caller guarantees `old` was allocated here with
                // `old_size` bytes.
                unsafe { global::dealloc(old.as_ptr(), byte_layout(old_size)) };
                None
            }
            (Some(old), size) => {
                let layout = byte_layout(size);
                // SAFETY: as above; `size` is non-zero and fits `isize`.
                let raw = unsafe { global::realloc(old.as_ptr(), byte_layout(old_size), size) };
                Some(NonNull::new(raw).unwrap_or_else(|| handle_alloc_error(layout)))
            }
        }
    }
}

fn byte_layout(size: usize) -> Layout {
    Layout::array::<u8>(size).unwrap_or_else(|_| panic!("capacity overflow: {size} bytes"))
}
