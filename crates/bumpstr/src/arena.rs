//! Bump arena with chained chunks.
//!
//! Allocation carves `(header, payload)` records out of the current chunk.
//! The header is one machine word holding the size the payload was requested
//! with, so a later [`Realloc::realloc`] knows how many bytes are worth
//! preserving. When the current chunk cannot fit a record it is retired,
//! never freed or moved: every payload pointer handed out stays valid at a
//! fixed address until the arena is destroyed or dropped.
//!
//! ```text
//!   retired[0]          retired[1]          current
//!  +------------+      +------------+      +-------------------------+
//!  |h|payload|h|.|     |h|payload...|      |h|payload|h|payload|     |
//!  +------------+      +------------+      +-------------------------+
//!                                                             ^ len
//! ```

use alloc::{
    alloc::{self as global, Layout, handle_alloc_error},
    vec::Vec,
};
use core::{cell::RefCell, cmp, fmt, mem, ptr::NonNull, slice};

use crate::{
    alloc_hook::Realloc,
    options::{ArenaOptions, DEFAULT_CHUNK_CAPACITY},
};

const ALIGNMENT: usize = 8;
const HEADER: usize = mem::size_of::<usize>();
#[cfg(feature = "debug")]
const POISON: u8 = 0xCD;

const _: () = assert!(ALIGNMENT.is_power_of_two() && ALIGNMENT >= mem::align_of::<usize>());

/// Round `n` up to the next multiple of [`ALIGNMENT`].
fn align_up(n: usize) -> usize {
    n.checked_add(ALIGNMENT - 1)
        .map(|n| n & !(ALIGNMENT - 1))
        .unwrap_or_else(|| panic!("arena request of {n} bytes overflows usize"))
}

/// One block of raw memory owned by an arena. A zero-capacity chunk owns
/// nothing.
struct Chunk {
    data: NonNull<u8>,
    cap: usize,
}

// SAFETY: a chunk is the sole owner of its allocation.
unsafe impl Send for Chunk {}

impl Chunk {
    const fn empty() -> Self {
        Self {
            data: NonNull::dangling(),
            cap: 0,
        }
    }

    fn new(cap: usize) -> Self {
        debug_assert!(cap > 0);
        let layout = Self::layout(cap);
        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { global::alloc(layout) };
        let data = NonNull::new(raw).unwrap_or_else(|| handle_alloc_error(layout));
        debug_trace!(cap, "arena chunk allocated");
        Self { data, cap }
    }

    fn layout(cap: usize) -> Layout {
        Layout::from_size_align(cap, ALIGNMENT)
            .unwrap_or_else(|_| panic!("arena chunk of {cap} bytes is too large"))
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if self.cap > 0 {
            // SAFETY: allocated in `Chunk::new` with this exact layout.
            unsafe { global::dealloc(self.data.as_ptr(), Self::layout(self.cap)) };
        }
    }
}

struct State {
    current: Chunk,
    len: usize,
    retired: Vec<Chunk>,
}

impl State {
    const fn empty() -> Self {
        Self {
            current: Chunk::empty(),
            len: 0,
            retired: Vec::new(),
        }
    }
}

/// A grow-only bump allocator.
///
/// Regions are released only in bulk, by [`Arena::destroy`] or by dropping
/// the arena. Both require exclusive access, so the borrow checker rules out
/// any region outliving its arena.
///
/// An arena is not `Sync`: share one per thread, or none.
///
/// # Examples
///
/// ```rust
/// use bumpstr::Arena;
///
/// let arena = Arena::new();
/// let a = arena.alloc_copy(b"hello");
/// let b = arena.alloc_copy(b"world");
/// a[0] = b'j';
/// assert_eq!((&*a, &*b), (&b"jello"[..], &b"world"[..]));
/// ```
pub struct Arena {
    options: ArenaOptions,
    state: RefCell<State>,
}

impl Arena {
    /// An empty arena. Nothing is allocated until the first request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            options: ArenaOptions {
                chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            },
            state: RefCell::new(State::empty()),
        }
    }

    /// An empty arena using `options` for every chunk it allocates.
    #[must_use]
    pub const fn with_options(options: ArenaOptions) -> Self {
        Self {
            options,
            state: RefCell::new(State::empty()),
        }
    }

    /// An arena whose first chunk holds `cap` bytes, allocated up front.
    /// Later chunks use the default options.
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        let arena = Self::new();
        if cap > 0 {
            arena.state.borrow_mut().current = Chunk::new(cap);
        }
        arena
    }

    /// The options this arena sizes its chunks with.
    #[must_use]
    pub fn options(&self) -> &ArenaOptions {
        &self.options
    }

    /// Bytes used in the current chunk, headers and padding included.
    #[must_use]
    pub fn used(&self) -> usize {
        self.state.borrow().len
    }

    /// Capacity of the current chunk.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.borrow().current.cap
    }

    /// Number of chunks this arena has outgrown but keeps alive.
    #[must_use]
    pub fn retired_chunks(&self) -> usize {
        self.state.borrow().retired.len()
    }

    /// Total bytes held by the arena across all of its chunks.
    #[must_use]
    pub fn reserved_bytes(&self) -> usize {
        let state = self.state.borrow();
        state.current.cap + state.retired.iter().map(|c| c.cap).sum::<usize>()
    }

    /// Allocate `size` zeroed bytes.
    #[allow(clippy::mut_from_ref)] // every region handed out is disjoint
    pub fn alloc(&self, size: usize) -> &mut [u8] {
        if size == 0 {
            return &mut [];
        }
        let payload = self.bump(size);
        // SAFETY: `bump` returned `size` writable bytes that no other region
        // overlaps and that live as long as `&self`.
        unsafe {
            payload.as_ptr().write_bytes(0, size);
            slice::from_raw_parts_mut(payload.as_ptr(), size)
        }
    }

    /// Allocate a copy of `bytes`.
    #[allow(clippy::mut_from_ref)] // every region handed out is disjoint
    pub fn alloc_copy(&self, bytes: &[u8]) -> &mut [u8] {
        if bytes.is_empty() {
            return &mut [];
        }
        let payload = self.bump(bytes.len());
        // SAFETY: as in `alloc`; `bytes` cannot overlap a fresh region.
        unsafe {
            payload
                .as_ptr()
                .copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());
            slice::from_raw_parts_mut(payload.as_ptr(), bytes.len())
        }
    }

    /// Free every chunk and return to the empty state. The arena can be used
    /// again afterwards, or destroyed again.
    pub fn destroy(&mut self) {
        let state = self.state.get_mut();
        debug_trace!(
            retired = state.retired.len(),
            cap = state.current.cap,
            "arena destroyed"
        );
        // Oldest chunks go first, then the current one.
        for chunk in state.retired.drain(..) {
            drop(chunk);
        }
        *state = State::empty();
    }

    /// Reserve a `(header, payload)` record for `size` payload bytes and
    /// return the payload pointer.
    fn bump(&self, size: usize) -> NonNull<u8> {
        let required = align_up(
            size.checked_add(HEADER)
                .unwrap_or_else(|| panic!("arena request of {size} bytes overflows usize")),
        );

        let mut state = self.state.borrow_mut();
        if state.current.cap - state.len < required {
            let fresh = Chunk::new(cmp::max(required, self.options.chunk_capacity));
            let outgrown = mem::replace(&mut state.current, fresh);
            if outgrown.cap > 0 {
                debug_trace!(used = state.len, cap = outgrown.cap, "arena chunk retired");
                state.retired.push(outgrown);
            }
            state.len = 0;
        }

        let offset = state.len;
        state.len = offset + required;
        // SAFETY: `offset + required <= cap`, `offset` is a multiple of
        // ALIGNMENT, so the header is in bounds and aligned for `usize`.
        unsafe {
            let header = state.current.data.add(offset);
            header.cast::<usize>().write(size);
            header.add(HEADER)
        }
    }
}

/// Size a payload was requested with.
///
/// # Safety
///
/// `payload` must come from [`Arena::bump`] on a live arena.
unsafe fn recorded_size(payload: NonNull<u8>) -> usize {
    // SAFETY: `bump` wrote the header immediately before every payload.
    unsafe { payload.sub(HEADER).cast::<usize>().read() }
}

unsafe impl Realloc for Arena {
    /// Bump-allocate a new record and copy `min(recorded size, new_size)`
    /// bytes from `ptr` into it. `old_size` is ignored in favour of the size
    /// recorded in the header. Releasing is a no-op; with the `debug` feature
    /// the released payload is overwritten with `0xCD`.
    unsafe fn realloc(
        &self,
        ptr: Option<NonNull<u8>>,
        _old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        match (ptr, new_size) {
            (None, 0) => None,
            (Some(freed), 0) => {
                #[cfg(feature = "debug")]
                // SAFETY: the caller guarantees `freed` came from this arena
                // and is not used again.
                unsafe {
                    freed.as_ptr().write_bytes(POISON, recorded_size(freed));
                }
                #[cfg(not(feature = "debug"))]
                let _ = freed;
                None
            }
            (old, size) => {
                let fresh = self.bump(size);
                if let Some(old) = old {
                    // SAFETY: `old` came from this arena, so it has a header
                    // and stays valid (its chunk is at worst retired).
                    unsafe {
                        let preserved = cmp::min(recorded_size(old), size);
                        fresh
                            .as_ptr()
                            .copy_from_nonoverlapping(old.as_ptr(), preserved);
                    }
                }
                Some(fresh)
            }
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Arena")
            .field("len", &state.len)
            .field("cap", &state.current.cap)
            .field("retired", &state.retired.len())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(chunk_capacity: usize) -> Arena {
        Arena::with_options(ArenaOptions { chunk_capacity })
    }

    #[test]
    fn zero_valued_arena_allocates_lazily() {
        let arena = Arena::new();
        assert_eq!(arena.capacity(), 0);
        assert_eq!(arena.used(), 0);

        let bytes = arena.alloc(3);
        assert_eq!(bytes, &[0, 0, 0]);
        assert_eq!(arena.capacity(), DEFAULT_CHUNK_CAPACITY);
        assert_eq!(arena.used(), align_up(3 + HEADER));
    }

    #[test]
    fn with_capacity_allocates_first_chunk_up_front() {
        let arena = Arena::with_capacity(64);
        assert_eq!(arena.capacity(), 64);
        arena.alloc(8);
        assert_eq!(arena.capacity(), 64);
        assert_eq!(arena.retired_chunks(), 0);
    }

    #[test]
    fn payloads_are_aligned_and_disjoint() {
        let arena = small(256);
        let a = arena.alloc(1).as_ptr() as usize;
        let b = arena.alloc(13).as_ptr() as usize;
        let c = arena.alloc(2).as_ptr() as usize;
        assert_eq!(a % mem::align_of::<usize>(), 0);
        assert_eq!(b % mem::align_of::<usize>(), 0);
        assert!(b >= a + 1 + HEADER);
        assert!(c >= b + 13 + HEADER);
    }

    #[test]
    fn header_records_requested_size() {
        let arena = small(128);
        let p = unsafe { arena.realloc(None, 0, 11) }.unwrap();
        assert_eq!(unsafe { recorded_size(p) }, 11);
    }

    #[test]
    fn overflow_retires_chunk_and_keeps_old_regions_valid() {
        let arena = small(32);
        let first = arena.alloc_copy(b"first region");
        let second = arena.alloc_copy(b"second region, longer than the rest");
        assert_eq!(arena.retired_chunks(), 1);
        assert_eq!(first, b"first region");
        assert_eq!(second, b"second region, longer than the rest");
    }

    #[test]
    fn oversized_request_gets_a_chunk_of_its_own_size() {
        let arena = small(16);
        arena.alloc(100);
        assert_eq!(arena.capacity(), align_up(100 + HEADER));
    }

    #[test]
    fn realloc_copies_the_recorded_prefix() {
        let arena = small(64);
        unsafe {
            let p = arena.realloc(None, 0, 5).unwrap();
            p.as_ptr().copy_from_nonoverlapping(b"hello".as_ptr(), 5);

            let grown = arena.realloc(Some(p), 0, 40).unwrap();
            assert_ne!(grown, p);
            assert_eq!(slice::from_raw_parts(grown.as_ptr(), 5), b"hello");
            assert_eq!(recorded_size(grown), 40);

            let shrunk = arena.realloc(Some(grown), 40, 2).unwrap();
            assert_eq!(slice::from_raw_parts(shrunk.as_ptr(), 2), b"he");
        }
    }

    #[test]
    fn realloc_free_returns_none() {
        let arena = small(64);
        unsafe {
            assert!(arena.realloc(None, 0, 0).is_none());
            let p = arena.realloc(None, 0, 4).unwrap();
            let used = arena.used();
            assert!(arena.realloc(Some(p), 4, 0).is_none());
            assert_eq!(arena.used(), used);
        }
    }

    #[cfg(feature = "debug")]
    #[test]
    fn freed_regions_are_poisoned() {
        let arena = small(64);
        unsafe {
            let p = arena.realloc(None, 0, 4).unwrap();
            p.as_ptr().write_bytes(b'x', 4);
            arena.realloc(Some(p), 4, 0);
            assert_eq!(slice::from_raw_parts(p.as_ptr(), 4), &[POISON; 4]);
        }
    }

    #[test]
    fn destroy_frees_the_chain_and_allows_reuse() {
        let mut arena = small(32);
        for _ in 0..3 {
            arena.alloc(20);
        }
        assert_eq!(arena.retired_chunks(), 2);
        assert_eq!(arena.reserved_bytes(), 96);

        arena.destroy();
        assert_eq!(arena.retired_chunks(), 0);
        assert_eq!(arena.capacity(), 0);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.reserved_bytes(), 0);

        arena.destroy();
        assert_eq!(arena.capacity(), 0);

        assert_eq!(arena.alloc_copy(b"again"), b"again");
        assert_eq!(arena.capacity(), 32);
        assert_eq!(arena.retired_chunks(), 0);
    }

    #[test]
    fn empty_requests_do_not_touch_the_arena() {
        let arena = Arena::new();
        assert!(arena.alloc(0).is_empty());
        assert!(arena.alloc_copy(b"").is_empty());
        assert_eq!(arena.capacity(), 0);
    }
}
