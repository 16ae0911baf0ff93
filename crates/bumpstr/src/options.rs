/// Default size in bytes of every chunk an [`Arena`](crate::Arena) allocates
/// on its own, i.e. the first chunk of a lazily initialised arena and every
/// overflow chunk.
pub const DEFAULT_CHUNK_CAPACITY: usize = 1 << 20;

/// Configuration for an [`Arena`](crate::Arena).
///
/// # Examples
///
/// ```rust
/// use bumpstr::{Arena, ArenaOptions};
///
/// let arena = Arena::with_options(ArenaOptions {
///     chunk_capacity: 4096,
/// });
/// assert_eq!(arena.options().chunk_capacity, 4096);
/// ```
///
/// # Default
///
/// `chunk_capacity` defaults to [`DEFAULT_CHUNK_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArenaOptions {
    /// Capacity of each chunk the arena allocates when it runs out of room.
    ///
    /// A single request larger than this gets a chunk of exactly the size it
    /// needs instead.
    ///
    /// # Default
    ///
    /// `1 << 20`
    pub chunk_capacity: usize,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}
