//! Byte string views, a fixed-or-growable string buffer, and a chained bump
//! arena.
//!
//! - [`View`] borrows a byte range and never allocates.
//! - [`Buffer`] accumulates bytes into either a caller-supplied fixed array or
//!   storage obtained through a [`Realloc`] hook, switching from the former to
//!   the latter the first time the fixed array is too small.
//! - [`Arena`] hands out stable regions from a chain of chunks and releases
//!   them all at once.
//!
//! ```rust
//! use bumpstr::{Arena, Buffer, View};
//!
//! let arena = Arena::new();
//! let mut greeting = Buffer::new_in(&arena);
//! greeting.append("Hello, ".into());
//! greeting.print(format_args!("{}!", View::from("Paul")));
//! assert_eq!(greeting.as_view(), "Hello, Paul!");
//! ```

#![no_std]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

/// Trace arena and buffer growth; compiled out unless the `debug` feature is
/// enabled.
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug")]
        ::tracing::trace!($($arg)*);
    };
}

mod alloc_hook;
mod arena;
mod buffer;
mod error;
#[cfg(feature = "std")]
mod io;
mod numbers;
mod options;
mod view;

#[cfg(test)]
mod tests;

pub use alloc_hook::{Heap, Realloc};
pub use arena::Arena;
pub use buffer::{Buffer, StorageMode};
pub use error::Error;
pub use numbers::{ParseIntError, parse_int};
pub use options::{ArenaOptions, DEFAULT_CHUNK_CAPACITY};
pub use view::{MAX_LEN, Tokens, View, ViewMut};
