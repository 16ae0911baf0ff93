use thiserror::Error;

/// `ENOBUFS`, the code fixed-capacity failures map to.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
))]
const ENOBUFS: i32 = 55;
#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
)))]
const ENOBUFS: i32 = 105;
#[cfg(feature = "std")]
const EIO: i32 = 5;

/// Recoverable failures of [`Buffer`](crate::Buffer) operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A fixed-capacity operation needed more room than the buffer has. The
    /// buffer contents are left as they were before the call.
    #[error("insufficient capacity: {required} bytes required, {capacity} available")]
    InsufficientCapacity {
        /// Capacity the operation needed, terminator included.
        required: usize,
        /// Capacity the buffer has.
        capacity: usize,
    },
    /// The byte source failed while opening, sizing or reading.
    #[cfg(feature = "std")]
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Negative errno-style code for callers that report failures as integers.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Error::InsufficientCapacity { .. } => -ENOBUFS,
            #[cfg(feature = "std")]
            Error::Io(err) => -err.raw_os_error().unwrap_or(EIO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_message_and_code() {
        let err = Error::InsufficientCapacity {
            required: 7,
            capacity: 4,
        };
        assert_eq!(
            std::format!("{err}"),
            "insufficient capacity: 7 bytes required, 4 available"
        );
        assert_eq!(err.code(), -ENOBUFS);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn capacity_code_is_linux_enobufs() {
        let err = Error::InsufficientCapacity {
            required: 1,
            capacity: 0,
        };
        assert_eq!(err.code(), -105);
    }

    #[test]
    #[cfg(target_os = "macos")]
    fn capacity_code_is_bsd_enobufs() {
        let err = Error::InsufficientCapacity {
            required: 1,
            capacity: 0,
        };
        assert_eq!(err.code(), -55);
    }

    #[cfg(feature = "std")]
    #[test]
    fn io_error_code_uses_os_error() {
        let err = Error::from(std::io::Error::from_raw_os_error(2));
        assert_eq!(err.code(), -2);

        let err = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(err.code(), -5);
    }
}
