//! Filling buffers from byte sources.

use std::{
    fs::File,
    io::{BufRead, ErrorKind, Read},
    path::Path,
};

use crate::{
    alloc_hook::Realloc,
    buffer::Buffer,
    error::Error,
    view::{MAX_LEN, View},
};

/// Capacity given to a buffer with no storage before its first line.
const INITIAL_LINE_CAPACITY: usize = 128;

impl<A: Realloc> Buffer<'_, A> {
    /// Replace the contents with the next line of `src`, growing as needed.
    ///
    /// The newline is consumed but not stored. A final line without a
    /// newline is kept as is. Returns the number of bytes consumed from
    /// `src`; `0` means the source was already exhausted, and the buffer is
    /// left empty.
    ///
    /// ```rust
    /// use bumpstr::Buffer;
    ///
    /// let mut src = &b"first\nsecond"[..];
    /// let mut line = Buffer::new();
    /// assert_eq!(line.read_line(&mut src)?, 6);
    /// assert_eq!(line, "first");
    /// assert_eq!(line.read_line(&mut src)?, 6);
    /// assert_eq!(line, "second");
    /// assert_eq!(line.read_line(&mut src)?, 0);
    /// assert!(line.is_empty());
    /// # Ok::<(), bumpstr::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if `src` fails. Interrupted reads are retried.
    pub fn read_line<R: BufRead>(&mut self, mut src: R) -> Result<usize, Error> {
        self.clear();
        if self.capacity() == 0 {
            self.reserve(INITIAL_LINE_CAPACITY);
        }
        self.pull_line(&mut src, true)
    }

    /// [`Buffer::read_line`] without growing.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientCapacity`] if the line does not fit. The part of
    /// the line that fits stays in the buffer and is consumed from `src`;
    /// `required` is a lower bound, since the rest of the line has not been
    /// read. [`Error::Io`] if `src` fails.
    pub fn try_read_line<R: BufRead>(&mut self, mut src: R) -> Result<usize, Error> {
        self.clear();
        self.pull_line(&mut src, false)
    }

    /// Replace the contents with exactly `size` bytes read from `src`,
    /// growing as needed.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if `src` fails or ends early; the buffer is left empty.
    ///
    /// # Panics
    ///
    /// Panics if `size` exceeds [`MAX_LEN`].
    pub fn read_exact_from<R: Read>(&mut self, mut src: R, size: usize) -> Result<usize, Error> {
        assert!(
            size <= MAX_LEN,
            "source of {size} bytes exceeds the 31-bit length limit"
        );
        self.clear();
        self.reserve(size + 1);
        self.fill_exact(&mut src, size)
    }

    /// Replace the contents with the whole file at `path`, sized up front.
    /// Returns the file's length.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be opened, sized or read, or with
    /// [`ErrorKind::InvalidData`] if it is longer than [`MAX_LEN`].
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<usize, Error> {
        let mut file = File::open(path)?;
        let size = file_len(&file)?;
        self.read_exact_from(&mut file, size)
    }

    /// [`Buffer::read_file`] without growing.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientCapacity`] if the file does not fit, checked
    /// before anything is read; the buffer is left unchanged. [`Error::Io`]
    /// as for [`Buffer::read_file`].
    pub fn try_read_file(&mut self, path: impl AsRef<Path>) -> Result<usize, Error> {
        let mut file = File::open(path)?;
        let size = file_len(&file)?;
        if size >= self.capacity() {
            return Err(Error::InsufficientCapacity {
                required: size.saturating_add(1),
                capacity: self.capacity(),
            });
        }
        self.clear();
        self.fill_exact(&mut file, size)
    }

    /// [`Buffer::read_file`] for programs with nothing better to do on
    /// failure than report it and stop: the error is logged, printed to
    /// stderr as `path: error`, and the process exits with status 1.
    pub fn read_file_or_exit(&mut self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        match self.read_file(path) {
            Ok(size) => size,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to read file");
                std::eprintln!("{}: {err}", path.display());
                std::process::exit(1);
            }
        }
    }

    fn pull_line<R: BufRead + ?Sized>(&mut self, src: &mut R, grow: bool) -> Result<usize, Error> {
        let mut consumed = 0;
        loop {
            let (used, done, overflow) = {
                let available = match src.fill_buf() {
                    Ok(available) => available,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err.into()),
                };
                if available.is_empty() {
                    return Ok(consumed);
                }
                let end = View::new(available).find_byte(b'\n');
                let line = &available[..end];
                let done = end < available.len();
                let fits = if grow {
                    self.append(View::new(line));
                    line.len()
                } else {
                    let fits = line.len().min(self.room());
                    self.push_within(&line[..fits]);
                    fits
                };
                if fits < line.len() {
                    (fits, false, line.len() - fits)
                } else {
                    (end + usize::from(done), done, 0)
                }
            };
            src.consume(used);
            consumed += used;
            if overflow > 0 {
                return Err(Error::InsufficientCapacity {
                    required: self.len() + overflow + 1,
                    capacity: self.capacity(),
                });
            }
            if done {
                return Ok(consumed);
            }
        }
    }

    /// Read exactly `size` bytes into storage that already has room for
    /// them and the terminator.
    fn fill_exact<R: Read + ?Sized>(&mut self, src: &mut R, size: usize) -> Result<usize, Error> {
        match src.read_exact(&mut self.spare_mut()[..size]) {
            Ok(()) => {
                self.set_len(size);
                Ok(size)
            }
            Err(err) => {
                self.set_len(0);
                Err(err.into())
            }
        }
    }
}

fn file_len(file: &File) -> Result<usize, Error> {
    let len = file.metadata()?.len();
    match usize::try_from(len) {
        Ok(len) if len <= MAX_LEN => Ok(len),
        _ => Err(std::io::Error::new(
            ErrorKind::InvalidData,
            std::format!("file of {len} bytes exceeds the 31-bit length limit"),
        )
        .into()),
    }
}
