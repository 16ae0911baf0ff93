#![allow(missing_docs, dead_code)]

use std::{fs, path::PathBuf, process};

use bumpstr::{Buffer, Realloc, View};

pub const ANIMALS: [&str; 11] = [
    "dog", "fish", "cat", "monkey", "horse", "duck", "goose", "cow", "pig", "sheep", "donkey",
];

pub const README: &str = "# bumpstr\n\nViews, buffers and arenas.\n\nAll bytes, no surprises.\n";

/// Append `items` to `out`, separated by `sep`.
pub fn join_into<A: Realloc>(out: &mut Buffer<'_, A>, items: &[View<'_>], sep: &str) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.append(sep.into());
        }
        out.append(*item);
    }
}

/// A file in the temp directory holding `contents`, removed on drop.
pub struct TempFile(pub PathBuf);

impl TempFile {
    pub fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("bumpstr-it-{}-{name}", process::id()));
        fs::write(&path, contents).unwrap();
        Self(path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}
