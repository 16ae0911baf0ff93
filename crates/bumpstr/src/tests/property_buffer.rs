use alloc::vec::Vec;
use core::fmt::Write as _;

use quickcheck::QuickCheck;

use super::arbitrary::{Narrow, Op};
use crate::{Arena, ArenaOptions, Buffer, Error, Realloc, StorageMode, View};

fn tests() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

/// Resolve splice endpoints against the model's current length.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn endpoints(len: usize, a: usize, b: usize) -> (i32, i32) {
    let (a, b) = (a % (len + 1), b % (len + 1));
    (a.min(b) as i32, a.max(b) as i32)
}

fn replace_in_model(model: &mut Vec<u8>, from: &[u8], to: &[u8]) -> bool {
    if from.is_empty() {
        return false;
    }
    let Some(at) = model.windows(from.len()).position(|w| w == from) else {
        return false;
    };
    model.splice(at..at + from.len(), to.iter().copied());
    true
}

/// Apply `op` to both sides with the growing operations.
#[allow(clippy::cast_sign_loss)]
fn apply<A: Realloc>(buffer: &mut Buffer<'_, A>, model: &mut Vec<u8>, op: &Op) -> bool {
    match op {
        Op::Append(bytes) => {
            buffer.append(View::from(&bytes.0[..]));
            model.extend_from_slice(&bytes.0);
        }
        Op::Print(n) => {
            buffer.print(format_args!("<{n:x}>"));
            model.extend_from_slice(std::format!("<{n:x}>").as_bytes());
        }
        Op::Replace(from, to) => {
            let found = buffer.replace(View::from(&from.0[..]), View::from(&to.0[..]));
            if found != replace_in_model(model, &from.0, &to.0) {
                return false;
            }
        }
        Op::Splice(a, b, with) => {
            let (start, end) = endpoints(model.len(), *a, *b);
            buffer.splice(start, end, View::from(&with.0[..]));
            model.splice(start as usize..end as usize, with.0.iter().copied());
        }
        Op::Truncate(n) => {
            let n = n % (model.len() + 1);
            buffer.truncate(n);
            model.truncate(n);
        }
        Op::Clear => {
            buffer.clear();
            model.clear();
        }
    }
    true
}

fn terminated<A: Realloc>(buffer: &Buffer<'_, A>) -> bool {
    buffer.assert_invariants();
    buffer.as_bytes_with_nul().last() == Some(&0)
}

/// Property: a heap buffer, a buffer that starts on a small fixed array,
/// and an arena buffer all track a `Vec<u8>` model through any sequence of
/// growing edits, and stay terminated throughout.
#[test]
fn growing_operations_match_model_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(ops: Vec<Op>) -> bool {
        let arena = Arena::with_options(ArenaOptions {
            chunk_capacity: 256,
        });
        let mut storage = [0u8; 8];
        let mut heap = Buffer::new();
        let mut fixed = Buffer::from_fixed(&mut storage);
        let mut bump = Buffer::new_in(&arena);
        let (mut m1, mut m2, mut m3) = (Vec::new(), Vec::new(), Vec::new());

        for op in &ops {
            if !(apply(&mut heap, &mut m1, op)
                && apply(&mut fixed, &mut m2, op)
                && apply(&mut bump, &mut m3, op))
            {
                return false;
            }
            if heap != &m1[..] || fixed != &m2[..] || bump != &m3[..] {
                return false;
            }
            if !(terminated(&heap) && terminated(&fixed) && terminated(&bump)) {
                return false;
            }
        }
        true
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Vec<Op>) -> bool);
}

/// Property: a fixed-capacity edit either succeeds and matches the model, or
/// fails with `InsufficientCapacity` and leaves the buffer untouched. The
/// buffer never leaves its fixed storage.
#[test]
fn fixed_operations_never_truncate_quickcheck() {
    #[allow(clippy::needless_pass_by_value, clippy::cast_sign_loss)]
    fn prop(ops: Vec<Op>) -> bool {
        let mut storage = [0u8; 16];
        let mut buffer = Buffer::from_fixed(&mut storage);
        let mut model: Vec<u8> = Vec::new();

        for op in &ops {
            let mut candidate = model.clone();
            let result = match op {
                Op::Append(bytes) => {
                    candidate.extend_from_slice(&bytes.0);
                    buffer.try_append(View::from(&bytes.0[..]))
                }
                Op::Print(n) => {
                    candidate.extend_from_slice(std::format!("<{n:x}>").as_bytes());
                    buffer.try_print(format_args!("<{n:x}>"))
                }
                Op::Replace(from, to) => {
                    let found = replace_in_model(&mut candidate, &from.0, &to.0);
                    match buffer.try_replace(View::from(&from.0[..]), View::from(&to.0[..])) {
                        Ok(replaced) if replaced != found => return false,
                        other => other.map(|_| ()),
                    }
                }
                Op::Splice(a, b, with) => {
                    let (start, end) = endpoints(model.len(), *a, *b);
                    candidate.splice(start as usize..end as usize, with.0.iter().copied());
                    buffer.try_splice(start, end, View::from(&with.0[..]))
                }
                Op::Truncate(n) => {
                    let n = n % (model.len() + 1);
                    candidate.truncate(n);
                    buffer.truncate(n);
                    Ok(())
                }
                Op::Clear => {
                    candidate.clear();
                    buffer.clear();
                    Ok(())
                }
            };
            match result {
                Ok(()) => model = candidate,
                Err(Error::InsufficientCapacity { required, capacity }) => {
                    if capacity != 16 || required <= capacity || required != candidate.len() + 1 {
                        return false;
                    }
                }
                Err(_) => return false,
            }
            if buffer != &model[..] || buffer.mode() != StorageMode::Fixed || !terminated(&buffer) {
                return false;
            }
        }
        true
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Vec<Op>) -> bool);
}

/// Property: appending `a` then `b` is the same as appending `a ++ b`, and
/// `write!` agrees with `append`.
#[test]
fn append_is_associative_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(a: Narrow, b: Narrow) -> bool {
        let mut split = Buffer::new();
        split.append(View::from(&a.0[..]));
        split.append(View::from(&b.0[..]));

        let joined: Vec<u8> = a.0.iter().chain(&b.0).copied().collect();
        let mut whole = Buffer::new();
        whole.append(View::from(&joined[..]));

        let text = |n: &Narrow| n.0.iter().map(|&c| char::from(c)).collect::<alloc::string::String>();
        let mut written = Buffer::new();
        write!(written, "{}{}", text(&a), text(&b)).unwrap();

        split == whole && whole == written && split.len() == joined.len()
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Narrow, Narrow) -> bool);
}

/// Property: splicing an empty range with nothing changes nothing, and
/// splicing the whole range replaces everything.
#[test]
fn splice_extremes_quickcheck() {
    #[allow(clippy::needless_pass_by_value, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn prop(s: Narrow, y: Narrow, k: usize) -> bool {
        let mut buffer = Buffer::new();
        buffer.append(View::from(&s.0[..]));
        let k = (k % (s.0.len() + 1)) as i32;
        buffer.splice(k, k, View::from(""));
        if buffer != &s.0[..] {
            return false;
        }
        buffer.splice(0, s.0.len() as i32, View::from(&y.0[..]));
        buffer == &y.0[..]
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Narrow, Narrow, usize) -> bool);
}
