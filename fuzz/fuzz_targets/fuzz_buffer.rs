#![no_main]

use arbitrary::Arbitrary;
use bumpstr::{Arena, ArenaOptions, Buffer, Error, Realloc, View};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Append(Vec<u8>),
    TryAppend(Vec<u8>),
    Print(i64),
    Replace(Vec<u8>, Vec<u8>),
    TryReplace(Vec<u8>, Vec<u8>),
    Splice(u16, u16, Vec<u8>),
    TrySplice(u16, u16, Vec<u8>),
    Reserve(u16),
    Truncate(u16),
    Clear,
    Destroy,
}

#[derive(Debug, Arbitrary)]
struct Input {
    /// 0: heap, 1: arena, otherwise fixed storage of `fixed_len` bytes.
    backend: u8,
    fixed_len: u8,
    chunk_capacity: u16,
    ops: Vec<Op>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Map two arbitrary endpoints onto a valid `[start, end)` of `len`, using
/// the negative form for odd values.
fn range(len: usize, a: u16, b: u16) -> (usize, usize, i32, i32) {
    let (a, b) = (usize::from(a) % (len + 1), usize::from(b) % (len + 1));
    let (start, end) = (a.min(b), a.max(b));
    let encode = |i: usize, negative: bool| {
        let i = i as i32;
        if negative && i < len as i32 { i - len as i32 } else { i }
    };
    (start, end, encode(start, a % 2 == 1), encode(end, b % 2 == 1))
}

fn run<A: Realloc>(mut buffer: Buffer<'_, A>, ops: &[Op]) {
    let mut model: Vec<u8> = Vec::new();
    for op in ops {
        let mut candidate = model.clone();
        let outcome: Result<(), Error> = match op {
            Op::Append(bytes) => {
                buffer.append(View::from(&bytes[..]));
                candidate.extend_from_slice(bytes);
                Ok(())
            }
            Op::TryAppend(bytes) => {
                candidate.extend_from_slice(bytes);
                buffer.try_append(View::from(&bytes[..]))
            }
            Op::Print(n) => {
                buffer.print(format_args!("{n}"));
                candidate.extend_from_slice(n.to_string().as_bytes());
                Ok(())
            }
            Op::Replace(from, to) => {
                let found = find(&candidate, from);
                if let Some(at) = found {
                    candidate.splice(at..at + from.len(), to.iter().copied());
                }
                assert_eq!(
                    buffer.replace(View::from(&from[..]), View::from(&to[..])),
                    found.is_some()
                );
                Ok(())
            }
            Op::TryReplace(from, to) => {
                let found = find(&candidate, from);
                if let Some(at) = found {
                    candidate.splice(at..at + from.len(), to.iter().copied());
                }
                buffer
                    .try_replace(View::from(&from[..]), View::from(&to[..]))
                    .map(|replaced| assert_eq!(replaced, found.is_some()))
            }
            Op::Splice(a, b, with) => {
                let (start, end, s, e) = range(candidate.len(), *a, *b);
                candidate.splice(start..end, with.iter().copied());
                buffer.splice(s, e, View::from(&with[..]));
                Ok(())
            }
            Op::TrySplice(a, b, with) => {
                let (start, end, s, e) = range(candidate.len(), *a, *b);
                candidate.splice(start..end, with.iter().copied());
                buffer.try_splice(s, e, View::from(&with[..]))
            }
            Op::Reserve(cap) => {
                buffer.reserve(usize::from(*cap));
                assert!(buffer.capacity() >= usize::from(*cap));
                Ok(())
            }
            Op::Truncate(n) => {
                let n = usize::from(*n);
                candidate.truncate(n);
                buffer.truncate(n);
                Ok(())
            }
            Op::Clear => {
                candidate.clear();
                buffer.clear();
                Ok(())
            }
            Op::Destroy => {
                candidate.clear();
                buffer.destroy();
                Ok(())
            }
        };
        match outcome {
            Ok(()) => model = candidate,
            Err(Error::InsufficientCapacity { required, capacity }) => {
                assert_eq!(required, candidate.len() + 1);
                assert!(required > capacity);
            }
            Err(err) => panic!("unexpected error: {err}"),
        }
        buffer.assert_invariants();
        assert_eq!(buffer.as_bytes(), &model[..]);
    }
}

fuzz_target!(|input: Input| {
    match input.backend {
        0 => run(Buffer::new(), &input.ops),
        1 => {
            let arena = Arena::with_options(ArenaOptions {
                chunk_capacity: usize::from(input.chunk_capacity).max(1),
            });
            run(Buffer::new_in(&arena), &input.ops);
        }
        _ => {
            let mut storage = vec![0u8; usize::from(input.fixed_len)];
            run(Buffer::from_fixed(&mut storage), &input.ops);
        }
    }
});
