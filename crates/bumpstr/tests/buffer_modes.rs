#![expect(missing_docs)]

use bumpstr::{Arena, ArenaOptions, Buffer, Error, StorageMode, View};
use rstest::rstest;

#[rstest]
#[case(0, StorageMode::Owned)]
#[case(3, StorageMode::Owned)]
#[case(4, StorageMode::Fixed)]
#[case(64, StorageMode::Fixed)]
fn fixed_storage_is_kept_while_it_fits(#[case] size: usize, #[case] expected: StorageMode) {
    let mut storage = vec![0u8; size];
    let mut buffer = Buffer::from_fixed(&mut storage);
    buffer.append(View::from("abc"));
    assert_eq!(buffer.mode(), expected);
    assert_eq!(buffer, "abc");
    assert_eq!(buffer.as_bytes_with_nul(), b"abc\0");
}

#[rstest]
#[case("abc", "b", "def", Some("adefc"))]
#[case("abc", "abc", "", Some(""))]
#[case("abc", "x", "yyyyyyyyyyyy", None)]
#[case("abc", "", "x", None)]
#[case("aaa", "a", "b", Some("baa"))]
fn replace_in_every_allocator(
    #[case] initial: &str,
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected: Option<&str>,
) {
    let arena = Arena::with_options(ArenaOptions { chunk_capacity: 32 });
    let mut on_heap = Buffer::with_capacity(4);
    let mut in_arena = Buffer::with_capacity_in(4, &arena);
    on_heap.append(initial.into());
    in_arena.append(initial.into());
    assert_eq!(on_heap.replace(from.into(), to.into()), expected.is_some());
    assert_eq!(in_arena.replace(from.into(), to.into()), expected.is_some());

    let expected = expected.unwrap_or(initial);
    assert_eq!(on_heap, expected);
    assert_eq!(in_arena, expected);
}

#[rstest]
#[case(0, 0, "XY", "XYabcdef")]
#[case(6, 6, "XY", "abcdefXY")]
#[case(-3, -1, "", "abcf")]
#[case(1, -1, "-", "a-f")]
#[case(0, 6, "", "")]
fn splice_cases(#[case] start: i32, #[case] end: i32, #[case] with: &str, #[case] expected: &str) {
    let mut buffer = Buffer::new();
    buffer.append("abcdef".into());
    buffer.splice(start, end, with.into());
    assert_eq!(buffer, expected);

    let mut storage = [0u8; 16];
    let mut fixed = Buffer::from_fixed(&mut storage);
    fixed.try_append("abcdef".into()).unwrap();
    fixed.try_splice(start, end, with.into()).unwrap();
    assert_eq!(fixed, expected);
}

#[test]
fn capacity_errors_carry_sizes_and_codes() {
    let mut storage = [0u8; 4];
    let mut buffer = Buffer::from_fixed(&mut storage);
    let err = buffer.try_append("hello".into()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "insufficient capacity: 6 bytes required, 4 available"
    );
    assert_eq!(err.code(), -105);
    assert!(matches!(err, Error::InsufficientCapacity { .. }));
    assert!(buffer.is_empty());
}

#[test]
fn arena_buffers_outlive_overflowing_chunks() {
    let arena = Arena::with_options(ArenaOptions { chunk_capacity: 16 });
    let keep = arena.alloc_copy(b"pinned");
    let mut buffer = Buffer::new_in(&arena);
    for i in 0..100 {
        buffer.print(format_args!("{i},"));
    }
    assert!(arena.retired_chunks() > 1);
    assert_eq!(keep, b"pinned");
    assert!(buffer.as_view().starts_with("0,1,2,".into()));
    assert!(buffer.as_view().ends_with("98,99,".into()));
    assert_eq!(buffer.as_view().count_byte(b','), 100);
}

#[test]
fn duplicated_views_are_independent() {
    let arena = Arena::new();
    let mut source = Buffer::new();
    source.append("Mixed Case".into());

    let mut shouted = source.as_view().dup_in(&arena);
    shouted.make_ascii_uppercase();
    let mut copy = source.as_view().dup();
    copy.as_view_mut().translate(b' ', b'_');

    assert_eq!(source, "Mixed Case");
    assert_eq!(shouted.as_view(), "MIXED CASE");
    assert_eq!(copy, "Mixed_Case");
}
