// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for executable image validation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{Image, ImageError, Segment};
use skua_abi::{PAGE_SIZE, Vaddr};

const ENTRY: u64 = 0x0080_0000;

fn header(entry: u64, record_count: u16) -> Vec<u8> {
    let mut bytes = vec![0u8; 64];
    bytes[0..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
    bytes[4] = 2; // 64-bit
    bytes[5] = 1; // little-endian
    bytes[6] = 1; // version
    bytes[16..18].copy_from_slice(&2u16.to_le_bytes()); // executable
    bytes[24..32].copy_from_slice(&entry.to_le_bytes());
    bytes[32..40].copy_from_slice(&64u64.to_le_bytes()); // table follows header
    bytes[54..56].copy_from_slice(&56u16.to_le_bytes());
    bytes[56..58].copy_from_slice(&record_count.to_le_bytes());
    bytes
}

fn push_record(
    image: &mut Vec<u8>,
    kind: u32,
    flags: u32,
    offset: u64,
    vaddr: u64,
    file_size: u64,
    mem_size: u64,
) {
    let mut record = vec![0u8; 56];
    record[0..4].copy_from_slice(&kind.to_le_bytes());
    record[4..8].copy_from_slice(&flags.to_le_bytes());
    record[8..16].copy_from_slice(&offset.to_le_bytes());
    record[16..24].copy_from_slice(&vaddr.to_le_bytes());
    record[32..40].copy_from_slice(&file_size.to_le_bytes());
    record[40..48].copy_from_slice(&mem_size.to_le_bytes());
    image.extend_from_slice(&record);
}

#[test]
fn accepts_a_minimal_executable() {
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 5, 0x1000, ENTRY, 0x200, 0x200);

    let image = Image::parse(&bytes).unwrap();
    assert_eq!(image.entry_point(), Vaddr::new(ENTRY));
    let segments: Vec<Segment> = image.segments().collect();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].offset, 0x1000);
    assert_eq!(segments[0].vaddr, Vaddr::new(ENTRY));
    assert_eq!(segments[0].file_size, 0x200);
    assert!(!segments[0].writable);
}

#[test]
fn non_loadable_records_are_skipped() {
    let mut bytes = header(ENTRY, 3);
    push_record(&mut bytes, 4, 4, 0, 0, 16, 16); // note record
    push_record(&mut bytes, 1, 6, 0x1000, ENTRY, 0x100, 0x800);
    push_record(&mut bytes, 2, 6, 0, 0, 16, 16); // dynamic record

    let image = Image::parse(&bytes).unwrap();
    let segments: Vec<Segment> = image.segments().collect();
    assert_eq!(segments.len(), 1);
    assert!(segments[0].writable);
    assert_eq!(segments[0].mem_size, 0x800);
}

#[test]
fn rejects_truncated_prefix() {
    assert_eq!(Image::parse(&[]), Err(ImageError::TooShort));
    assert_eq!(Image::parse(&[0x7F, b'E', b'L']), Err(ImageError::TooShort));
}

#[test]
fn rejects_wrong_magic() {
    let mut bytes = header(ENTRY, 0);
    bytes[0] = 0x7E;
    assert_eq!(Image::parse(&bytes), Err(ImageError::BadMagic));
}

#[test]
fn rejects_wrong_class_and_endianness() {
    let mut bytes = header(ENTRY, 0);
    bytes[4] = 1; // 32-bit
    assert_eq!(Image::parse(&bytes), Err(ImageError::NotClass64));

    let mut bytes = header(ENTRY, 0);
    bytes[5] = 2; // big-endian
    assert_eq!(Image::parse(&bytes), Err(ImageError::NotLittleEndian));
}

#[test]
fn rejects_non_executables() {
    let mut bytes = header(ENTRY, 0);
    bytes[16..18].copy_from_slice(&3u16.to_le_bytes()); // shared object
    assert_eq!(Image::parse(&bytes), Err(ImageError::NotExecutable));
}

#[test]
fn rejects_header_table_outside_the_prefix() {
    let mut bytes = header(ENTRY, 9);
    push_record(&mut bytes, 1, 5, 0x1000, ENTRY, 0x100, 0x100);
    // Claims 9 records but only carries 1.
    assert_eq!(Image::parse(&bytes), Err(ImageError::HeadersOutsidePrefix));
}

#[test]
fn rejects_undersized_header_records() {
    let mut bytes = header(ENTRY, 1);
    bytes[54..56].copy_from_slice(&40u16.to_le_bytes());
    push_record(&mut bytes, 1, 5, 0x1000, ENTRY, 0x100, 0x100);
    assert_eq!(Image::parse(&bytes), Err(ImageError::MalformedHeader));
}

#[test]
fn rejects_segments_larger_on_disk_than_in_memory() {
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 5, 0x1000, ENTRY, 0x800, 0x200);
    assert_eq!(Image::parse(&bytes), Err(ImageError::SegmentSizes));
}

#[test]
fn rejects_incongruent_offset_and_address() {
    // Offset sits 0x10 into its page, address is page-aligned.
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 5, 0x1010, ENTRY, 0x100, 0x100);
    assert_eq!(Image::parse(&bytes), Err(ImageError::MisalignedSegment));

    // Same offset within the page on both sides is fine.
    let mut bytes = header(ENTRY + 0x10, 1);
    push_record(&mut bytes, 1, 5, 0x1010, ENTRY + 0x10, 0x100, 0x100);
    assert!(Image::parse(&bytes).is_ok());
}

#[test]
fn rejects_segments_that_wrap_the_address_space() {
    // The file extent wraps: offset plus memory size overflows u64.
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 6, 0xFFFF_FFFF_FFFF_F000, ENTRY, 0, 0x2000);
    assert_eq!(Image::parse(&bytes), Err(ImageError::SegmentBounds));

    // The memory extent wraps: address plus memory size overflows u64.
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 6, 0x1000, 0xFFFF_FFFF_FFFF_F000, 0, 0x2000);
    assert_eq!(Image::parse(&bytes), Err(ImageError::SegmentBounds));

    // The sum itself fits but rounding it up to a page boundary would not.
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 6, 0xFFFF_FFFF_FFFF_F000, ENTRY, 0, 0xFFF);
    assert_eq!(Image::parse(&bytes), Err(ImageError::SegmentBounds));
}

#[test]
fn congruence_is_checked_within_the_page_not_for_equality() {
    let offset = 3 * PAGE_SIZE + 0x40;
    let vaddr = ENTRY + 7 * PAGE_SIZE + 0x40;
    let mut bytes = header(ENTRY, 1);
    push_record(&mut bytes, 1, 5, offset, vaddr, 0x100, 0x100);
    assert!(Image::parse(&bytes).is_ok());
}
