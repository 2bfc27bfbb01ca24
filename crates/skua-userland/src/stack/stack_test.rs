// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for initial stack construction.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{StackError, StackLayout, push_args};
use crate::platform::Kernel;
use crate::platform::mock::MockOs;
use proptest::prelude::*;
use skua_abi::layout::stack_page_base;
use skua_abi::{DomainId, PAGE_SIZE, SCRATCH_BASE, Vaddr};

fn word_at(os: &MockOs, domain: DomainId, addr: Vaddr) -> u64 {
    let bytes = os.read_memory(domain, addr, 8).unwrap();
    u64::from_le_bytes(bytes.try_into().unwrap())
}

fn string_at(os: &MockOs, domain: DomainId, addr: Vaddr, len: usize) -> Vec<u8> {
    os.read_memory(domain, addr, len).unwrap()
}

#[test]
fn arguments_are_laid_out_for_the_child() {
    let os = MockOs::new();
    let root = os.root();
    let (child, _) = root.create_domain().unwrap();

    let sp = push_args(&root, child, &["init", "-v"]).unwrap();

    // sp addresses the argc word, the word above holds the argv pointer.
    assert_eq!(word_at(&os, child, sp), 2);
    let argv_addr = Vaddr::new(word_at(&os, child, sp + 8));
    assert!(argv_addr > sp);

    // The pointer array holds two child-valid string addresses and a null
    // terminator.
    let argv0 = Vaddr::new(word_at(&os, child, argv_addr));
    let argv1 = Vaddr::new(word_at(&os, child, argv_addr + 8));
    assert_eq!(word_at(&os, child, argv_addr + 16), 0);

    assert_eq!(string_at(&os, child, argv0, 5), b"init\0");
    assert_eq!(string_at(&os, child, argv1, 3), b"-v\0");
}

#[test]
fn pointers_are_child_addresses_not_staging_addresses() {
    let os = MockOs::new();
    let root = os.root();
    let (child, _) = root.create_domain().unwrap();

    let sp = push_args(&root, child, &["a"]).unwrap();

    let stack_base = stack_page_base();
    let stack_end = stack_base + PAGE_SIZE;
    assert!(sp >= stack_base && sp < stack_end);
    let argv_addr = Vaddr::new(word_at(&os, child, sp + 8));
    let argv0 = Vaddr::new(word_at(&os, child, argv_addr));
    for addr in [argv_addr, argv0] {
        assert!(addr >= stack_base && addr < stack_end);
        assert!(addr.as_u64() < SCRATCH_BASE || addr.as_u64() >= SCRATCH_BASE + PAGE_SIZE);
    }
}

#[test]
fn empty_argument_lists_still_produce_a_stack() {
    let os = MockOs::new();
    let root = os.root();
    let (child, _) = root.create_domain().unwrap();

    let sp = push_args(&root, child, &[]).unwrap();
    assert_eq!(word_at(&os, child, sp), 0);
    let argv_addr = Vaddr::new(word_at(&os, child, sp + 8));
    assert_eq!(word_at(&os, child, argv_addr), 0);
}

#[test]
fn the_scratch_window_is_released_afterwards() {
    let os = MockOs::new();
    let root = os.root();
    let (child, _) = root.create_domain().unwrap();

    push_args(&root, child, &["one", "two"]).unwrap();

    assert!(os.frame_at(DomainId::FIRST, Vaddr::new(SCRATCH_BASE)).is_none());
    // Only the child's stack page remains.
    assert_eq!(os.live_frames(), 1);
    assert!(os.frame_at(child, stack_page_base()).is_some());
}

#[test]
fn oversized_arguments_fail_before_touching_anything() {
    let os = MockOs::new();
    let root = os.root();
    let (child, _) = root.create_domain().unwrap();

    let huge = "x".repeat(PAGE_SIZE as usize);
    let result = push_args(&root, child, &[huge.as_str()]);
    assert_eq!(result, Err(StackError::OutOfSpace));

    assert_eq!(os.live_frames(), 0);
    assert!(os.frame_at(child, stack_page_base()).is_none());
}

#[test]
fn many_small_arguments_can_also_overflow() {
    // 4096 one-byte strings need 8 KB of NUL bytes alone.
    let args: Vec<String> = (0..PAGE_SIZE).map(|_| "y".to_owned()).collect();
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    assert_eq!(StackLayout::compute(&refs), Err(StackError::OutOfSpace));
}

proptest! {
    #[test]
    fn layouts_are_aligned_and_ordered(
        args in prop::collection::vec("[a-zA-Z0-9 ._-]{0,64}", 0..8)
    ) {
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let layout = StackLayout::compute(&refs).unwrap();

        prop_assert_eq!(layout.argc, refs.len());
        prop_assert_eq!(layout.sp_offset % 8, 0);
        prop_assert_eq!(layout.argv_offset % 8, 0);
        prop_assert_eq!(layout.sp_offset + 16, layout.argv_offset);

        // The pointer array ends before the strings begin, and the strings
        // end exactly at the page boundary.
        let table_end = layout.argv_offset + (layout.argc as u64 + 1) * 8;
        prop_assert!(table_end <= layout.strings_offset);
        let string_bytes: u64 = refs.iter().map(|a| a.len() as u64 + 1).sum();
        prop_assert_eq!(layout.strings_offset + string_bytes, PAGE_SIZE);
    }

    #[test]
    fn staged_arguments_read_back_intact(
        args in prop::collection::vec("[a-zA-Z0-9 ]{0,16}", 1..5)
    ) {
        let os = MockOs::new();
        let root = os.root();
        let (child, _) = root.create_domain().unwrap();
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let sp = push_args(&root, child, &refs).unwrap();

        prop_assert_eq!(word_at(&os, child, sp), refs.len() as u64);
        let argv_addr = Vaddr::new(word_at(&os, child, sp + 8));
        for (index, arg) in refs.iter().enumerate() {
            let slot = argv_addr + (index as u64) * 8;
            let string_addr = Vaddr::new(word_at(&os, child, slot));
            let bytes = string_at(&os, child, string_addr, arg.len() + 1);
            prop_assert_eq!(&bytes[..arg.len()], arg.as_bytes());
            prop_assert_eq!(bytes[arg.len()], 0);
        }
        let null_slot = argv_addr + (refs.len() as u64) * 8;
        prop_assert_eq!(word_at(&os, child, null_slot), 0);
    }
}
