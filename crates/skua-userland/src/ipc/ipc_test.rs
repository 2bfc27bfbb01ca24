// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for rendezvous send and receive.
//!
//! Sender and receiver run on real threads against the in-memory platform,
//! so the retry loop and the blocking wait are exercised for real.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{SendFatal, recv, send};
use crate::platform::Kernel;
use crate::platform::mock::MockOs;
use skua_abi::{DomainId, PagePerms, SysError, Vaddr};

use std::thread;
use std::time::Duration;

#[test]
fn a_word_travels_between_domains() {
    let os = MockOs::new();
    let root = os.root();
    let (peer, _) = root.create_domain().unwrap();
    let peer_handle = os.handle(peer);

    let receiver = thread::spawn(move || recv(&peer_handle, None).unwrap());

    send(&root, peer, 0x5CA1_AB1E, None).unwrap();
    let message = receiver.join().unwrap();

    assert_eq!(message.value, 0x5CA1_AB1E);
    assert_eq!(message.sender, DomainId::FIRST);
    assert!(!message.page_perms.is_some());
}

#[test]
fn send_retries_until_the_receiver_arrives() {
    let os = MockOs::new();
    let root = os.root();
    let (peer, _) = root.create_domain().unwrap();
    let peer_handle = os.handle(peer);

    // The sender starts first and has to spin until the receiver blocks.
    let sender = thread::spawn(move || send(&root, peer, 7, None));

    thread::sleep(Duration::from_millis(20));
    let message = recv(&peer_handle, None).unwrap();

    sender.join().unwrap().unwrap();
    assert_eq!(message.value, 7);
}

#[test]
fn replies_flow_back_over_the_same_primitive() {
    let os = MockOs::new();
    let root = os.root();
    let (peer, _) = root.create_domain().unwrap();
    let peer_handle = os.handle(peer);

    let echo = thread::spawn(move || {
        let request = recv(&peer_handle, None).unwrap();
        send(&peer_handle, request.sender, request.value + 1, None).unwrap();
    });

    send(&root, peer, 41, None).unwrap();
    let reply = recv(&root, None).unwrap();
    echo.join().unwrap();

    assert_eq!(reply.value, 42);
    assert_eq!(reply.sender, peer);
}

#[test]
fn a_page_transfers_when_both_sides_want_it() {
    let os = MockOs::new();
    let root = os.root();
    let (peer, _) = root.create_domain().unwrap();
    let peer_handle = os.handle(peer);

    let theirs = Vaddr::new(0x0030_0000);
    let receiver = thread::spawn(move || recv(&peer_handle, Some(theirs)).unwrap());

    let ours = Vaddr::new(0x0020_0000);
    root.alloc_page(DomainId::SELF, ours, PagePerms::rw_user())
        .unwrap();
    root.write_bytes(ours, b"hello page").unwrap();
    send(&root, peer, 1, Some((ours, PagePerms::ro_user()))).unwrap();

    let message = receiver.join().unwrap();
    assert_eq!(message.page_perms, PagePerms::ro_user());

    // Same frame on both sides, content visible to the receiver.
    assert_eq!(
        os.frame_at(DomainId::FIRST, ours),
        os.frame_at(peer, theirs)
    );
    assert_eq!(os.read_memory(peer, theirs, 10).unwrap(), b"hello page");
}

#[test]
fn a_declined_page_offer_still_delivers_the_word() {
    let os = MockOs::new();
    let root = os.root();
    let (peer, _) = root.create_domain().unwrap();
    let peer_handle = os.handle(peer);

    let receiver = thread::spawn(move || recv(&peer_handle, None).unwrap());

    let ours = Vaddr::new(0x0020_0000);
    root.alloc_page(DomainId::SELF, ours, PagePerms::rw_user())
        .unwrap();
    send(&root, peer, 9, Some((ours, PagePerms::ro_user()))).unwrap();

    let message = receiver.join().unwrap();
    assert_eq!(message.value, 9);
    assert!(!message.page_perms.is_some());
    assert!(os.frame_at(peer, ours).is_none());
}

#[test]
fn sends_to_nonexistent_domains_fail_fatally() {
    let os = MockOs::new();
    let root = os.root();
    let ghost = DomainId::new(99);
    assert_eq!(
        send(&root, ghost, 1, None),
        Err(SendFatal {
            to: ghost,
            cause: SysError::BadDomain,
        })
    );
}

#[test]
fn bad_page_offers_fail_fatally_instead_of_spinning() {
    let os = MockOs::new();
    let root = os.root();
    let (peer, _) = root.create_domain().unwrap();
    let peer_handle = os.handle(peer);

    let receiver = thread::spawn(move || recv(&peer_handle, Some(Vaddr::new(0x0030_0000))));

    // Give the receiver time to block, then offer a page that was never
    // mapped in the sender.
    thread::sleep(Duration::from_millis(20));
    let result = send(
        &root,
        peer,
        1,
        Some((Vaddr::new(0x0020_0000), PagePerms::ro_user())),
    );
    assert_eq!(
        result,
        Err(SendFatal {
            to: peer,
            cause: SysError::Unmapped,
        })
    );

    // The receiver is still blocked; a clean send releases it.
    send(&root, peer, 2, None).unwrap();
    assert_eq!(receiver.join().unwrap().unwrap().value, 2);
}

#[test]
fn recv_validates_its_landing_address() {
    let os = MockOs::new();
    let root = os.root();
    assert_eq!(
        recv(&root, Some(Vaddr::new(0x0030_0001))).unwrap_err(),
        SysError::Invalid
    );
}

#[test]
fn many_senders_one_receiver() {
    let os = MockOs::new();
    let root = os.root();
    let (hub, _) = root.create_domain().unwrap();

    let mut senders = Vec::new();
    for index in 0..4u64 {
        let (worker, _) = root.create_domain().unwrap();
        let handle = os.handle(worker);
        senders.push(thread::spawn(move || {
            send(&handle, hub, index, None).unwrap();
        }));
    }

    let hub_handle = os.handle(hub);
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(recv(&hub_handle, None).unwrap().value);
    }
    for sender in senders {
        sender.join().unwrap();
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}
