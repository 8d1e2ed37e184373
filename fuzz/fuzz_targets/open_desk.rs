#![no_main]

use libfuzzer_sys::fuzz_target;
use quickdesk_core::Desk;
use quickdesk_core::model::VoteKind;
use quickdesk_core::store::{BlobStore, MemoryStore};

const KEYS: [&str; 5] = [
    "quickdesk_tickets",
    "quickdesk_comments",
    "quickdesk_categories",
    "quickdesk_users",
    "quickdesk_user",
];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(blob) = std::str::from_utf8(rest) else {
        return;
    };

    let mut store = MemoryStore::new();
    store
        .save(KEYS[usize::from(selector) % KEYS.len()], blob)
        .expect("memory save");

    // Corrupt blobs must surface as errors, never panics.
    let Ok(mut desk) = Desk::open(store) else {
        return;
    };

    let ids: Vec<String> = desk.tickets().iter().map(|t| t.id.clone()).collect();
    for id in ids {
        let ticket = desk.vote_ticket(&id, "fuzz", VoteKind::Upvote).expect("vote");
        let ticket = desk
            .vote_ticket(&ticket.id, "fuzz", VoteKind::Downvote)
            .expect("vote");
        assert!(!ticket.upvotes.iter().any(|u| u == "fuzz"));
        assert_eq!(ticket.downvotes.iter().filter(|u| *u == "fuzz").count(), 1);
    }
});
