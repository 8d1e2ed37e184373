//! End-to-end desk lifecycle against the file-backed store.

use quickdesk_core::auth::{Authenticator, current_user};
use quickdesk_core::error::ErrorCode;
use quickdesk_core::model::{
    NewComment, NewTicket, Priority, Record, Status, Ticket, TicketPatch, VoteKind,
};
use quickdesk_core::store::{BlobStore, FileStore, SESSION_KEY};
use quickdesk_core::view::{self, SortOrder, TicketFilter};
use quickdesk_core::{Desk, DeskError};
use std::time::Duration;

fn open(dir: &std::path::Path) -> Desk<FileStore> {
    Desk::open(FileStore::open(dir).expect("open store")).expect("open desk")
}

#[test]
fn seed_create_vote_comment_and_reload() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let mut desk = open(dir.path());
        assert_eq!(desk.users().len(), 3);
        assert_eq!(desk.categories().len(), 4);
        assert_eq!(desk.tickets().len(), 2);
        assert_eq!(desk.comments().len(), 1);
        for key in [
            "quickdesk_users",
            "quickdesk_categories",
            "quickdesk_tickets",
            "quickdesk_comments",
        ] {
            assert!(dir.path().join(format!("{key}.json")).is_file(), "{key} seeded");
        }

        let created = desk
            .create_ticket(NewTicket::open(
                "Printer on fire",
                "Third floor",
                "1",
                Priority::Urgent,
                "3",
            ))
            .expect("create");
        assert_eq!(desk.tickets().len(), 3);
        assert_eq!(desk.tickets()[0].id, created.id);

        desk.vote_ticket(&created.id, "3", VoteKind::Upvote).expect("vote");
        desk.vote_ticket(&created.id, "2", VoteKind::Upvote).expect("vote");
        let agent = desk.user("2").cloned().expect("agent");
        desk.add_comment(NewComment::by(&agent, created.id.clone(), "On it"))
            .expect("comment");
        desk.update_ticket(&created.id, TicketPatch::assign("2"))
            .expect("assign");
    }

    let desk = open(dir.path());
    assert_eq!(desk.tickets().len(), 3, "reload does not reseed");
    let top = &desk.tickets()[0];
    assert_eq!(top.subject, "Printer on fire");
    assert_eq!(top.upvotes, vec!["3".to_string(), "2".to_string()]);
    assert_eq!(top.assigned_to.as_deref(), Some("2"));

    let by_votes = view::list_tickets(desk.tickets(), &TicketFilter::default(), SortOrder::Votes);
    assert_eq!(by_votes[0].id, top.id);

    let thread = view::ticket_comments(desk.comments(), &top.id, false);
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].user_name, "Support Agent");
}

#[test]
fn corrupt_collection_blob_fails_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = FileStore::open(dir.path()).expect("store");
    store.save(Ticket::COLLECTION, "[{\"id\": ").expect("write garbage");

    let err = Desk::open(store).expect_err("corrupt");
    assert!(matches!(err, DeskError::CorruptBlob { ref key, .. } if key == "quickdesk_tickets"));
    assert_eq!(err.error_code(), ErrorCode::CorruptCollection);
}

#[test]
fn missing_ticket_mutation_leaves_files_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut desk = open(dir.path());
    let path = dir.path().join("quickdesk_tickets.json");
    let before = std::fs::read_to_string(&path).expect("read");

    let err = desk
        .update_ticket("404", TicketPatch::status(Status::Closed))
        .expect_err("missing");
    assert_eq!(err.error_code(), ErrorCode::TicketNotFound);
    let err = desk
        .vote_ticket("404", "3", VoteKind::Downvote)
        .expect_err("missing");
    assert_eq!(err.error_code(), ErrorCode::TicketNotFound);

    assert_eq!(std::fs::read_to_string(&path).expect("read"), before);
}

#[test]
fn session_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut auth = Authenticator::new(Duration::ZERO);

    {
        let mut desk = open(dir.path());
        assert!(auth.login(&mut desk, "admin@quickdesk.com").expect("login"));
    }
    assert!(dir.path().join(format!("{SESSION_KEY}.json")).is_file());

    let mut desk = open(dir.path());
    let user = current_user(&desk).expect("read").expect("session");
    assert_eq!(user.email, "admin@quickdesk.com");

    auth.logout(&mut desk).expect("logout");
    assert!(current_user(&desk).expect("read").is_none());
}
