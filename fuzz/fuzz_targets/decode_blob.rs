#![no_main]

use libfuzzer_sys::fuzz_target;
use quickdesk_core::model::{Category, Comment, Ticket, User};
use quickdesk_core::store::decode_records;

fuzz_target!(|data: &[u8]| {
    let Ok(blob) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that decodes must survive a re-encode unchanged.
    if let Ok(tickets) = decode_records::<Ticket>("quickdesk_tickets", blob) {
        let again = serde_json::to_string(&tickets).expect("encode tickets");
        let back: Vec<Ticket> = decode_records("quickdesk_tickets", &again).expect("re-decode");
        assert_eq!(back, tickets);
    }
    let _ = decode_records::<Comment>("quickdesk_comments", blob);
    let _ = decode_records::<Category>("quickdesk_categories", blob);
    let _ = decode_records::<User>("quickdesk_users", blob);
});
