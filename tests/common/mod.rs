use npr_integrity::crypto::SignatureService;
use npr_integrity::profile::{Entry, EntryKind};
use serde_json::json;

/// Create a default signing service for tests
pub fn create_test_signer() -> SignatureService {
    SignatureService::default()
}

/// Signed entry with a fixed id and text content
pub fn create_test_entry(signer: &SignatureService, id: &str, text: &str) -> Entry {
    Entry::with_id(id, EntryKind::Assessment, json!({"answer": text}), signer)
        .expect("Failed to create test entry")
}

/// `count` signed entries cycling through every entry kind
pub fn create_test_entries(signer: &SignatureService, count: usize) -> Vec<Entry> {
    (0..count)
        .map(|i| {
            Entry::with_id(
                format!("entry-{}", i),
                EntryKind::ALL[i % EntryKind::ALL.len()],
                json!({"prompt": i, "answer": format!("response {}", i)}),
                signer,
            )
            .expect("Failed to create test entry")
        })
        .collect()
}

/// Change one hex character of a hash
pub fn flip_hex_char(hash: &str, index: usize) -> String {
    hash.char_indices()
        .map(|(i, c)| {
            if i == index {
                if c == '0' {
                    '1'
                } else {
                    '0'
                }
            } else {
                c
            }
        })
        .collect()
}
