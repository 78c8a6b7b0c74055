//! Profile session tests
//! Concurrent editing through shared session handles

use npr_integrity::audit::{get_merkle_root, ChangeType};
use npr_integrity::profile::{EntryKind, ProfileSession, DEFAULT_HISTORY_LIMIT};
use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn test_concurrent_adds_are_serialized() {
    let session = ProfileSession::new(create_test_signer(), DEFAULT_HISTORY_LIMIT);

    let mut handles = Vec::new();
    for i in 0..16 {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            session
                .add_entry(EntryKind::Interaction, json!({"message": i}))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entries = session.entries().await;
    assert_eq!(entries.len(), 16);
    assert_eq!(
        session.root_hash().await,
        Some(get_merkle_root(&entries).unwrap())
    );

    // Each mutation saw the root left by the previous one
    let history = session.history().await;
    assert_eq!(history.len(), 16);
    for pair in history.windows(2) {
        assert_eq!(pair[1].root_before, pair[0].root_after);
    }

    for entry in &entries {
        assert!(session.prove(&entry.id).await.unwrap().verify());
    }
}

#[tokio::test]
async fn test_resumed_session_reports_tampering() {
    let signer = create_test_signer();
    let mut entries = create_test_entries(&signer, 4);
    entries[1].content = json!("rewritten");

    let session = ProfileSession::from_entries(signer, entries.clone(), 10).unwrap();
    let report = session.integrity_report().await;
    assert_eq!(report.compromised_entries, vec![entries[1].id.clone()]);
    assert_eq!(report.integrity_score, 75.0);

    // Re-signing through the session repairs the entry
    session.edit_entry(&entries[1].id, json!("rewritten")).await.unwrap();
    assert!(session.integrity_report().await.is_valid);

    let history = session.history().await;
    assert_eq!(history.len(), 1);
    assert!(history[0].trail.integrity_maintained);
    // Content is unchanged, only the signature was renewed
    assert!(history[0].trail.changes.is_empty());
    assert_ne!(history[0].root_before, history[0].root_after);
}

#[tokio::test]
async fn test_insert_external_entry() {
    let signer = create_test_signer();
    let session = ProfileSession::new(create_test_signer(), DEFAULT_HISTORY_LIMIT);

    let entry = create_test_entry(&signer, "imported", "from another device");
    session.insert_entry(entry.clone()).await.unwrap();
    let revised = entry.revise(json!({"answer": "updated"}), &signer).unwrap();
    session.insert_entry(revised).await.unwrap();

    assert_eq!(session.len().await, 1);
    let history = session.history().await;
    assert_eq!(history[0].trail.changes[0].change_type, ChangeType::Added);
    assert_eq!(history[1].trail.changes[0].change_type, ChangeType::Modified);
}
