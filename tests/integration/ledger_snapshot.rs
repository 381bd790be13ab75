//! Integration tests: ledger snapshot files.
//!
//! A ledger saved to disk and loaded back must serve the same
//! verifications, keep account keys usable and keep its block clock
//! moving forward.

use std::sync::Arc;

use ledger_verifications::storage::{load_ledger, load_or_create, save_ledger};
use ledger_verifications::{
    Backends, EngineConfig, MemoryLedger, Topic, VerificationError, VerificationRequest,
    VerificationStatus, VerificationsEngine,
};

fn engine(ledger: &Arc<MemoryLedger>) -> VerificationsEngine {
    VerificationsEngine::new(EngineConfig::default(), Backends::from_memory(ledger.clone())).unwrap()
}

#[tokio::test]
async fn snapshot_preserves_verifications_and_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let kyc = Topic::parse("/kyc").unwrap();

    let ledger = Arc::new(MemoryLedger::new());
    let first = engine(&ledger);
    let issuer = ledger.create_account().unwrap();
    let subject = ledger.create_account().unwrap();
    first.create_identity(&issuer).await.unwrap();
    first.create_identity(&subject).await.unwrap();
    let id = first
        .set_verification(
            &VerificationRequest::new(issuer, subject, kyc.clone())
                .payload(serde_json::json!({ "level": 3 })),
        )
        .await
        .unwrap();
    let before = first.get_verifications(&subject, &kyc).await.unwrap();

    save_ledger(&ledger, &path).unwrap();
    assert!(path.exists());
    assert!(!dir.path().join("ledger.json.tmp").exists());

    let restored = Arc::new(load_ledger(&path).unwrap());
    assert_eq!(restored.snapshot().unwrap(), ledger.snapshot().unwrap());

    let second = engine(&restored);
    let after = second.get_verifications(&subject, &kyc).await.unwrap();
    assert_eq!(after.as_ref(), before.as_ref());
    assert!(after[0].valid);
    assert_eq!(
        second.get_verification_payload(&after[0]).await,
        Some(serde_json::json!({ "level": 3 }))
    );

    // The subject's key survived the round trip and can still confirm.
    second
        .confirm_verification(&subject, &subject, &kyc, &id)
        .await
        .unwrap();
    let confirmed = second.get_verifications(&subject, &kyc).await.unwrap();
    assert_eq!(confirmed[0].status, VerificationStatus::Confirmed);
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = load_or_create(&dir.path().join("absent.json")).unwrap();
    assert!(ledger.accounts().is_empty());
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("ledger.json");
    let ledger = MemoryLedger::new();
    let account = ledger.create_account().unwrap();
    save_ledger(&ledger, &path).unwrap();

    let loaded = load_or_create(&path).unwrap();
    assert_eq!(loaded.accounts(), vec![account]);
}

#[test]
fn unsupported_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let ledger = MemoryLedger::new();
    save_ledger(&ledger, &path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    doc["version"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let err = load_ledger(&path).err().expect("version 99 must not load");
    assert!(matches!(err, VerificationError::InvalidFileFormat(_)));
}

#[test]
fn garbage_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, b"not json at all").unwrap();

    let err = load_ledger(&path).err().expect("garbage must not load");
    assert!(matches!(err, VerificationError::InvalidFileFormat(_)));
}
