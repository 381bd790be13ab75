//! Edge cases: composite tie-breaks, repeated claims, descriptions,
//! configuration files and malformed input.

use std::sync::Arc;

use ledger_verifications::ledger::ContentStore;
use ledger_verifications::verification::DescriptionResolver;
use ledger_verifications::{
    Address, Backends, ComputedStatus, EngineConfig, Hash32, MemoryLedger, Topic, VerificationError,
    VerificationRequest, VerificationStatus, VerificationWarning, VerificationsEngine,
};

struct World {
    ledger: Arc<MemoryLedger>,
    engine: VerificationsEngine,
}

impl World {
    fn new(config: EngineConfig) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let engine = VerificationsEngine::new(config, Backends::from_memory(ledger.clone())).unwrap();
        Self { ledger, engine }
    }

    async fn account(&self) -> Address {
        let account = self.ledger.create_account().unwrap();
        self.engine.create_identity(&account).await.unwrap();
        account
    }
}

fn topic(s: &str) -> Topic {
    Topic::parse(s).unwrap()
}

// ── Composite status ─────────────────────────────────────────────────────────

#[tokio::test]
async fn confirmed_beats_later_rejection() {
    let w = World::new(EngineConfig::default());
    let subject = w.account().await;
    let first = w.account().await;
    let second = w.account().await;

    let a = w
        .engine
        .set_verification(&VerificationRequest::new(first, subject, topic("/kyc")))
        .await
        .unwrap();
    let b = w
        .engine
        .set_verification(&VerificationRequest::new(second, subject, topic("/kyc")))
        .await
        .unwrap();
    w.engine
        .confirm_verification(&subject, &subject, &topic("/kyc"), &a)
        .await
        .unwrap();
    w.engine
        .reject_verification(&subject, &subject, &topic("/kyc"), &b, None)
        .await
        .unwrap();

    let computed = w.engine.get_computed_verification(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(computed.status, ComputedStatus::Confirmed);
    assert_eq!(computed.verifications.len(), 2);
    // Warnings of every input are kept.
    assert!(computed.has_warning(VerificationWarning::Rejected));
}

#[tokio::test]
async fn issued_replaces_leading_rejection() {
    let w = World::new(EngineConfig::default());
    let subject = w.account().await;
    let first = w.account().await;
    let second = w.account().await;

    let a = w
        .engine
        .set_verification(&VerificationRequest::new(first, subject, topic("/kyc")))
        .await
        .unwrap();
    w.engine
        .reject_verification(&subject, &subject, &topic("/kyc"), &a, None)
        .await
        .unwrap();
    w.engine
        .set_verification(&VerificationRequest::new(second, subject, topic("/kyc")))
        .await
        .unwrap();

    let computed = w.engine.get_computed_verification(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(computed.status, ComputedStatus::Issued);
}

#[tokio::test]
async fn composite_expiration_is_latest_of_winning_inputs() {
    let w = World::new(EngineConfig::default());
    let subject = w.account().await;
    let far = u64::MAX / 2;

    for expiration in [Some(far - 10), None, Some(far)] {
        let issuer = w.account().await;
        let mut request = VerificationRequest::new(issuer, subject, topic("/kyc"));
        if let Some(expiration) = expiration {
            request = request.expires_at(expiration);
        }
        w.engine.set_verification(&request).await.unwrap();
    }

    let computed = w.engine.get_computed_verification(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(computed.status, ComputedStatus::Issued);
    assert_eq!(computed.expiration_date, Some(far));
    assert!(!computed.has_warning(VerificationWarning::Expired));
}

// ── Repeated claims ──────────────────────────────────────────────────────────

#[tokio::test]
async fn same_issuer_may_issue_twice() {
    let w = World::new(EngineConfig::default());
    let issuer = w.account().await;
    let subject = w.account().await;

    let a = w
        .engine
        .set_verification(&VerificationRequest::new(issuer, subject, topic("/kyc")))
        .await
        .unwrap();
    let b = w
        .engine
        .set_verification(&VerificationRequest::new(issuer, subject, topic("/kyc")))
        .await
        .unwrap();
    assert_ne!(a, b);

    let list = w.engine.get_verifications(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(list.iter().map(|v| v.id).collect::<Vec<_>>(), vec![a, b]);
    assert!(list.iter().all(|v| v.status == VerificationStatus::Issued));
}

#[tokio::test]
async fn rejection_without_reason_has_none() {
    let w = World::new(EngineConfig::default());
    let issuer = w.account().await;
    let subject = w.account().await;
    let id = w
        .engine
        .set_verification(&VerificationRequest::new(issuer, subject, topic("/kyc")))
        .await
        .unwrap();
    w.engine
        .reject_verification(&subject, &subject, &topic("/kyc"), &id, None)
        .await
        .unwrap();

    let list = w.engine.get_verifications(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(list[0].status, VerificationStatus::Rejected);
    assert!(list[0].reject_reason.is_none());
    assert!(w.engine.get_verification_payload(&list[0]).await.is_none());
}

#[tokio::test]
async fn subject_cannot_delete_root_level_claim_of_others() {
    let w = World::new(EngineConfig::default());
    let issuer = w.account().await;
    let subject = w.account().await;
    let id = w
        .engine
        .set_verification(&VerificationRequest::new(issuer, subject, topic("/kyc")))
        .await
        .unwrap();

    let err = w
        .engine
        .delete_verification(&subject, &subject, &topic("/kyc"), &id)
        .await
        .unwrap_err();
    assert!(matches!(err, VerificationError::Unauthorized { .. }));
}

#[tokio::test]
async fn claims_without_an_owned_issuer_are_skipped() {
    let w = World::new(EngineConfig::default());
    let orphaned_issuer = w.account().await;
    let issuer = w.account().await;
    let subject = w.account().await;
    for from in [orphaned_issuer, issuer] {
        w.engine
            .set_verification(&VerificationRequest::new(from, subject, topic("/kyc")))
            .await
            .unwrap();
    }

    // Detach the first issuer's identity from its account and plant a claim
    // with a zero issuer next to the genuine ones.
    let mut state = w.ledger.snapshot().unwrap();
    let subject_identity = state.account_identities[&subject];
    let orphaned_identity = state.account_identities[&orphaned_issuer];
    state.identity_owners.remove(&orphaned_identity);
    let holder = state.account_holders.get_mut(&subject_identity).unwrap();
    let mut zero_issuer = holder.claims[1].clone();
    zero_issuer.id = Hash32([0xee; 32]);
    zero_issuer.claim.issuer = Address::ZERO;
    holder.claims.push(zero_issuer);

    let ledger = Arc::new(MemoryLedger::from_state(state));
    let engine =
        VerificationsEngine::new(EngineConfig::default(), Backends::from_memory(ledger)).unwrap();
    let list = engine.get_verifications(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].issuer, issuer);

    let nested = engine.get_nested_verifications(&subject, &topic("/kyc")).await.unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].issuer(), Some(issuer));
}

// ── Roots and descriptions ───────────────────────────────────────────────────

#[tokio::test]
async fn trusted_root_issuer_has_no_root_warning() {
    let base = World::new(EngineConfig::default());
    let root = base.account().await;
    let other = base.account().await;
    let subject = base.account().await;

    // Rebuild an engine over the same ledger that trusts only `root`.
    let engine = VerificationsEngine::new(
        EngineConfig::default().with_trusted_root(root),
        Backends::from_memory(base.ledger.clone()),
    )
    .unwrap();
    for issuer in [root, other] {
        engine
            .set_verification(&VerificationRequest::new(issuer, subject, topic("/kyc")))
            .await
            .unwrap();
    }

    let nested = engine.get_nested_verifications(&subject, &topic("/kyc")).await.unwrap();
    let root_entry = nested.iter().find(|n| n.issuer() == Some(root)).unwrap();
    let other_entry = nested.iter().find(|n| n.issuer() == Some(other)).unwrap();
    assert!(!root_entry.has_warning(VerificationWarning::NotRootOwner));
    assert!(other_entry.has_warning(VerificationWarning::NotRootOwner));
}

#[tokio::test]
async fn registered_description_names_the_composite() {
    let w = World::new(EngineConfig::default());
    let issuer = w.account().await;
    let subject = w.account().await;

    let node = DescriptionResolver::node_for(&topic("/company/acme"), "acme");
    let hash = w
        .ledger
        .put(serde_json::to_vec(&serde_json::json!({ "public": { "name": "Acme staff" } })).unwrap())
        .await
        .unwrap();
    w.ledger.set_name_record(node, hash).unwrap();

    w.engine
        .set_verification(
            &VerificationRequest::new(issuer, subject, topic("/company/acme")).description_domain("acme"),
        )
        .await
        .unwrap();
    let computed = w
        .engine
        .get_computed_verification(&subject, &topic("/company/acme"))
        .await
        .unwrap();
    assert_eq!(computed.name, "Acme staff");

    // Without verifications the composite is named after the topic.
    let empty = w
        .engine
        .get_computed_verification(&subject, &topic("/company/other"))
        .await
        .unwrap();
    assert_eq!(empty.name, "/company/other");
}

#[tokio::test]
async fn contract_without_declared_identity_is_missing() {
    let w = World::new(EngineConfig::default());
    let contract = Address([0x77; 20]);
    w.ledger
        .set_contract_description(&contract, serde_json::json!({ "public": { "name": "plain" } }))
        .unwrap();

    let nested = w
        .engine
        .get_nested_verifications(&contract, &topic("/audit"))
        .await
        .unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].status, ComputedStatus::Missing);
    assert!(nested[0].has_warning(VerificationWarning::NoIdentity));
}

// ── Input validation ─────────────────────────────────────────────────────────

#[test]
fn malformed_topics_are_rejected() {
    for bad in ["/a//b", "/a b", "/a.b", "//"] {
        assert!(
            matches!(Topic::parse(bad), Err(VerificationError::InvalidTopic(_))),
            "{bad:?} should not parse"
        );
    }
    assert_eq!(topic("a/b/").path(), "/a/b");
}

#[test]
fn config_file_defaults_and_validation() {
    let dir = tempfile::tempdir().unwrap();

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "{}").unwrap();
    assert_eq!(EngineConfig::from_json_file(&empty).unwrap(), EngineConfig::default());

    let custom = dir.path().join("custom.json");
    std::fs::write(
        &custom,
        r#"{ "description_root": "test", "max_concurrency": 3,
             "trusted_roots": ["0x0101010101010101010101010101010101010101"] }"#,
    )
    .unwrap();
    let config = EngineConfig::from_json_file(&custom).unwrap();
    assert_eq!(config.description_root, "test");
    assert_eq!(config.max_concurrency, 3);
    assert_eq!(config.trusted_roots, vec![Address([1u8; 20])]);

    let invalid = dir.path().join("invalid.json");
    std::fs::write(&invalid, r#"{ "description_root": "a.b" }"#).unwrap();
    assert!(matches!(
        EngineConfig::from_json_file(&invalid),
        Err(VerificationError::Config(_))
    ));
}
