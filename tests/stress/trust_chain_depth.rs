//! Stress test: deep topic hierarchies and trust paths across many issuers.

use std::sync::Arc;

use ledger_verifications::{
    Address, Backends, EngineConfig, MemoryLedger, Topic, TrustLevel, ValidationOptions,
    VerificationRequest, VerificationWarning, VerificationsEngine,
};

struct Chain {
    ledger: Arc<MemoryLedger>,
    engine: VerificationsEngine,
    /// `accounts[k]` holds the verification on `topics[k - 1]`.
    accounts: Vec<Address>,
    topics: Vec<Topic>,
}

/// Topics `/n1`, `/n1/n2`, ... of the given depth, each level issued by
/// the holder of the level above and confirmed by its subject.
async fn build_chain(depth: usize, skip: Option<usize>) -> Chain {
    let ledger = Arc::new(MemoryLedger::new());
    let engine =
        VerificationsEngine::new(EngineConfig::default(), Backends::from_memory(ledger.clone()))
            .unwrap();

    let mut accounts = Vec::with_capacity(depth + 1);
    for _ in 0..=depth {
        let account = ledger.create_account().unwrap();
        engine.create_identity(&account).await.unwrap();
        accounts.push(account);
    }

    let mut topics = Vec::with_capacity(depth);
    let mut topic = Topic::root();
    for level in 1..=depth {
        topic = topic.child(&format!("n{level}")).unwrap();
        topics.push(topic.clone());
        if skip == Some(level) {
            continue;
        }
        let issuer = accounts[level - 1];
        let subject = accounts[level];
        let id = engine
            .set_verification(&VerificationRequest::new(issuer, subject, topic.clone()))
            .await
            .unwrap();
        engine
            .confirm_verification(&subject, &subject, &topic, &id)
            .await
            .unwrap();
    }

    Chain {
        ledger,
        engine,
        accounts,
        topics,
    }
}

#[tokio::test]
async fn stress_trust_path_depth_4() {
    let chain = build_chain(4, None).await;
    let leaf = chain.accounts[4];
    let path = chain
        .engine
        .validate_trust_path(&leaf, &chain.topics[3])
        .await
        .unwrap();

    assert_eq!(path.len(), 4);
    assert!(path.reaches_root());
    assert!(path.is_intact());
    for (i, link) in path.links.iter().enumerate() {
        assert_eq!(link.topic, chain.topics[3 - i]);
        assert_eq!(link.issuer, Some(chain.accounts[3 - i]));
    }
}

#[tokio::test]
async fn stress_missing_level_cuts_the_path() {
    // /n1/n2 is never issued.
    let chain = build_chain(4, Some(2)).await;
    let leaf = chain.accounts[4];
    let path = chain
        .engine
        .validate_trust_path(&leaf, &chain.topics[3])
        .await
        .unwrap();

    assert_eq!(path.len(), 2);
    assert!(!path.reaches_root());
    assert!(!path.is_intact());
    let last = path.last().unwrap();
    assert_eq!(last.topic, chain.topics[2]);
    assert!(last.warnings.contains(&VerificationWarning::ParentMissing));

    let level = chain
        .engine
        .verification_status(&leaf, &chain.topics[3], &ValidationOptions::default())
        .await
        .unwrap();
    assert_eq!(level, TrustLevel::Green);
}

#[tokio::test]
async fn stress_trust_path_depth_24() {
    let depth = 24;
    let chain = build_chain(depth, None).await;
    let leaf = chain.accounts[depth];
    let path = chain
        .engine
        .validate_trust_path(&leaf, &chain.topics[depth - 1])
        .await
        .unwrap();

    assert_eq!(path.len(), depth);
    assert!(path.is_intact());

    // Every level was loaded once; a second walk is served from cache.
    let listings = chain.ledger.claim_listing_count();
    chain
        .engine
        .validate_trust_path(&leaf, &chain.topics[depth - 1])
        .await
        .unwrap();
    assert_eq!(chain.ledger.claim_listing_count(), listings);
}

#[tokio::test]
async fn stress_revoking_the_root_breaks_every_level() {
    let depth = 8;
    let chain = build_chain(depth, None).await;
    let leaf = chain.accounts[depth];
    assert!(chain
        .engine
        .validate_trust_path(&leaf, &chain.topics[depth - 1])
        .await
        .unwrap()
        .is_intact());

    // The root issuer withdraws the top-level verification.
    let top = chain
        .engine
        .get_verifications(&chain.accounts[1], &chain.topics[0])
        .await
        .unwrap();
    chain
        .engine
        .delete_verification(&chain.accounts[0], &chain.accounts[1], &chain.topics[0], &top[0].id)
        .await
        .unwrap();

    let path = chain
        .engine
        .validate_trust_path(&leaf, &chain.topics[depth - 1])
        .await
        .unwrap();
    assert_eq!(path.len(), depth - 1);
    assert!(path
        .last()
        .unwrap()
        .warnings
        .contains(&VerificationWarning::ParentMissing));
}
