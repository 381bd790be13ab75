//! Stress test: concurrent readers share loads, fan-out respects the read
//! limit and results keep ledger order.

use std::sync::Arc;

use ledger_verifications::{
    Address, Backends, ComputedStatus, EngineConfig, MemoryLedger, Topic, VerificationRequest,
    VerificationsEngine,
};

fn setup(config: EngineConfig) -> (Arc<MemoryLedger>, VerificationsEngine) {
    let ledger = Arc::new(MemoryLedger::new());
    let engine = VerificationsEngine::new(config, Backends::from_memory(ledger.clone())).unwrap();
    (ledger, engine)
}

async fn account(ledger: &MemoryLedger, engine: &VerificationsEngine) -> Address {
    let account = ledger.create_account().unwrap();
    engine.create_identity(&account).await.unwrap();
    account
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_64_concurrent_readers_share_one_listing() {
    let (ledger, engine) = setup(EngineConfig::default());
    let issuer = account(&ledger, &engine).await;
    let subject = account(&ledger, &engine).await;
    let kyc = Topic::parse("/kyc").unwrap();
    engine
        .set_verification(&VerificationRequest::new(issuer, subject, kyc.clone()))
        .await
        .unwrap();

    let baseline = ledger.claim_listing_count();
    let mut handles = Vec::new();
    for _ in 0..64 {
        let engine = engine.clone();
        let kyc = kyc.clone();
        handles.push(tokio::spawn(async move {
            engine.get_nested_verifications(&subject, &kyc).await
        }));
    }
    for handle in handles {
        let nested = handle.await.unwrap().unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].status, ComputedStatus::Issued);
    }

    assert!(
        ledger.claim_listing_count() - baseline <= 1,
        "concurrent readers should share a single listing"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_single_permit_fan_out_keeps_order() {
    let config = EngineConfig {
        max_concurrency: 1,
        ..EngineConfig::default()
    };
    let (ledger, engine) = setup(config);
    let subject = account(&ledger, &engine).await;
    let topic = Topic::parse("/memberships").unwrap();

    let mut issued = Vec::new();
    for _ in 0..20 {
        let issuer = account(&ledger, &engine).await;
        let id = engine
            .set_verification(&VerificationRequest::new(issuer, subject, topic.clone()))
            .await
            .unwrap();
        issued.push((id, issuer));
    }

    let list = engine.get_verifications(&subject, &topic).await.unwrap();
    let read: Vec<_> = list.iter().map(|v| (v.id, v.issuer)).collect();
    assert_eq!(read, issued);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_readers_across_subjects_and_writes() {
    let (ledger, engine) = setup(EngineConfig::default());
    let issuer = account(&ledger, &engine).await;
    let topic = Topic::parse("/kyc").unwrap();

    let mut subjects = Vec::new();
    for _ in 0..16 {
        subjects.push(account(&ledger, &engine).await);
    }

    // Interleave reads of every subject with issuance to half of them.
    let mut handles = Vec::new();
    for (i, subject) in subjects.iter().copied().enumerate() {
        let engine = engine.clone();
        let topic = topic.clone();
        handles.push(tokio::spawn(async move {
            engine.get_verifications(&subject, &topic).await.unwrap();
            if i % 2 == 0 {
                engine
                    .set_verification(&VerificationRequest::new(issuer, subject, topic.clone()))
                    .await
                    .unwrap();
            }
            engine.get_verifications(&subject, &topic).await.unwrap().len()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let seen = handle.await.unwrap();
        let expected = usize::from(i % 2 == 0);
        assert_eq!(seen, expected, "subject {i} read a stale list");
    }
}
