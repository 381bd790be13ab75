//! Issue and validate — build a two-level trust chain and inspect it.
//!
//! Run with:
//!   cargo run --example issue_and_validate -p ledger-verifications

use std::sync::Arc;

use ledger_verifications::{
    Backends, EngineConfig, MemoryLedger, Topic, ValidationOptions, VerificationRequest,
    VerificationsEngine,
};

#[tokio::main]
async fn main() -> ledger_verifications::Result<()> {
    // ── 1. Set up accounts and identities ───────────────────────────────────
    //
    // Every participant needs an identity on the ledger before it can hold
    // or issue verifications.
    let ledger = Arc::new(MemoryLedger::new());
    let engine = VerificationsEngine::new(EngineConfig::default(), Backends::from_memory(ledger.clone()))?;

    let registry = ledger.create_account()?;
    let company = ledger.create_account()?;
    let employee = ledger.create_account()?;
    for account in [registry, company, employee] {
        engine.create_identity(&account).await?;
    }
    println!("Accounts");
    println!("  Registry: {registry}");
    println!("  Company:  {company}");
    println!("  Employee: {employee}");
    println!();

    // ── 2. Issue the chain ──────────────────────────────────────────────────
    //
    // The registry vouches for the company on /company; the company vouches
    // for its employee one level below. Each subject confirms its own claim.
    let company_topic = Topic::parse("/company")?;
    let staff_topic = company_topic.child("staff")?;

    let id = engine
        .set_verification(&VerificationRequest::new(registry, company, company_topic.clone()))
        .await?;
    engine
        .confirm_verification(&company, &company, &company_topic, &id)
        .await?;

    let id = engine
        .set_verification(
            &VerificationRequest::new(company, employee, staff_topic.clone())
                .payload(serde_json::json!({ "role": "engineer" })),
        )
        .await?;
    println!("Issued {staff_topic} ({id}), not yet confirmed");

    let level = engine
        .verification_status(&employee, &staff_topic, &ValidationOptions::default())
        .await?;
    println!("  Level before confirmation: {level:?}");

    engine
        .confirm_verification(&employee, &employee, &staff_topic, &id)
        .await?;
    let level = engine
        .verification_status(&employee, &staff_topic, &ValidationOptions::default())
        .await?;
    println!("  Level after confirmation:  {level:?}");
    println!();

    // ── 3. Walk the trust path ──────────────────────────────────────────────
    let path = engine.validate_trust_path(&employee, &staff_topic).await?;
    println!("Trust path");
    for link in &path.links {
        let issuer = link.issuer.map(|a| a.to_string()).unwrap_or_default();
        println!("  {} [{}] issued by {issuer}", link.topic, link.status);
    }
    println!("  Intact: {}", path.is_intact());

    Ok(())
}
