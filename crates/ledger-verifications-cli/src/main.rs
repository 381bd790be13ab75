//! Ledger verifications CLI — `lvx` command.
//!
//! Drives a verifications engine against an in-memory ledger that is
//! loaded from and saved back to a snapshot file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use ledger_verifications::storage::{load_or_create, save_ledger};
use ledger_verifications::time::{now_secs, secs_to_rfc3339};
use ledger_verifications::{
    Address, Backends, ClaimId, EngineConfig, MemoryLedger, Topic, TrustPath, ValidationOptions,
    VerificationRequest, VerificationsEngine,
};

// ── Paths ─────────────────────────────────────────────────────────────────────

fn default_ledger_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set; pass --ledger")?;
    Ok(PathBuf::from(home).join(".lvx").join("ledger.json"))
}

// ── Argument helpers ──────────────────────────────────────────────────────────

fn parse_address(s: &str) -> Result<Address> {
    s.parse().map_err(|e| anyhow!("invalid address '{s}': {e}"))
}

fn parse_claim_id(s: &str) -> Result<ClaimId> {
    s.parse().map_err(|e| anyhow!("invalid claim id '{s}': {e}"))
}

fn parse_topic(s: &str) -> Result<Topic> {
    Topic::parse(s).map_err(|e| anyhow!("{e}"))
}

fn parse_json(s: &str) -> Result<serde_json::Value> {
    serde_json::from_str(s).with_context(|| format!("invalid JSON: {s}"))
}

/// Parse a duration like "24h", "7d", "1h30m" or plain seconds into seconds.
fn parse_duration_secs(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }

    let mut total: u64 = 0;
    let mut current = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
            continue;
        }
        let val: u64 = current
            .parse()
            .map_err(|_| anyhow!("invalid duration: {s}"))?;
        current.clear();
        total += match ch {
            'd' => val * 86_400,
            'h' => val * 3_600,
            'm' => val * 60,
            's' => val,
            _ => return Err(anyhow!("unknown duration unit '{ch}' in '{s}'")),
        };
    }
    if !current.is_empty() {
        return Err(anyhow!("duration '{s}' is missing a unit (d/h/m/s)"));
    }
    if total == 0 {
        return Err(anyhow!("duration must be > 0"));
    }
    Ok(total)
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Ledger verifications CLI — issue, confirm, reject and validate
/// verifications held by on-chain identities.
#[derive(Parser, Debug)]
#[command(name = "lvx", about = "Ledger verifications CLI", version)]
struct Cli {
    /// Ledger snapshot file (default: ~/.lvx/ledger.json)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage local accounts
    Account {
        #[command(subcommand)]
        subcommand: AccountCommands,
    },
    /// Manage identities
    Identity {
        #[command(subcommand)]
        subcommand: IdentityCommands,
    },
    /// Issue a verification
    Issue {
        #[arg(long)]
        issuer: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        /// Lifetime, e.g. "30d" or "12h"
        #[arg(long)]
        expires_in: Option<String>,
        /// JSON payload stored in the content store
        #[arg(long)]
        payload: Option<String>,
        /// Registry domain of the topic description
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        disable_subverifications: bool,
    },
    /// Confirm a verification as its subject
    Confirm {
        #[arg(long)]
        from: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        id: String,
    },
    /// Reject a verification as its subject or issuer
    Reject {
        #[arg(long)]
        from: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        id: String,
        /// JSON reason stored in the content store
        #[arg(long)]
        reason: Option<String>,
    },
    /// Delete a verification
    Delete {
        #[arg(long)]
        from: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        id: String,
    },
    /// List verifications of a subject on a topic
    List {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
    },
    /// Print nested verifications with warnings as JSON
    Nested {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
    },
    /// Show the trust path of a topic up to its root
    Path {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
    },
    /// Evaluate a topic to a green/yellow/red trust level
    Status {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommands {
    /// Create an account with a local key
    New,
    /// List local accounts
    List,
}

#[derive(Subcommand, Debug)]
enum IdentityCommands {
    /// Register an identity for an account
    Create {
        #[arg(long)]
        account: String,
    },
    /// Link a new identity to a contract
    Contract {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        contract: String,
    },
    /// Resolve the identity of a subject
    Show { subject: String },
}

impl Commands {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Commands::List { .. }
                | Commands::Nested { .. }
                | Commands::Path { .. }
                | Commands::Status { .. }
                | Commands::Account {
                    subcommand: AccountCommands::List
                }
                | Commands::Identity {
                    subcommand: IdentityCommands::Show { .. }
                }
        )
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

struct Session {
    ledger: Arc<MemoryLedger>,
    engine: VerificationsEngine,
    path: PathBuf,
}

impl Session {
    fn open(ledger_path: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let path = match ledger_path {
            Some(p) => p,
            None => default_ledger_path()?,
        };
        let config = match config_path {
            Some(p) => EngineConfig::from_json_file(p)
                .with_context(|| format!("failed to load config {}", p.display()))?,
            None => EngineConfig::default(),
        };
        debug!("using ledger {}", path.display());
        let ledger = Arc::new(
            load_or_create(&path)
                .with_context(|| format!("failed to load ledger {}", path.display()))?,
        );
        let engine = VerificationsEngine::new(config, Backends::from_memory(ledger.clone()))?;
        Ok(Self {
            ledger,
            engine,
            path,
        })
    }

    fn save(&self) -> Result<()> {
        save_ledger(&self.ledger, &self.path)
            .with_context(|| format!("failed to save ledger {}", self.path.display()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let session = Session::open(cli.ledger, cli.config.as_deref())?;
    let mutates = cli.command.mutates();

    match cli.command {
        Commands::Account { subcommand } => match subcommand {
            AccountCommands::New => cmd_account_new(&session)?,
            AccountCommands::List => cmd_account_list(&session),
        },
        Commands::Identity { subcommand } => match subcommand {
            IdentityCommands::Create { account } => cmd_identity_create(&session, &account).await?,
            IdentityCommands::Contract { owner, contract } => {
                cmd_identity_contract(&session, &owner, &contract).await?
            }
            IdentityCommands::Show { subject } => cmd_identity_show(&session, &subject).await?,
        },
        Commands::Issue {
            issuer,
            subject,
            topic,
            expires_in,
            payload,
            domain,
            disable_subverifications,
        } => {
            let mut request =
                VerificationRequest::new(parse_address(&issuer)?, parse_address(&subject)?, parse_topic(&topic)?)
                    .disable_subverifications(disable_subverifications);
            if let Some(d) = expires_in.as_deref() {
                request = request.expires_at(now_secs() + parse_duration_secs(d)?);
            }
            if let Some(p) = payload.as_deref() {
                request = request.payload(parse_json(p)?);
            }
            if let Some(d) = domain {
                request = request.description_domain(d);
            }
            cmd_issue(&session, &request).await?
        }
        Commands::Confirm {
            from,
            subject,
            topic,
            id,
        } => {
            session
                .engine
                .confirm_verification(
                    &parse_address(&from)?,
                    &parse_address(&subject)?,
                    &parse_topic(&topic)?,
                    &parse_claim_id(&id)?,
                )
                .await?;
            println!("Confirmed {id}");
        }
        Commands::Reject {
            from,
            subject,
            topic,
            id,
            reason,
        } => {
            let reason = reason.as_deref().map(parse_json).transpose()?;
            session
                .engine
                .reject_verification(
                    &parse_address(&from)?,
                    &parse_address(&subject)?,
                    &parse_topic(&topic)?,
                    &parse_claim_id(&id)?,
                    reason.as_ref(),
                )
                .await?;
            println!("Rejected {id}");
        }
        Commands::Delete {
            from,
            subject,
            topic,
            id,
        } => {
            session
                .engine
                .delete_verification(
                    &parse_address(&from)?,
                    &parse_address(&subject)?,
                    &parse_topic(&topic)?,
                    &parse_claim_id(&id)?,
                )
                .await?;
            println!("Deleted {id}");
        }
        Commands::List { subject, topic } => cmd_list(&session, &subject, &topic).await?,
        Commands::Nested { subject, topic } => {
            let nested = session
                .engine
                .get_nested_verifications(&parse_address(&subject)?, &parse_topic(&topic)?)
                .await?;
            println!("{}", serde_json::to_string_pretty(nested.as_ref())?);
        }
        Commands::Path { subject, topic } => {
            let path = session
                .engine
                .validate_trust_path(&parse_address(&subject)?, &parse_topic(&topic)?)
                .await?;
            print_path(&path);
        }
        Commands::Status { subject, topic } => {
            let subject = parse_address(&subject)?;
            let topic = parse_topic(&topic)?;
            let computed = session
                .engine
                .get_computed_verification(&subject, &topic)
                .await?;
            let level = ledger_verifications::evaluate(&computed, &ValidationOptions::default());
            println!("Topic:    {}", computed.topic);
            println!("Name:     {}", computed.name);
            println!("Status:   {}", computed.status);
            println!("Level:    {level:?}");
            if !computed.warnings.is_empty() {
                let warnings: Vec<String> = computed.warnings.iter().map(|w| w.to_string()).collect();
                println!("Warnings: {}", warnings.join(", "));
            }
        }
    }

    if mutates {
        session.save()?;
    }
    Ok(())
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_account_new(session: &Session) -> Result<()> {
    let account = session.ledger.create_account()?;
    println!("{account}");
    Ok(())
}

fn cmd_account_list(session: &Session) {
    let accounts = session.ledger.accounts();
    if accounts.is_empty() {
        println!("No accounts in {}", session.path.display());
        return;
    }
    for account in accounts {
        println!("{account}");
    }
}

async fn cmd_identity_create(session: &Session, account: &str) -> Result<()> {
    let account = parse_address(account)?;
    let identity = session.engine.create_identity(&account).await?;
    println!("Identity {identity} created for {account}");
    Ok(())
}

async fn cmd_identity_contract(session: &Session, owner: &str, contract: &str) -> Result<()> {
    let owner = parse_address(owner)?;
    let contract = parse_address(contract)?;
    let identity = session
        .engine
        .create_contract_identity(&owner, &contract)
        .await?;
    println!("Identity {identity} linked to {contract}");
    Ok(())
}

async fn cmd_identity_show(session: &Session, subject: &str) -> Result<()> {
    let subject = parse_address(subject)?;
    let resolved = session.engine.resolve_identity(&subject).await?;
    println!("Subject:  {subject}");
    println!("Identity: {}", resolved.identity);
    println!("Type:     {:?}", resolved.subject_type);
    Ok(())
}

async fn cmd_issue(session: &Session, request: &VerificationRequest) -> Result<()> {
    let id = session.engine.set_verification(request).await?;
    println!("Issued {}", request.topic);
    println!("  ID:      {id}");
    println!("  Issuer:  {}", request.issuer);
    println!("  Subject: {}", request.subject);
    match request.expiration {
        Some(exp) => println!("  Expires: {}", secs_to_rfc3339(exp)),
        None => println!("  Expires: never"),
    }
    Ok(())
}

async fn cmd_list(session: &Session, subject: &str, topic: &str) -> Result<()> {
    let verifications = session
        .engine
        .get_verifications(&parse_address(subject)?, &parse_topic(topic)?)
        .await?;
    if verifications.is_empty() {
        println!("No verifications on {topic}");
        return Ok(());
    }

    println!("{:<68} {:<10} {:<44} CREATED", "ID", "STATUS", "ISSUER");
    println!("{}", "-".repeat(150));
    for v in verifications.iter() {
        let status = format!("{:?}", v.status).to_lowercase();
        let flag = if v.valid { "" } else { " (invalid)" };
        println!(
            "{:<68} {:<10} {:<44} {}{flag}",
            v.id.to_string(),
            status,
            v.issuer.to_string(),
            secs_to_rfc3339(v.creation_date)
        );
    }
    Ok(())
}

fn print_path(path: &TrustPath) {
    if path.is_empty() {
        println!("No verification found");
        return;
    }
    for (depth, link) in path.links.iter().enumerate() {
        let issuer = link
            .issuer
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}{} [{}] issued by {issuer}",
            "  ".repeat(depth),
            link.topic,
            link.status
        );
        for warning in &link.warnings {
            println!("{}  ! {warning}", "  ".repeat(depth));
        }
    }
    println!();
    println!("Reaches root: {}", path.reaches_root());
    println!("Intact:       {}", path.is_intact());
}
