//! Ledger snapshot files.
//!
//! The in-memory ledger is persisted as one JSON document:
//!
//! ```json
//! { "version": 1, "ledger": { ... LedgerState ... } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{VerificationError, Result};
use crate::memory::{LedgerState, MemoryLedger};

// ── File format constants ─────────────────────────────────────────────────────

const LEDGER_FILE_VERSION: u32 = 1;

// ── On-disk structures ────────────────────────────────────────────────────────

/// Wrapper written to disk for a ledger snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    /// Format version number.
    version: u32,
    /// The stored ledger state.
    ledger: LedgerState,
}

/// Save a snapshot of `ledger` to `path`.
///
/// # Errors
///
/// Returns `VerificationError::SerializationError` if serialization fails, or
/// `VerificationError::Io` for filesystem errors.
pub fn save_ledger(ledger: &MemoryLedger, path: &Path) -> Result<()> {
    let file = LedgerFile {
        version: LEDGER_FILE_VERSION,
        ledger: ledger.snapshot()?,
    };
    let json = serde_json::to_string_pretty(&file)?;
    write_atomic(path, json.as_bytes())
}

/// Load a ledger snapshot from `path`.
///
/// # Errors
///
/// Returns `VerificationError::InvalidFileFormat` for malformed files or an
/// unsupported version, or `VerificationError::Io` for filesystem errors.
pub fn load_ledger(path: &Path) -> Result<MemoryLedger> {
    let raw = std::fs::read_to_string(path)?;
    let file: LedgerFile = serde_json::from_str(&raw)
        .map_err(|e| VerificationError::InvalidFileFormat(format!("{}: {e}", path.display())))?;
    if file.version != LEDGER_FILE_VERSION {
        return Err(VerificationError::InvalidFileFormat(format!(
            "unsupported ledger file version {}",
            file.version
        )));
    }
    Ok(MemoryLedger::from_state(file.ledger))
}

/// Load `path` if it exists, otherwise start an empty ledger.
pub fn load_or_create(path: &Path) -> Result<MemoryLedger> {
    if path.exists() {
        load_ledger(path)
    } else {
        Ok(MemoryLedger::new())
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Write `data` to `path` through a sibling temporary file and a rename.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
