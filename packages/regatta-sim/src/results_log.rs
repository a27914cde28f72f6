//! results_log.rs — SHA-256 chained results ledger
//!
//! Every legitimate finish (and the premature ones, for the record) is
//! appended as a JSON line whose hash covers the previous block's hash.
//! Editing or dropping any line breaks the chain.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use regatta_types::RaceEvent;

// ── Entry kinds ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    SessionStarted,
    BoatFinished,
    PrematureFinish,
    RaceCompleted,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

// ── Block ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBlock {
    pub block_seq: u64,
    pub session_id: String,
    pub timestamp_ms: u64,
    /// Hash of the previous block; 64 zeros for the first
    pub prev_hash: String,
    pub kind: EntryKind,
    pub payload_json: String,
    pub block_hash: String,
}

impl ResultBlock {
    fn compute_hash(prev_hash: &str, timestamp_ms: u64, kind: EntryKind, payload_json: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(timestamp_ms.to_le_bytes());
        hasher.update(kind.to_string().as_bytes());
        hasher.update(payload_json.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self) -> bool {
        Self::compute_hash(&self.prev_hash, self.timestamp_ms, self.kind, &self.payload_json) == self.block_hash
    }
}

/// Every block self-consistent and linked to its predecessor
pub fn verify_chain(blocks: &[ResultBlock]) -> bool {
    let mut prev: &str = GENESIS_HASH;
    for block in blocks {
        if !block.verify() || block.prev_hash != prev {
            return false;
        }
        prev = block.block_hash.as_str();
    }
    true
}

/// Outcome of re-reading a ledger file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChainAudit {
    pub sessions: usize,
    pub broken: usize,
    pub unreadable: usize,
}

fn close_run(run: &mut Vec<ResultBlock>, audit: &mut ChainAudit) {
    if run.is_empty() {
        return;
    }
    audit.sessions += 1;
    if !verify_chain(run) {
        audit.broken += 1;
    }
    run.clear();
}

/// Verify every session chain in a ledger's JSON lines. Each run restarts
/// from genesis, so consecutive blocks are grouped by session id.
pub fn audit_lines(text: &str) -> ChainAudit {
    let mut audit = ChainAudit::default();
    let mut run: Vec<ResultBlock> = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(block) = serde_json::from_str::<ResultBlock>(line) else {
            audit.unreadable += 1;
            continue;
        };
        if run.last().is_some_and(|b| b.session_id != block.session_id) {
            close_run(&mut run, &mut audit);
        }
        run.push(block);
    }
    close_run(&mut run, &mut audit);
    audit
}

/// Audit the ledger at `path`. A missing file is an empty ledger.
pub async fn audit_file(path: &Path) -> std::io::Result<ChainAudit> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(audit_lines(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ChainAudit::default()),
        Err(e) => Err(e),
    }
}

// ── Ledger ────────────────────────────────────────────────────────────────────

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub struct ResultLedger {
    session_id: String,
    block_seq: u64,
    last_hash: String,
    /// `None` logs blocks to tracing only
    path: Option<PathBuf>,
}

impl ResultLedger {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            block_seq: 0,
            last_hash: GENESIS_HASH.to_string(),
            path,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Build and chain the next block without writing it
    fn seal(&mut self, kind: EntryKind, payload: serde_json::Value) -> ResultBlock {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let payload_json = payload.to_string();
        let block_hash = ResultBlock::compute_hash(&self.last_hash, timestamp_ms, kind, &payload_json);
        let block = ResultBlock {
            block_seq: self.block_seq,
            session_id: self.session_id.clone(),
            timestamp_ms,
            prev_hash: std::mem::replace(&mut self.last_hash, block_hash.clone()),
            kind,
            payload_json,
            block_hash,
        };
        self.block_seq += 1;
        block
    }

    /// Append one block. Write failures are logged, never propagated.
    pub async fn append(&mut self, kind: EntryKind, payload: serde_json::Value) -> ResultBlock {
        let block = self.seal(kind, payload);
        debug_assert!(block.verify());

        let Some(path) = &self.path else {
            info!("Ledger[{}]: {} — {}", block.block_seq, block.kind, block.block_hash);
            return block;
        };
        let line = match serde_json::to_string(&block) {
            Ok(l) => format!("{l}\n"),
            Err(e) => {
                warn!("Ledger: failed to serialize block: {e}");
                return block;
            }
        };
        match OpenOptions::new().create(true).append(true).open(path).await {
            Ok(mut f) => {
                if let Err(e) = f.write_all(line.as_bytes()).await {
                    warn!("Ledger: write failed: {e}");
                }
            }
            Err(e) => warn!("Ledger: could not open {}: {e}", path.display()),
        }
        block
    }

    /// Record the race events worth keeping; everything else is ignored.
    pub async fn record_event(&mut self, event: &RaceEvent) {
        match event {
            RaceEvent::BoatFinished(record) => {
                let payload = serde_json::to_value(record).unwrap_or_default();
                self.append(EntryKind::BoatFinished, payload).await;
            }
            RaceEvent::PrematureFinish { boat, from } => {
                let payload = serde_json::json!({ "boat": boat, "from": from });
                self.append(EntryKind::PrematureFinish, payload).await;
            }
            RaceEvent::PhaseChanged { to: regatta_types::RacePhase::Finished, .. } => {
                self.append(EntryKind::RaceCompleted, serde_json::json!({})).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_chain_from_genesis() {
        let mut ledger = ResultLedger::new(None);
        let a = ledger.seal(EntryKind::SessionStarted, serde_json::json!({ "venue": "solent" }));
        let b = ledger.seal(
            EntryKind::BoatFinished,
            serde_json::json!({ "userId": "alice", "boatNumber": 1, "finishPosition": 1, "finishTimeMs": 61000 }),
        );
        assert_eq!(a.prev_hash, GENESIS_HASH);
        assert_eq!(b.prev_hash, a.block_hash);
        assert_eq!(b.block_seq, 1);
        assert_eq!(a.block_hash.len(), 64);
        assert!(verify_chain(&[a, b]));
    }

    #[test]
    fn tampering_breaks_the_chain() {
        let mut ledger = ResultLedger::new(None);
        let a = ledger.seal(EntryKind::SessionStarted, serde_json::json!({}));
        let mut b = ledger.seal(EntryKind::BoatFinished, serde_json::json!({ "finishPosition": 2 }));
        b.payload_json = serde_json::json!({ "finishPosition": 1 }).to_string();
        assert!(!b.verify());
        assert!(!verify_chain(&[a.clone(), b]));

        // Dropping a block is detected too
        let c = ledger.seal(EntryKind::RaceCompleted, serde_json::json!({}));
        assert!(!verify_chain(&[a, c]));
    }

    #[test]
    fn audit_checks_each_session_separately() {
        let line = |b: &ResultBlock| serde_json::to_string(b).unwrap();
        let mut first = ResultLedger::new(None);
        let a1 = first.seal(EntryKind::SessionStarted, serde_json::json!({}));
        let a2 = first.seal(EntryKind::RaceCompleted, serde_json::json!({}));
        let mut second = ResultLedger::new(None);
        let b1 = second.seal(EntryKind::SessionStarted, serde_json::json!({}));
        let mut b2 = second.seal(EntryKind::BoatFinished, serde_json::json!({ "finishPosition": 2 }));

        let clean = [line(&a1), line(&a2), line(&b1), line(&b2)].join("\n");
        assert_eq!(audit_lines(&clean), ChainAudit { sessions: 2, broken: 0, unreadable: 0 });

        b2.payload_json = serde_json::json!({ "finishPosition": 1 }).to_string();
        let tampered = [line(&a1), line(&a2), line(&b1), line(&b2), "not json".to_string()].join("\n");
        assert_eq!(audit_lines(&tampered), ChainAudit { sessions: 2, broken: 1, unreadable: 1 });
        assert_eq!(audit_lines(""), ChainAudit::default());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        assert_ne!(ResultLedger::new(None).session_id(), ResultLedger::new(None).session_id());
    }
}
