//! JSON snapshots of a running machine.

use crate::constants::{Word, MEMORY_WORDS, REGISTER_COUNT};
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

pub const SNAPSHOT_MAGIC: &str = "synacor.snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub magic: String,
    pub version: u32,
    #[serde(default)]
    pub created: String,
    pub pc: Word,
    #[serde(default)]
    pub halted: bool,
    #[serde(default)]
    pub instruction_count: u64,
    pub registers: [Word; REGISTER_COUNT],
    #[serde(default)]
    pub stack: Vec<Word>,
    pub program_len: usize,
    /// Memory words up to the last non-zero word; the rest is zero.
    #[serde(default)]
    pub memory: Vec<Word>,
}

impl Snapshot {
    pub fn validate(&self) -> Result<()> {
        if self.magic != SNAPSHOT_MAGIC || self.version != SNAPSHOT_VERSION {
            return Err(CoreError::InvalidSnapshot(
                "snapshot magic/version mismatch".to_string(),
            ));
        }
        if self.memory.len() > MEMORY_WORDS {
            return Err(CoreError::InvalidSnapshot(format!(
                "memory payload too long (expected at most {MEMORY_WORDS}, got {})",
                self.memory.len()
            )));
        }
        if self.program_len > MEMORY_WORDS {
            return Err(CoreError::InvalidSnapshot(format!(
                "program length {} exceeds memory",
                self.program_len
            )));
        }
        Ok(())
    }
}

pub fn now_timestamp() -> String {
    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => format!("{}Z", duration.as_secs()),
        Err(_) => "0Z".to_string(),
    }
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    snapshot.validate()?;
    Ok(snapshot)
}
