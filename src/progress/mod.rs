//! Progress ledger
//!
//! Durable per-child record of stars, tier, and per-letter mastery.
//! Reads always come from the in-memory snapshot; writes to disk are
//! explicit and batched (`persist`), called by the session controller at
//! pause and session end. The on-disk format is one JSON file per
//! profile, and unknown fields are preserved across load/persist so a
//! newer schema is never silently truncated by an older build.

use crate::curriculum::{LetterId, Tier};
use crate::{EngineError, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-letter mastery counters
///
/// All counters are monotonic; `correct <= attempts` always holds.
/// Explore-mode exposures are tracked separately so they can contribute
/// to the mastery score at reduced weight without touching the graded
/// counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    /// Graded attempts (Find-the-Letter answers, word confirmations)
    pub attempts: u64,

    /// Graded correct answers
    pub correct: u64,

    /// Explore-mode exposures
    #[serde(default)]
    pub explored: u64,

    /// Unix seconds of the most recent outcome, 0 if never seen
    #[serde(default)]
    pub last_seen: i64,

    /// Unknown fields from newer schemas, re-written unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Persisted per-profile progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub profile_id: String,

    #[serde(default)]
    pub per_letter_mastery: BTreeMap<String, MasteryRecord>,

    #[serde(default)]
    pub current_tier: Tier,

    #[serde(default)]
    pub total_stars: u64,

    pub created_at: i64,
    pub updated_at: i64,

    /// Unknown fields from newer schemas, re-written unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Handle to one profile's progress
///
/// Explicitly passed into the session controller and exercise engine,
/// never ambient state, so profiles and tests stay isolated.
pub struct ProgressLedger {
    dir: PathBuf,
    snapshot: ProgressSnapshot,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn letter_key(id: LetterId) -> String {
    id.to_string()
}

/// Whether an id is usable as a profile file stem
///
/// The id becomes part of the file name, so path separators, leading
/// dots, and other non-name characters would escape the profiles
/// directory.
pub fn valid_profile_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
}

impl ProgressLedger {
    /// Default storage directory for profile files
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bokstavsresan")
            .join("profiles")
    }

    fn profile_path(dir: &Path, profile_id: &str) -> PathBuf {
        dir.join(format!("{}.json", profile_id))
    }

    /// Load a profile's stored progress
    ///
    /// Fails with `InvalidProfileId` for an id unusable as a file
    /// name, `ProfileNotFound` when no file exists, and
    /// `StorageCorrupt` when the file cannot be read, parsed, or
    /// violates the counter invariants.
    pub fn load(dir: &Path, profile_id: &str) -> Result<Self> {
        if !valid_profile_id(profile_id) {
            return Err(EngineError::InvalidProfileId(profile_id.to_string()));
        }
        let path = Self::profile_path(dir, profile_id);
        debug!("Loading progress from {:?}", path);

        if !path.exists() {
            return Err(EngineError::ProfileNotFound(profile_id.to_string()));
        }

        let raw = fs::read_to_string(&path)
            .map_err(|e| EngineError::StorageCorrupt(format!("read {:?}: {}", path, e)))?;
        let snapshot: ProgressSnapshot = serde_json::from_str(&raw)
            .map_err(|e| EngineError::StorageCorrupt(format!("parse {:?}: {}", path, e)))?;

        if snapshot.profile_id != profile_id {
            return Err(EngineError::StorageCorrupt(format!(
                "profile id mismatch: file says '{}', expected '{}'",
                snapshot.profile_id, profile_id
            )));
        }
        for (letter, record) in &snapshot.per_letter_mastery {
            if record.correct > record.attempts {
                return Err(EngineError::StorageCorrupt(format!(
                    "letter '{}' has correct {} > attempts {}",
                    letter, record.correct, record.attempts
                )));
            }
        }

        info!(
            "Loaded progress for '{}': {} letters tracked, tier {}, {} stars",
            profile_id,
            snapshot.per_letter_mastery.len(),
            snapshot.current_tier,
            snapshot.total_stars
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            snapshot,
        })
    }

    /// Build a zeroed in-memory snapshot for a new profile
    ///
    /// Nothing touches disk until `persist`.
    pub fn fresh(dir: &Path, profile_id: &str) -> Self {
        let now = now_secs();
        Self {
            dir: dir.to_path_buf(),
            snapshot: ProgressSnapshot {
                profile_id: profile_id.to_string(),
                per_letter_mastery: BTreeMap::new(),
                current_tier: Tier::Easy,
                total_stars: 0,
                created_at: now,
                updated_at: now,
                extra: Map::new(),
            },
        }
    }

    /// Load a profile, falling back to a fresh snapshot
    ///
    /// This is the session controller's recovery path: a missing profile
    /// is simply new, and a corrupt one is replaced in memory with a
    /// child-appropriate warning returned for the UI. Never an error.
    pub fn open(dir: &Path, profile_id: &str) -> (Self, Option<String>) {
        match Self::load(dir, profile_id) {
            Ok(ledger) => (ledger, None),
            Err(EngineError::ProfileNotFound(_)) => {
                info!("No stored progress for '{}', starting fresh", profile_id);
                (Self::fresh(dir, profile_id), None)
            }
            Err(e) => {
                warn!("Stored progress for '{}' unusable: {}", profile_id, e);
                (
                    Self::fresh(dir, profile_id),
                    Some("We couldn't find your old stars, so we're starting a new journey!".to_string()),
                )
            }
        }
    }

    /// The in-memory snapshot
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    /// Mastery record for a letter, if any outcome was ever recorded
    pub fn record(&self, id: LetterId) -> Option<&MasteryRecord> {
        self.snapshot.per_letter_mastery.get(&letter_key(id))
    }

    /// Record one graded attempt for a letter
    pub fn record_outcome(&mut self, id: LetterId, correct: bool) {
        let record = self
            .snapshot
            .per_letter_mastery
            .entry(letter_key(id))
            .or_default();
        record.attempts += 1;
        if correct {
            record.correct += 1;
        }
        record.last_seen = now_secs();
        debug!(
            "Outcome for '{}': correct={} ({}/{})",
            id, correct, record.correct, record.attempts
        );
    }

    /// Record one Explore-mode exposure for a letter
    pub fn record_explored(&mut self, id: LetterId) {
        let record = self
            .snapshot
            .per_letter_mastery
            .entry(letter_key(id))
            .or_default();
        record.explored += 1;
        record.last_seen = now_secs();
        debug!("Explored '{}' ({} exposures)", id, record.explored);
    }

    /// Mastery score for a letter, in [0, 1]
    ///
    /// `(correct + w·explored) / (attempts + w·explored)` where `w` is
    /// the configured explore weight. An unseen letter scores 0: unknown
    /// is treated as needs-practice, not mastered.
    pub fn mastery_score(&self, id: LetterId, explore_weight: f32) -> f32 {
        let Some(record) = self.record(id) else {
            return 0.0;
        };
        let weighted = explore_weight as f64 * record.explored as f64;
        let denom = record.attempts as f64 + weighted;
        if denom <= 0.0 {
            return 0.0;
        }
        (((record.correct as f64 + weighted) / denom) as f32).clamp(0.0, 1.0)
    }

    /// Graded attempts recorded for a letter
    pub fn attempts(&self, id: LetterId) -> u64 {
        self.record(id).map(|r| r.attempts).unwrap_or(0)
    }

    /// Total stars across all sessions
    pub fn stars(&self) -> u64 {
        self.snapshot.total_stars
    }

    /// Add stars earned during a session
    pub fn add_stars(&mut self, stars: u64) {
        self.snapshot.total_stars += stars;
    }

    /// Current difficulty tier
    pub fn tier(&self) -> Tier {
        self.snapshot.current_tier
    }

    /// Set the current difficulty tier
    ///
    /// Level-ups move one step; external reset is the only way down.
    pub fn set_tier(&mut self, tier: Tier) {
        self.snapshot.current_tier = tier;
    }

    /// Reset the tier to easy (explicit external reset)
    pub fn reset_tier(&mut self) {
        info!(
            "Tier reset to easy for '{}' (was {})",
            self.snapshot.profile_id, self.snapshot.current_tier
        );
        self.snapshot.current_tier = Tier::Easy;
    }

    /// Durably write the snapshot to disk
    ///
    /// Writes a temp file in the profile directory, flushes it, then
    /// renames over the final path, so a failure mid-write never leaves
    /// a partial record behind. Fails with `StorageWriteFailed`.
    pub fn persist(&mut self) -> Result<()> {
        if !valid_profile_id(&self.snapshot.profile_id) {
            return Err(EngineError::InvalidProfileId(
                self.snapshot.profile_id.clone(),
            ));
        }
        self.snapshot.updated_at = now_secs();

        let path = Self::profile_path(&self.dir, &self.snapshot.profile_id);
        debug!("Persisting progress to {:?}", path);

        fs::create_dir_all(&self.dir)
            .map_err(|e| EngineError::StorageWriteFailed(format!("create {:?}: {}", self.dir, e)))?;

        let json = serde_json::to_string_pretty(&self.snapshot)
            .map_err(|e| EngineError::StorageWriteFailed(format!("encode: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)
                .map_err(|e| EngineError::StorageWriteFailed(format!("create {:?}: {}", tmp, e)))?;
            file.write_all(json.as_bytes())
                .map_err(|e| EngineError::StorageWriteFailed(format!("write {:?}: {}", tmp, e)))?;
            file.sync_all()
                .map_err(|e| EngineError::StorageWriteFailed(format!("sync {:?}: {}", tmp, e)))?;
        }
        fs::rename(&tmp, &path)
            .map_err(|e| EngineError::StorageWriteFailed(format!("rename to {:?}: {}", path, e)))?;

        info!("Persisted progress for '{}'", self.snapshot.profile_id);
        Ok(())
    }
}
