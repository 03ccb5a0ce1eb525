//! Session controller
//!
//! Lifecycle glue: wires a curriculum snapshot, a progress ledger, an
//! exercise engine, and a speech queue together for one play session.
//! Pause is a durability checkpoint (the child may not come back);
//! session end folds session stars into the ledger and persists.

use crate::config::Config;
use crate::curriculum::{Curriculum, LetterId, Tier};
use crate::engine::{ExerciseEngine, ExerciseMode, Feedback, Presented, SessionState};
use crate::progress::{valid_profile_id, ProgressLedger};
use crate::speech::{SpeechQueue, Synth};
use crate::{EngineError, Result};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// UI boundary for engine events
///
/// Warnings must already be child-appropriate; nothing technical
/// reaches this trait.
pub trait UiSink: Send {
    /// A new item was selected and presented
    fn on_item_presented(&mut self, presented: &Presented);

    /// An answer was scored
    fn on_feedback(&mut self, feedback: &Feedback);

    /// The difficulty tier advanced
    fn on_level_up(&mut self, tier: Tier);

    /// A recoverable problem the child should hear about
    fn on_warning(&mut self, message: &str);
}

/// Sink that discards all events
pub struct NullSink;

impl UiSink for NullSink {
    fn on_item_presented(&mut self, _presented: &Presented) {}
    fn on_feedback(&mut self, _feedback: &Feedback) {}
    fn on_level_up(&mut self, _tier: Tier) {}
    fn on_warning(&mut self, _message: &str) {}
}

/// Creates sessions and enforces one active session per profile
pub struct SessionManager {
    curriculum: Arc<Curriculum>,
    config: Config,
    data_dir: PathBuf,
    active: Arc<Mutex<HashSet<String>>>,
}

impl SessionManager {
    /// Manager using the default profile storage directory
    pub fn new(curriculum: Arc<Curriculum>, config: Config) -> Self {
        Self::with_data_dir(curriculum, config, ProgressLedger::default_dir())
    }

    /// Manager with an explicit profile storage directory
    pub fn with_data_dir(curriculum: Arc<Curriculum>, config: Config, data_dir: PathBuf) -> Self {
        Self {
            curriculum,
            config,
            data_dir,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Start a session for a profile
    ///
    /// Refuses with `SessionAlreadyActive` (mutating nothing) when the
    /// profile already has a running session. Missing stored progress
    /// starts fresh; corrupt progress starts fresh with a sink warning.
    pub fn start_session(
        &self,
        profile_id: &str,
        mode: ExerciseMode,
        synth: Box<dyn Synth>,
        mut sink: Box<dyn UiSink>,
    ) -> Result<Session> {
        if !valid_profile_id(profile_id) {
            return Err(EngineError::InvalidProfileId(profile_id.to_string()));
        }
        {
            let mut active = self.lock_active();
            if !active.insert(profile_id.to_string()) {
                return Err(EngineError::SessionAlreadyActive(profile_id.to_string()));
            }
        }

        let (ledger, warning) = ProgressLedger::open(&self.data_dir, profile_id);
        if let Some(message) = warning {
            sink.on_warning(&message);
        }

        let engine = ExerciseEngine::new(mode, ledger.tier(), self.config.progression());
        let queue = SpeechQueue::new(synth);

        info!(
            "Session started for '{}' in {:?} mode at {} tier",
            profile_id,
            mode,
            ledger.tier()
        );

        Ok(Session {
            profile_id: profile_id.to_string(),
            curriculum: Arc::clone(&self.curriculum),
            ledger,
            engine,
            queue,
            sink,
            active: Arc::clone(&self.active),
            persist_retries: self.config.persist_retries(),
            paused: false,
            degraded: false,
            folded_stars: 0,
        })
    }

    /// Explicitly reset a profile's tier back to easy
    ///
    /// The only way a tier ever goes down. Refused while the profile
    /// has an active session.
    pub fn reset_profile_tier(&self, profile_id: &str) -> Result<()> {
        if !valid_profile_id(profile_id) {
            return Err(EngineError::InvalidProfileId(profile_id.to_string()));
        }
        if self.lock_active().contains(profile_id) {
            return Err(EngineError::SessionAlreadyActive(profile_id.to_string()));
        }
        let (mut ledger, _warning) = ProgressLedger::open(&self.data_dir, profile_id);
        ledger.reset_tier();
        ledger.persist()
    }

    /// Whether a profile currently has an active session
    pub fn is_active(&self, profile_id: &str) -> bool {
        self.lock_active().contains(profile_id)
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One active play session
///
/// Owns the ledger, engine, and speech queue; exactly one per profile
/// at a time. Dropping the session releases the profile slot.
pub struct Session {
    profile_id: String,
    curriculum: Arc<Curriculum>,
    ledger: ProgressLedger,
    engine: ExerciseEngine,
    queue: SpeechQueue,
    sink: Box<dyn UiSink>,
    active: Arc<Mutex<HashSet<String>>>,
    persist_retries: u32,
    paused: bool,
    degraded: bool,
    /// Session stars already folded into the ledger at a checkpoint
    folded_stars: u64,
}

impl Session {
    /// Profile this session belongs to
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    /// Session-scoped state (streak, stars, tier, mode)
    pub fn state(&self) -> &SessionState {
        self.engine.session()
    }

    /// The progress ledger backing this session
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Whether speech has failed and the session runs visual-only
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether the session is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Select and present the next exercise item
    pub fn next_item(&mut self) -> Result<Presented> {
        self.ensure_running()?;
        let presented = self
            .engine
            .begin_item(&self.curriculum, &self.ledger, &self.queue)?;
        self.sink.on_item_presented(&presented);
        self.check_degraded();
        Ok(presented)
    }

    /// UI command: the child tapped a letter in Explore mode
    pub fn request_explore(&mut self, id: LetterId) -> Result<Feedback> {
        self.ensure_running()?;
        let feedback = self
            .engine
            .explore(id, &self.curriculum, &mut self.ledger, &self.queue)?;
        self.sink.on_feedback(&feedback);
        self.check_degraded();
        Ok(feedback)
    }

    /// UI command: the child picked a letter in Find-the-Letter
    pub fn select_letter(&mut self, id: LetterId) -> Result<Feedback> {
        self.ensure_running()?;
        let feedback =
            self.engine
                .select_letter(id, &self.curriculum, &mut self.ledger, &self.queue)?;
        self.emit_feedback(&feedback);
        Ok(feedback)
    }

    /// UI command: the child confirmed a letter position in a word
    pub fn confirm_letter_in_word(&mut self, pos: usize, id: LetterId) -> Result<Feedback> {
        self.ensure_running()?;
        let feedback =
            self.engine
                .confirm_letter(pos, id, &self.curriculum, &mut self.ledger, &self.queue)?;
        self.emit_feedback(&feedback);
        Ok(feedback)
    }

    /// Pause the session
    ///
    /// Silences all speech and persists immediately: the child may not
    /// return, so pause is a durability checkpoint. Idempotent.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        info!("Session paused for '{}'", self.profile_id);
        self.queue.cancel_all();
        self.fold_and_persist();
        self.paused = true;
    }

    /// Resume a paused session
    pub fn resume(&mut self) {
        if self.paused {
            info!("Session resumed for '{}'", self.profile_id);
            self.paused = false;
        }
    }

    /// End the session
    ///
    /// Folds session stars into the ledger and persists. Consumes the
    /// session; the profile slot frees on drop.
    pub fn end(mut self) {
        info!(
            "Session ended for '{}': {} stars, streak {}",
            self.profile_id,
            self.engine.session().stars,
            self.engine.session().streak
        );
        self.queue.cancel_all();
        self.fold_and_persist();
    }

    fn ensure_running(&self) -> Result<()> {
        if self.paused {
            return Err(EngineError::Session("session is paused".to_string()));
        }
        Ok(())
    }

    fn emit_feedback(&mut self, feedback: &Feedback) {
        self.sink.on_feedback(feedback);
        if let Some(tier) = feedback.level_up {
            self.sink.on_level_up(tier);
        }
        self.check_degraded();
    }

    /// Surface synthesis failures as a degraded-mode warning
    ///
    /// Answers are still accepted; the exercise continues visual-only.
    fn check_degraded(&mut self) {
        let failures = self.queue.take_failures();
        if failures == 0 {
            return;
        }
        warn!(
            "{} utterance(s) failed for '{}'; continuing visual-only",
            failures, self.profile_id
        );
        if !self.degraded {
            self.degraded = true;
            self.sink
                .on_warning("The sound is taking a break, but you can keep playing!");
        }
    }

    /// Fold not-yet-folded session stars into the ledger, then persist
    fn fold_and_persist(&mut self) {
        let stars = self.engine.session().stars as u64;
        let delta = stars.saturating_sub(self.folded_stars);
        if delta > 0 {
            self.ledger.add_stars(delta);
            self.folded_stars = stars;
        }

        for attempt in 1..=self.persist_retries {
            match self.ledger.persist() {
                Ok(()) => {
                    debug!("Persisted on attempt {}", attempt);
                    return;
                }
                Err(e) => {
                    warn!(
                        "Persist attempt {}/{} failed for '{}': {}",
                        attempt, self.persist_retries, self.profile_id, e
                    );
                }
            }
        }

        // Data loss as last resort, but never silent
        error!(
            "Giving up persisting progress for '{}' after {} attempts",
            self.profile_id, self.persist_retries
        );
        self.sink
            .on_warning("We couldn't save your stars this time, but keep playing!");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.profile_id);
        debug!("Session slot released for '{}'", self.profile_id);
    }
}
