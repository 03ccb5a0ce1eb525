//! Session controller tests
//!
//! Covers the one-session-per-profile rule, pause as a durability
//! checkpoint, star folding at session end, and the recovery warnings
//! surfaced through the UI sink.

use bokstavsresan::config::Config;
use bokstavsresan::curriculum::{Curriculum, Tier};
use bokstavsresan::engine::{ExerciseMode, Feedback, Item, Presented};
use bokstavsresan::progress::ProgressLedger;
use bokstavsresan::session::{SessionManager, UiSink};
use bokstavsresan::speech::backends::null::NullSynth;
use bokstavsresan::EngineError;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Sink that records warnings and level-ups for assertions
#[derive(Clone, Default)]
struct RecordingSink {
    warnings: Arc<Mutex<Vec<String>>>,
    level_ups: Arc<Mutex<Vec<Tier>>>,
}

impl UiSink for RecordingSink {
    fn on_item_presented(&mut self, _presented: &Presented) {}
    fn on_feedback(&mut self, _feedback: &Feedback) {}
    fn on_level_up(&mut self, tier: Tier) {
        self.level_ups.lock().unwrap().push(tier);
    }
    fn on_warning(&mut self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

fn manager(data_dir: &Path) -> SessionManager {
    let _ = env_logger::builder().is_test(true).try_init();
    let curriculum = Arc::new(Curriculum::load().unwrap());
    let config = Config::load_from(data_dir.join("test.cfg")).unwrap();
    SessionManager::with_data_dir(curriculum, config, data_dir.to_path_buf())
}

#[test]
fn test_second_session_for_same_profile_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let session = manager
        .start_session(
            "elsa",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();
    assert!(manager.is_active("elsa"));

    match manager.start_session(
        "elsa",
        ExerciseMode::FindLetter,
        Box::new(NullSynth::instant()),
        Box::new(RecordingSink::default()),
    ) {
        Err(EngineError::SessionAlreadyActive(id)) => assert_eq!(id, "elsa"),
        _ => panic!("expected SessionAlreadyActive"),
    }

    // A different profile is unaffected
    let other = manager
        .start_session(
            "olle",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();

    session.end();
    other.end();
    assert!(!manager.is_active("elsa"));

    // The slot is free again
    manager
        .start_session(
            "elsa",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();
}

#[test]
fn test_dropping_a_session_frees_the_profile_slot() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    {
        let _session = manager
            .start_session(
                "drops",
                ExerciseMode::Explore,
                Box::new(NullSynth::instant()),
                Box::new(RecordingSink::default()),
            )
            .unwrap();
        assert!(manager.is_active("drops"));
    }
    assert!(!manager.is_active("drops"));
}

#[test]
fn test_pause_persists_and_blocks_commands() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let mut session = manager
        .start_session(
            "paus",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();

    session.request_explore('A').unwrap();
    session.request_explore('B').unwrap();
    session.pause();
    assert!(session.is_paused());

    // The checkpoint is already on disk
    let stored = ProgressLedger::load(dir.path(), "paus").unwrap();
    assert_eq!(stored.record('A').unwrap().explored, 1);
    assert_eq!(stored.record('B').unwrap().explored, 1);

    assert!(session.request_explore('C').is_err());

    session.resume();
    assert!(!session.is_paused());
    session.request_explore('C').unwrap();
}

#[test]
fn test_end_folds_session_stars_into_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let mut session = manager
        .start_session(
            "stjärna",
            ExerciseMode::FindLetter,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();

    for _ in 0..5 {
        let presented = session.next_item().unwrap();
        let target = match presented.item {
            Item::Letter(id) => id,
            _ => panic!("expected a letter round"),
        };
        let feedback = session.select_letter(target).unwrap();
        assert!(feedback.correct);
    }
    assert_eq!(session.state().stars, 1);
    session.end();

    let stored = ProgressLedger::load(dir.path(), "stjärna").unwrap();
    assert_eq!(stored.stars(), 1);
}

#[test]
fn test_pause_then_end_does_not_double_count_stars() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let mut session = manager
        .start_session(
            "dubbel",
            ExerciseMode::FindLetter,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();

    for _ in 0..5 {
        let presented = session.next_item().unwrap();
        let target = match presented.item {
            Item::Letter(id) => id,
            _ => panic!("expected a letter round"),
        };
        session.select_letter(target).unwrap();
    }
    session.pause();
    session.resume();
    session.end();

    let stored = ProgressLedger::load(dir.path(), "dubbel").unwrap();
    assert_eq!(stored.stars(), 1);
}

#[test]
fn test_corrupt_profile_starts_fresh_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("skadad.json"), "not json at all").unwrap();
    let manager = manager(dir.path());

    let sink = RecordingSink::default();
    let warnings = Arc::clone(&sink.warnings);
    let session = manager
        .start_session(
            "skadad",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(sink),
        )
        .unwrap();

    assert_eq!(warnings.lock().unwrap().len(), 1);
    assert_eq!(session.ledger().stars(), 0);
    session.end();
}

#[test]
fn test_persist_failure_warns_instead_of_crashing() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the profile directory should be
    let blocked = dir.path().join("blocked");
    fs::write(&blocked, "").unwrap();

    let curriculum = Arc::new(Curriculum::load().unwrap());
    let config = Config::load_from(dir.path().join("test.cfg")).unwrap();
    let manager = SessionManager::with_data_dir(curriculum, config, blocked.join("profiles"));

    let sink = RecordingSink::default();
    let warnings = Arc::clone(&sink.warnings);
    let mut session = manager
        .start_session(
            "pest",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(sink),
        )
        .unwrap();

    session.request_explore('A').unwrap();
    session.pause();

    let warnings = warnings.lock().unwrap();
    assert!(warnings.iter().any(|w| w.contains("save")));
}

#[test]
fn test_path_escaping_profile_id_refused_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let result = manager.start_session(
        "../smyg",
        ExerciseMode::Explore,
        Box::new(NullSynth::instant()),
        Box::new(RecordingSink::default()),
    );
    assert!(matches!(result, Err(EngineError::InvalidProfileId(_))));
    assert!(!manager.is_active("../smyg"));
    assert!(manager.reset_profile_tier("../smyg").is_err());
}

#[test]
fn test_reset_tier_refused_while_session_is_active() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let session = manager
        .start_session(
            "backa",
            ExerciseMode::Explore,
            Box::new(NullSynth::instant()),
            Box::new(RecordingSink::default()),
        )
        .unwrap();

    assert!(manager.reset_profile_tier("backa").is_err());
    session.end();

    manager.reset_profile_tier("backa").unwrap();
    let stored = ProgressLedger::load(dir.path(), "backa").unwrap();
    assert_eq!(stored.tier(), Tier::Easy);
}

#[test]
fn test_degraded_mode_warns_once_and_keeps_playing() {
    struct BrokenSynth;
    impl bokstavsresan::speech::Synth for BrokenSynth {
        fn speak(&mut self, _text: &str) -> bokstavsresan::Result<()> {
            Err(EngineError::Synthesis("no audio device".to_string()))
        }
        fn is_speaking(&mut self) -> bool {
            false
        }
        fn stop(&mut self) {}
    }

    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path());

    let sink = RecordingSink::default();
    let warnings = Arc::clone(&sink.warnings);
    let mut session = manager
        .start_session(
            "tyst",
            ExerciseMode::Explore,
            Box::new(BrokenSynth),
            Box::new(sink),
        )
        .unwrap();

    // Let the worker attempt (and fail) synthesis before the next command
    session.request_explore('A').unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    session.request_explore('B').unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    session.request_explore('C').unwrap();

    assert!(session.is_degraded());
    assert_eq!(warnings.lock().unwrap().len(), 1);
    session.end();
}