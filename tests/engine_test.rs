//! Exercise engine behavior tests
//!
//! Runs full rounds against a real curriculum and ledger with a silent
//! synthesizer, checking grading, streaks, stars, and tier advancement.

use bokstavsresan::config::ProgressionSettings;
use bokstavsresan::curriculum::{Curriculum, Tier};
use bokstavsresan::engine::{ExerciseEngine, ExerciseMode, Item};
use bokstavsresan::progress::ProgressLedger;
use bokstavsresan::speech::backends::null::NullSynth;
use bokstavsresan::speech::SpeechQueue;

type Fixture = (
    Curriculum,
    ProgressLedger,
    SpeechQueue,
    ExerciseEngine,
    tempfile::TempDir,
);

fn setup(mode: ExerciseMode) -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let curriculum = Curriculum::load().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let ledger = ProgressLedger::fresh(dir.path(), "test");
    let queue = SpeechQueue::new(Box::new(NullSynth::instant()));
    let engine = ExerciseEngine::with_seed(mode, Tier::Easy, ProgressionSettings::default(), 7);
    (curriculum, ledger, queue, engine, dir)
}

fn find_target(presented: &bokstavsresan::engine::Presented) -> char {
    match presented.item {
        Item::Letter(id) => id,
        _ => panic!("expected a letter round"),
    }
}

#[test]
fn test_find_letter_wrong_pick_charges_the_target() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::FindLetter);

    let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
    let target = find_target(&presented);
    let wrong = *presented
        .choices
        .iter()
        .find(|&&c| c != target)
        .expect("round needs distractors");

    let feedback = engine
        .select_letter(wrong, &curriculum, &mut ledger, &queue)
        .unwrap();
    assert!(!feedback.correct);
    assert_eq!(feedback.streak, 0);

    let record = ledger.record(target).unwrap();
    assert_eq!(record.attempts, 1);
    assert_eq!(record.correct, 0);
    // The tapped distractor is not blamed
    assert_eq!(ledger.attempts(wrong), 0);
}

#[test]
fn test_target_survives_a_miss_and_can_still_be_answered() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::FindLetter);

    let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
    let target = find_target(&presented);
    let wrong = *presented.choices.iter().find(|&&c| c != target).unwrap();

    engine
        .select_letter(wrong, &curriculum, &mut ledger, &queue)
        .unwrap();
    let feedback = engine
        .select_letter(target, &curriculum, &mut ledger, &queue)
        .unwrap();
    assert!(feedback.correct);

    let record = ledger.record(target).unwrap();
    assert_eq!(record.attempts, 2);
    assert_eq!(record.correct, 1);
}

#[test]
fn test_star_milestones_at_five_and_ten() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::FindLetter);

    for round in 1..=10u32 {
        let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
        let target = find_target(&presented);
        let feedback = engine
            .select_letter(target, &curriculum, &mut ledger, &queue)
            .unwrap();

        assert!(feedback.correct);
        assert_eq!(feedback.streak, round);
        assert_eq!(feedback.star_earned, round % 5 == 0);
        assert_eq!(feedback.stars, round / 5);
    }
    assert_eq!(engine.session().stars, 2);
}

#[test]
fn test_explore_tap_is_exposure_not_grading() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::Explore);

    let feedback = engine.explore('A', &curriculum, &mut ledger, &queue).unwrap();
    assert!(feedback.correct);
    assert_eq!(feedback.streak, 0);
    assert!(!feedback.star_earned);

    let record = ledger.record('A').unwrap();
    assert_eq!(record.attempts, 0);
    assert_eq!(record.correct, 0);
    assert_eq!(record.explored, 1);
}

#[test]
fn test_sound_out_word_with_one_wrong_confirmation() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::SoundOutWords);

    let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
    let text = match &presented.item {
        Item::Word { text, .. } => text.clone(),
        _ => panic!("expected a word round"),
    };
    let letters: Vec<char> = text.chars().collect();
    assert!(letters.len() >= 2);

    // Wrong confirmation at position 1; the word still completes
    let alphabet = curriculum.letters();
    let mut last = None;
    for (pos, &expected) in letters.iter().enumerate() {
        let submitted = if pos == 1 {
            alphabet.iter().find(|l| l.glyph != expected).unwrap().glyph
        } else {
            expected
        };
        let feedback = engine
            .confirm_letter(pos, submitted, &curriculum, &mut ledger, &queue)
            .unwrap();
        assert_eq!(feedback.correct, pos != 1);
        if pos == 1 {
            assert_eq!(feedback.streak, 0);
        }
        last = Some(feedback);
    }
    assert!(last.unwrap().word_complete);

    // The miss is charged to the expected letter at that position
    let missed = ledger.record(letters[1]).unwrap();
    assert_eq!(missed.attempts, 1);
    assert_eq!(missed.correct, 0);
    let first = ledger.record(letters[0]).unwrap();
    assert_eq!(first.correct, 1);
}

#[test]
fn test_sound_out_rejects_out_of_order_positions() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::SoundOutWords);

    let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
    let text = match &presented.item {
        Item::Word { text, .. } => text.clone(),
        _ => panic!("expected a word round"),
    };
    let second = text.chars().nth(1).unwrap();

    assert!(engine
        .confirm_letter(1, second, &curriculum, &mut ledger, &queue)
        .is_err());
    // Nothing was graded
    assert_eq!(ledger.attempts(second), 0);
}

#[test]
fn test_sustained_mastery_advances_exactly_one_tier() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::FindLetter);

    let mut advanced_to = None;
    for _ in 0..2000 {
        let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
        let target = find_target(&presented);
        let feedback = engine
            .select_letter(target, &curriculum, &mut ledger, &queue)
            .unwrap();
        if let Some(tier) = feedback.level_up {
            advanced_to = Some(tier);
            break;
        }
    }

    assert_eq!(advanced_to, Some(Tier::Medium));
    assert_eq!(engine.session().tier, Tier::Medium);
    assert_eq!(ledger.tier(), Tier::Medium);

    for &id in curriculum.letters_at(Tier::Easy) {
        assert!(ledger.attempts(id) >= 3, "letter {} under-sampled", id);
    }
}

#[test]
fn test_consecutive_rounds_never_repeat_the_target() {
    let (curriculum, mut ledger, queue, mut engine, _dir) = setup(ExerciseMode::FindLetter);

    let mut previous = None;
    for _ in 0..60 {
        let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
        let target = find_target(&presented);
        if let Some(prev) = previous {
            assert_ne!(target, prev);
        }
        previous = Some(target);
        engine
            .select_letter(target, &curriculum, &mut ledger, &queue)
            .unwrap();
    }
}

#[test]
fn test_find_round_choices_contain_target_and_distractors() {
    let (curriculum, ledger, queue, mut engine, _dir) = setup(ExerciseMode::FindLetter);

    let presented = engine.begin_item(&curriculum, &ledger, &queue).unwrap();
    let target = find_target(&presented);
    assert!(presented.choices.contains(&target));
    assert_eq!(presented.choices.len(), 6.min(curriculum.letters_at(Tier::Easy).len()));

    let mut unique: Vec<char> = presented.choices.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), presented.choices.len());
}
