//! Exercise engine
//!
//! Drives the three modes (Explore, Find-the-Letter, Sound-Out-Words):
//! selects the next item, scores answers, maintains the streak and star
//! milestones, and decides level-ups. The engine owns only
//! session-scoped state; the curriculum, ledger, and speech queue are
//! passed in by the session controller.

pub mod select;

use crate::config::ProgressionSettings;
use crate::curriculum::words::{ENCOURAGEMENTS, TRY_AGAIN};
use crate::curriculum::{Curriculum, Letter, LetterId, Tier, Word};
use crate::progress::ProgressLedger;
use crate::speech::{SpeechQueue, Utterance};
use crate::{EngineError, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// How many distractor letters a Find-the-Letter round shows
const FIND_DISTRACTORS: usize = 5;

/// Exercise mode
///
/// A closed set: mode-specific state lives in the engine's internal
/// variant, not in a class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseMode {
    /// Tap letters to hear them; exposure, not testing
    Explore,
    /// Hear a sound, pick the letter
    FindLetter,
    /// Break a word into letter sounds, one position at a time
    SoundOutWords,
}

/// Item currently presented to the child
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Letter(LetterId),
    Word { text: String, hint: String },
}

/// A presented round, handed to the UI boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Presented {
    pub item: Item,

    /// Find-the-Letter: target plus distractors, shuffled. Empty for
    /// the other modes.
    pub choices: Vec<LetterId>,
}

/// Feedback for one submitted answer
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub correct: bool,

    /// Consecutive correct answers since the last miss
    pub streak: u32,

    /// Stars earned this session
    pub stars: u32,

    /// Whether this answer hit a streak milestone
    pub star_earned: bool,

    /// Set when this answer triggered a tier advance
    pub level_up: Option<Tier>,

    /// Sound-Out-Words: the whole word is done
    pub word_complete: bool,
}

/// Session-scoped progress, folded into the ledger at session end
#[derive(Debug, Clone, Copy)]
pub struct SessionState {
    pub mode: ExerciseMode,
    pub streak: u32,
    pub stars: u32,
    pub tier: Tier,
}

struct ActiveWord {
    word: Word,
    pos: usize,
}

enum ModeState {
    Explore,
    Find {
        target: Option<LetterId>,
        previous: Option<LetterId>,
    },
    SoundOut {
        active: Option<ActiveWord>,
        previous: Option<&'static str>,
    },
}

/// One mode's worth of exercise logic
///
/// Exactly one engine instance exists per active session.
pub struct ExerciseEngine {
    settings: ProgressionSettings,
    state: SessionState,
    mode_state: ModeState,
    rng: StdRng,
}

impl ExerciseEngine {
    /// Create an engine for a mode, starting at the profile's tier
    pub fn new(mode: ExerciseMode, tier: Tier, settings: ProgressionSettings) -> Self {
        Self::with_rng(mode, tier, settings, StdRng::from_entropy())
    }

    /// Create an engine with a seeded RNG (deterministic selection)
    pub fn with_seed(
        mode: ExerciseMode,
        tier: Tier,
        settings: ProgressionSettings,
        seed: u64,
    ) -> Self {
        Self::with_rng(mode, tier, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: ExerciseMode, tier: Tier, settings: ProgressionSettings, rng: StdRng) -> Self {
        let mode_state = match mode {
            ExerciseMode::Explore => ModeState::Explore,
            ExerciseMode::FindLetter => ModeState::Find {
                target: None,
                previous: None,
            },
            ExerciseMode::SoundOutWords => ModeState::SoundOut {
                active: None,
                previous: None,
            },
        };
        Self {
            settings,
            state: SessionState {
                mode,
                streak: 0,
                stars: 0,
                tier,
            },
            mode_state,
            rng,
        }
    }

    /// Session-scoped state snapshot
    pub fn session(&self) -> &SessionState {
        &self.state
    }

    /// Select and present the next item for the current mode
    ///
    /// Cancels any still-playing speech first so the new item's audio
    /// always wins. Explore has no selection; letters are presented on
    /// request via `explore`.
    pub fn begin_item(
        &mut self,
        curriculum: &Curriculum,
        ledger: &ProgressLedger,
        queue: &SpeechQueue,
    ) -> Result<Presented> {
        match self.state.mode {
            ExerciseMode::Explore => Err(EngineError::Session(
                "explore mode presents letters on request".to_string(),
            )),
            ExerciseMode::FindLetter => self.begin_find_round(curriculum, ledger, queue),
            ExerciseMode::SoundOutWords => self.begin_soundout_round(curriculum, ledger, queue),
        }
    }

    fn begin_find_round(
        &mut self,
        curriculum: &Curriculum,
        ledger: &ProgressLedger,
        queue: &SpeechQueue,
    ) -> Result<Presented> {
        let tier = self.state.tier;
        let candidates = curriculum.letters_at(tier);
        let explore_weight = self.settings.explore_weight;

        let ModeState::Find { target, previous } = &mut self.mode_state else {
            return Err(EngineError::Session("not in find-the-letter mode".to_string()));
        };

        let prev = *previous;
        let picked = select::weighted_pick(
            &mut self.rng,
            candidates,
            |&c| ledger.mastery_score(c, explore_weight),
            |&c| Some(c) == prev,
        )
        .ok_or_else(|| EngineError::Session(format!("no letters at {} tier", tier)))?;
        let new_target = candidates[picked];
        *target = Some(new_target);

        // Target plus shuffled distractors
        let mut choices: Vec<LetterId> = candidates
            .iter()
            .copied()
            .filter(|&c| c != new_target)
            .collect();
        choices.shuffle(&mut self.rng);
        choices.truncate(FIND_DISTRACTORS);
        choices.push(new_target);
        choices.shuffle(&mut self.rng);

        let letter = lookup_letter(curriculum, new_target)?;
        queue.cancel_all();
        queue.enqueue(Utterance::normal(letter.name));
        debug!("Find round: target '{}' among {:?}", new_target, choices);

        Ok(Presented {
            item: Item::Letter(new_target),
            choices,
        })
    }

    fn begin_soundout_round(
        &mut self,
        curriculum: &Curriculum,
        ledger: &ProgressLedger,
        queue: &SpeechQueue,
    ) -> Result<Presented> {
        let tier = self.state.tier;
        let pool = curriculum.words_at(tier);
        let explore_weight = self.settings.explore_weight;

        let ModeState::SoundOut { active, previous } = &mut self.mode_state else {
            return Err(EngineError::Session("not in sound-out mode".to_string()));
        };

        let prev = *previous;
        let picked = select::weighted_pick(
            &mut self.rng,
            &pool,
            |w| word_mastery(w, ledger, explore_weight),
            |w| Some(w.text) == prev,
        )
        .ok_or_else(|| EngineError::Session(format!("no words at {} tier", tier)))?;
        let word = *pool[picked];
        *active = Some(ActiveWord { word, pos: 0 });

        // The whole word first, then the first letter's sound
        let first = lookup_letter(curriculum, word.letters()[0])?;
        queue.cancel_all();
        queue.enqueue(Utterance::normal(word.text));
        queue.enqueue(Utterance::normal(first.sound));
        debug!("Sound-out round: word '{}'", word.text);

        Ok(Presented {
            item: Item::Word {
                text: word.text.to_string(),
                hint: word.hint.to_string(),
            },
            choices: Vec::new(),
        })
    }

    /// Handle an Explore-mode letter tap
    ///
    /// Speaks the letter's name and sound and records one exposure.
    /// Exposure is not testing: no streak or star effect.
    pub fn explore(
        &mut self,
        id: LetterId,
        curriculum: &Curriculum,
        ledger: &mut ProgressLedger,
        queue: &SpeechQueue,
    ) -> Result<Feedback> {
        if self.state.mode != ExerciseMode::Explore {
            return Err(EngineError::Session("not in explore mode".to_string()));
        }
        let letter = lookup_letter(curriculum, id)?;

        queue.cancel_all();
        queue.enqueue(Utterance::normal(format!(
            "{}. {}. {}.",
            letter.glyph, letter.name, letter.sound
        )));
        ledger.record_explored(id);

        Ok(self.feedback(true, false, None, false))
    }

    /// Handle a Find-the-Letter selection from the UI boundary
    ///
    /// The outcome is recorded against the target letter. On a miss the
    /// target stays so the child can retry; on a hit the round ends.
    pub fn select_letter(
        &mut self,
        id: LetterId,
        curriculum: &Curriculum,
        ledger: &mut ProgressLedger,
        queue: &SpeechQueue,
    ) -> Result<Feedback> {
        let ModeState::Find { target, previous } = &mut self.mode_state else {
            return Err(EngineError::Session("not in find-the-letter mode".to_string()));
        };
        let Some(current_target) = *target else {
            return Err(EngineError::Session("no active round".to_string()));
        };

        let correct = id == current_target;
        ledger.record_outcome(current_target, correct);
        if correct {
            *previous = Some(current_target);
            *target = None;
        }

        let star_earned = self.apply_streak(correct);
        self.speak_feedback(correct, queue);
        let level_up = if correct {
            self.check_level_up(curriculum, ledger)
        } else {
            None
        };

        Ok(self.feedback(correct, star_earned, level_up, false))
    }

    /// Handle a per-letter confirmation in Sound-Out-Words
    ///
    /// A wrong confirmation marks that letter incorrect and moves on;
    /// the word always completes. The tier never changes mid-word.
    pub fn confirm_letter(
        &mut self,
        pos: usize,
        id: LetterId,
        curriculum: &Curriculum,
        ledger: &mut ProgressLedger,
        queue: &SpeechQueue,
    ) -> Result<Feedback> {
        let ModeState::SoundOut { active, previous } = &mut self.mode_state else {
            return Err(EngineError::Session("not in sound-out mode".to_string()));
        };
        let Some(current) = active.as_mut() else {
            return Err(EngineError::Session("no active word".to_string()));
        };
        if pos != current.pos {
            return Err(EngineError::Session(format!(
                "confirmation out of order: expected position {}, got {}",
                current.pos, pos
            )));
        }

        let letters = current.word.letters();
        let expected = letters[current.pos];
        let correct = id == expected;
        ledger.record_outcome(expected, correct);
        current.pos += 1;
        let word_complete = current.pos >= letters.len();
        let word_text = current.word.text;
        let next_letter = if word_complete {
            None
        } else {
            Some(letters[current.pos])
        };

        if word_complete {
            *previous = Some(word_text);
            *active = None;
        }

        let star_earned = self.apply_streak(correct);
        self.speak_feedback(correct, queue);
        if word_complete {
            info!("Word '{}' completed", word_text);
            queue.enqueue(Utterance::normal(format!("Du ljudade ut {}!", word_text)));
        } else if let Some(next) = next_letter {
            let letter = lookup_letter(curriculum, next)?;
            queue.enqueue(Utterance::normal(letter.sound));
        }

        // Tier decisions only at word boundaries
        let level_up = if word_complete {
            self.check_level_up(curriculum, ledger)
        } else {
            None
        };

        Ok(self.feedback(correct, star_earned, level_up, word_complete))
    }

    /// Update streak and stars for one graded answer
    ///
    /// Streak resets to 0 on any miss; one star exactly at every
    /// milestone-th consecutive correct answer.
    fn apply_streak(&mut self, correct: bool) -> bool {
        if !correct {
            self.state.streak = 0;
            return false;
        }
        self.state.streak += 1;
        if self.state.streak % self.settings.star_milestone == 0 {
            self.state.stars += 1;
            debug!("Star earned at streak {}", self.state.streak);
            return true;
        }
        false
    }

    /// Enqueue a short spoken reaction to an answer
    fn speak_feedback(&mut self, correct: bool, queue: &SpeechQueue) {
        let phrase = if correct {
            ENCOURAGEMENTS.choose(&mut self.rng)
        } else {
            TRY_AGAIN.choose(&mut self.rng)
        };
        if let Some(&phrase) = phrase {
            queue.enqueue(Utterance::high(phrase));
        }
    }

    /// Advance one tier if the current tier is mastered
    ///
    /// Requires every letter at the tier to have at least `min_samples`
    /// graded attempts and the mean mastery score to exceed the
    /// threshold. Never skips a tier, never goes down.
    fn check_level_up(&mut self, curriculum: &Curriculum, ledger: &mut ProgressLedger) -> Option<Tier> {
        let next = self.state.tier.next()?;
        let letters = curriculum.letters_at(self.state.tier);
        if letters.is_empty() {
            return None;
        }

        let mut total = 0.0f32;
        for &id in letters {
            if ledger.attempts(id) < self.settings.min_samples as u64 {
                return None;
            }
            total += ledger.mastery_score(id, self.settings.explore_weight);
        }
        let mean = total / letters.len() as f32;
        if mean <= self.settings.level_up_threshold {
            return None;
        }

        info!(
            "Level up: {} -> {} (mean mastery {:.2})",
            self.state.tier, next, mean
        );
        self.state.tier = next;
        ledger.set_tier(next);
        Some(next)
    }

    fn feedback(
        &self,
        correct: bool,
        star_earned: bool,
        level_up: Option<Tier>,
        word_complete: bool,
    ) -> Feedback {
        Feedback {
            correct,
            streak: self.state.streak,
            stars: self.state.stars,
            star_earned,
            level_up,
            word_complete,
        }
    }
}

/// Mean mastery across a word's letters
fn word_mastery(word: &Word, ledger: &ProgressLedger, explore_weight: f32) -> f32 {
    let letters = word.letters();
    if letters.is_empty() {
        return 0.0;
    }
    let total: f32 = letters
        .iter()
        .map(|&c| ledger.mastery_score(c, explore_weight))
        .sum();
    total / letters.len() as f32
}

fn lookup_letter(curriculum: &Curriculum, id: LetterId) -> Result<Letter> {
    curriculum
        .letter(id)
        .copied()
        .ok_or_else(|| EngineError::Session(format!("unknown letter '{}'", id)))
}
