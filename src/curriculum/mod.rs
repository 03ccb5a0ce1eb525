//! Curriculum store
//!
//! Static definition of the alphabet, per-letter phonetic identifiers,
//! and difficulty-bucketed word lists. Validated once at load, read-only
//! afterwards; sessions share it as an `Arc<Curriculum>`.

pub mod phonetics;
pub mod words;

use crate::{EngineError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use phonetics::{ALPHABET, LETTER_NAMES, LETTER_SOUNDS};
use words::{WORDS_EASY, WORDS_HARD, WORDS_MEDIUM};

/// Letter identifier (a single uppercase grapheme)
pub type LetterId = char;

/// Difficulty tier
///
/// Tiers only ever advance easy → medium → hard, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    /// The next tier up, or `None` at the top
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Easy => Some(Tier::Medium),
            Tier::Medium => Some(Tier::Hard),
            Tier::Hard => None,
        }
    }

    /// All tiers, lowest first
    pub fn all() -> [Tier; 3] {
        [Tier::Easy, Tier::Medium, Tier::Hard]
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Easy
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Easy => write!(f, "easy"),
            Tier::Medium => write!(f, "medium"),
            Tier::Hard => write!(f, "hard"),
        }
    }
}

/// A letter with its phonetic identifiers
#[derive(Debug, Clone, Copy)]
pub struct Letter {
    /// Display glyph (also the identifier)
    pub glyph: char,

    /// Letter name as called out ("B" → "beh")
    pub name: &'static str,

    /// Letter sound inside a word ("B" → "bbb")
    pub sound: &'static str,
}

/// A word with its difficulty tier and UI hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    /// Uppercase word text (also the identifier)
    pub text: &'static str,

    /// English hint the UI may display
    pub hint: &'static str,

    /// Difficulty tier this word belongs to
    pub tier: Tier,
}

impl Word {
    /// The ordered letter sequence of this word
    pub fn letters(&self) -> Vec<LetterId> {
        self.text.chars().collect()
    }

    /// Word length in letters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the word is empty (never true for a validated curriculum)
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Validated, immutable curriculum
pub struct Curriculum {
    letters: Vec<Letter>,
    index: HashMap<LetterId, usize>,
    words: Vec<Word>,
    tier_letters: HashMap<Tier, Vec<LetterId>>,
}

impl Curriculum {
    /// Load and validate the curriculum
    ///
    /// Fails with `CurriculumCorrupt` if any word references a letter
    /// missing from the alphabet, or a letter lacks a name or sound.
    /// This is the only fatal error in the engine.
    pub fn load() -> Result<Self> {
        let mut letters = Vec::with_capacity(ALPHABET.len());
        let mut index = HashMap::new();

        for &glyph in ALPHABET {
            let name = LETTER_NAMES.get(&glyph).copied().ok_or_else(|| {
                EngineError::CurriculumCorrupt(format!("letter '{}' has no name", glyph))
            })?;
            let sound = LETTER_SOUNDS.get(&glyph).copied().ok_or_else(|| {
                EngineError::CurriculumCorrupt(format!("letter '{}' has no sound", glyph))
            })?;
            index.insert(glyph, letters.len());
            letters.push(Letter { glyph, name, sound });
        }

        let mut curriculum_words = Vec::new();
        for (tier, list) in [
            (Tier::Easy, WORDS_EASY),
            (Tier::Medium, WORDS_MEDIUM),
            (Tier::Hard, WORDS_HARD),
        ] {
            for &(text, hint) in list {
                if text.is_empty() {
                    return Err(EngineError::CurriculumCorrupt(format!(
                        "empty word in {} tier",
                        tier
                    )));
                }
                for ch in text.chars() {
                    if !index.contains_key(&ch) {
                        return Err(EngineError::CurriculumCorrupt(format!(
                            "word '{}' references unknown letter '{}'",
                            text, ch
                        )));
                    }
                }
                curriculum_words.push(Word { text, hint, tier });
            }
        }

        let tier_letters = Self::build_tier_letters(&curriculum_words);

        info!(
            "Curriculum loaded: {} letters, {} words",
            letters.len(),
            curriculum_words.len()
        );

        Ok(Self {
            letters,
            index,
            words: curriculum_words,
            tier_letters,
        })
    }

    /// Letters eligible at each tier, in alphabet order
    ///
    /// Easy and medium cover the letters their word pools use; hard is
    /// the full alphabet.
    fn build_tier_letters(words: &[Word]) -> HashMap<Tier, Vec<LetterId>> {
        let mut map = HashMap::new();
        let mut seen: BTreeSet<LetterId> = BTreeSet::new();

        for tier in [Tier::Easy, Tier::Medium] {
            for word in words.iter().filter(|w| w.tier == tier) {
                seen.extend(word.text.chars());
            }
            let ordered: Vec<LetterId> = ALPHABET
                .iter()
                .copied()
                .filter(|ch| seen.contains(ch))
                .collect();
            debug!("{} tier covers {} letters", tier, ordered.len());
            map.insert(tier, ordered);
        }

        map.insert(Tier::Hard, ALPHABET.to_vec());
        map
    }

    /// Look up a letter by identifier
    pub fn letter(&self, id: LetterId) -> Option<&Letter> {
        self.index.get(&id).map(|&i| &self.letters[i])
    }

    /// Whether the identifier names a curriculum letter
    pub fn contains(&self, id: LetterId) -> bool {
        self.index.contains_key(&id)
    }

    /// All letters, in alphabet order
    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    /// Ordered letter identifiers eligible at a tier
    pub fn letters_at(&self, tier: Tier) -> &[LetterId] {
        self.tier_letters
            .get(&tier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Word pool for a tier
    ///
    /// Pools are cumulative: medium includes easy words, hard includes
    /// everything, so earlier material stays in rotation.
    pub fn words_at(&self, tier: Tier) -> Vec<&Word> {
        self.words.iter().filter(|w| w.tier <= tier).collect()
    }

    /// Look up a word by its text
    pub fn word(&self, text: &str) -> Option<&Word> {
        self.words.iter().find(|w| w.text == text)
    }
}
