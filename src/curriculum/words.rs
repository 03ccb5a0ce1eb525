//! Static word lists and feedback phrases
//!
//! Words are grouped by difficulty tier. Each entry carries an English
//! hint the UI can show next to the word.

/// Easy words (3 letters)
pub static WORDS_EASY: &[(&str, &str)] = &[
    ("SOL", "sun"),
    ("KAT", "cat"),
    ("HUS", "house"),
    ("BIL", "car"),
    ("MUS", "mouse"),
    ("HÅR", "hair"),
    ("BÅT", "boat"),
    ("ÖGA", "eye"),
    ("ARM", "arm"),
    ("BEN", "leg"),
    ("LÅS", "lock"),
    ("NÄS", "nose"),
];

/// Medium words (4 letters)
pub static WORDS_MEDIUM: &[(&str, &str)] = &[
    ("BOLL", "ball"),
    ("LAMM", "lamb"),
    ("FISK", "fish"),
    ("GRIS", "pig"),
    ("HUND", "dog"),
    ("KATT", "cat"),
    ("STOL", "chair"),
    ("DÖRR", "door"),
    ("BLAD", "leaf"),
    ("SNÄL", "kind"),
    ("GLAD", "happy"),
    ("STOR", "big"),
];

/// Hard words (5+ letters)
pub static WORDS_HARD: &[(&str, &str)] = &[
    ("ÄPPLE", "apple"),
    ("SKOLA", "school"),
    ("BJÖRN", "bear"),
    ("BLOMMA", "flower"),
    ("STJÄRNA", "star"),
    ("TRÄD", "tree"),
    ("SJUNGA", "sing"),
    ("HIMMEL", "sky"),
    ("VATTEN", "water"),
];

/// Phrases spoken after a correct answer
pub static ENCOURAGEMENTS: &[&str] = &[
    "Bra jobbat!",
    "Fantastiskt!",
    "Du är en stjärna!",
    "Underbart!",
    "Fortsätt så!",
    "Superbra!",
];

/// Phrases spoken after an incorrect answer
pub static TRY_AGAIN: &[&str] = &[
    "Nästan! Försök igen!",
    "Så nära! En gång till!",
    "Du klarar det!",
    "Ge inte upp!",
];
