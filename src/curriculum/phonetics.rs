//! Swedish letter phonetics
//!
//! Two tables per letter: the letter *name* as it is called out ("B" is
//! "beh") and the letter *sound* as it appears inside a word ("B" is
//! "bbb"). Sounds are elongated because children with verbal dyspraxia
//! need slow, clear phonemes from the synthesizer.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The 29-letter Swedish alphabet, in alphabet order
pub static ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Å', 'Ä', 'Ö',
];

/// Letter names (how each letter is called out)
pub static LETTER_NAMES: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert('A', "ah");
    m.insert('B', "beh");
    m.insert('C', "seh");
    m.insert('D', "deh");
    m.insert('E', "eh");
    m.insert('F', "eff");
    m.insert('G', "geh");
    m.insert('H', "hå");
    m.insert('I', "ih");
    m.insert('J', "jih");
    m.insert('K', "kå");
    m.insert('L', "ell");
    m.insert('M', "emm");
    m.insert('N', "enn");
    m.insert('O', "oh");
    m.insert('P', "peh");
    m.insert('Q', "kuh");
    m.insert('R', "err");
    m.insert('S', "ess");
    m.insert('T', "teh");
    m.insert('U', "uh");
    m.insert('V', "veh");
    m.insert('W', "dubbelveh");
    m.insert('X', "eks");
    m.insert('Y', "yh");
    m.insert('Z', "seta");
    m.insert('Å', "å");
    m.insert('Ä', "äh");
    m.insert('Ö', "öh");
    m
});

/// Letter sounds (how each letter sounds inside a word, elongated for TTS)
pub static LETTER_SOUNDS: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert('A', "aaa");
    m.insert('B', "bbb");
    m.insert('C', "sss");
    m.insert('D', "ddd");
    m.insert('E', "eee");
    m.insert('F', "fff");
    m.insert('G', "ggg");
    m.insert('H', "hhh");
    m.insert('I', "iii");
    m.insert('J', "jjj");
    m.insert('K', "kkk");
    m.insert('L', "lll");
    m.insert('M', "mmm");
    m.insert('N', "nnn");
    m.insert('O', "ooo");
    m.insert('P', "ppp");
    m.insert('Q', "kkk");
    m.insert('R', "rrr");
    m.insert('S', "sss");
    m.insert('T', "ttt");
    m.insert('U', "uuu");
    m.insert('V', "vvv");
    m.insert('W', "vvv");
    m.insert('X', "ks");
    m.insert('Y', "yyy");
    m.insert('Z', "sss");
    m.insert('Å', "ååå");
    m.insert('Ä', "äää");
    m.insert('Ö', "ööö");
    m
});
