// src/normalize/phonetic.rs - Fail-closed phonetic keys for blocking

use once_cell::sync::Lazy;
use regex::Regex;
use rphonetic::{Cologne, Encoder};

use super::transliterate;

static HAS_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());

const VOWELS: [char; 6] = ['a', 'e', 'i', 'o', 'u', 'y'];

/// Consonant-skeleton code: first letter, then the remaining unique
/// consonants in order of appearance, then the unique vowels in order of
/// appearance. Computed over the transliterated name with everything but
/// letters stripped.
///
/// Fails closed: a name with no letters left has no key, and the record is
/// simply unblockable by any method built on this code.
pub fn skeleton_key(raw: &str) -> Option<String> {
    let letters: Vec<char> = transliterate(raw)
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    let first = *letters.first()?;

    let mut key = String::with_capacity(letters.len());
    key.push(first);

    let mut seen_consonants = [false; 26];
    let mut seen_vowels = [false; 26];
    let mut vowel_tail = String::new();
    for &c in &letters[1..] {
        let slot = (c as u8 - b'a') as usize;
        if VOWELS.contains(&c) {
            if !seen_vowels[slot] {
                seen_vowels[slot] = true;
                vowel_tail.push(c);
            }
        } else if c != first && !seen_consonants[slot] {
            seen_consonants[slot] = true;
            key.push(c);
        }
    }
    key.push_str(&vowel_tail);
    Some(key)
}

/// Kölner Phonetik over each name token, joined by spaces. Tokens carrying
/// digits are dropped first (regnal numbers and disambiguation suffixes
/// carry no phonetic content).
///
/// Fails closed: if no token survives, or any surviving token encodes to
/// the empty string, the whole name has no key.
pub fn cologne_code(raw: &str) -> Option<String> {
    let base = transliterate(raw);
    let mut codes = Vec::new();
    for token in base
        .split_whitespace()
        .filter(|t| !HAS_DIGIT_RE.is_match(t))
    {
        let code = Cologne.encode(token);
        if code.is_empty() {
            return None;
        }
        codes.push(code);
    }
    if codes.is_empty() {
        None
    } else {
        Some(codes.join(" "))
    }
}
