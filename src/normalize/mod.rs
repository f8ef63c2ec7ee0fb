// src/normalize/mod.rs - Deterministic name transforms shared by every blocking method

pub mod phonetic;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Placeholder tokens that count as "no value". Shared verbatim by the
/// confidence scorer and the loader so the two never drift.
const MISSING_TOKENS: [&str; 6] = ["na", "n/a", "none", "null", "unknown", "?"];

static NUMERIC_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Returns whether a raw attribute value should be treated as missing.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    MISSING_TOKENS.iter().any(|t| *t == lowered)
}

/// Lowercase and trim, nothing else.
pub fn case_fold_trim(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Map a name to a lowercased Latin base alphabet: NFKD decomposition,
/// combining marks stripped, the usual non-decomposing letters mapped by
/// hand, anything else outside ASCII dropped.
pub fn transliterate(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        for lc in ch.to_lowercase() {
            if lc.is_ascii() {
                out.push(lc);
            } else {
                match lc {
                    'ß' => out.push_str("ss"),
                    'æ' => out.push_str("ae"),
                    'œ' => out.push_str("oe"),
                    'ø' => out.push('o'),
                    'đ' => out.push('d'),
                    'ð' => out.push('d'),
                    'þ' => out.push_str("th"),
                    'ł' => out.push('l'),
                    _ => {}
                }
            }
        }
    }
    out
}

/// Collapse separator characters and runs of repeated characters.
///
/// Underscores and dashes (wiki link debris) become spaces before token
/// runs are squeezed. With `keep_roman_numerals` set, tokens that read as
/// Roman numerals (II, III, XIV) are left intact so "Henry III" does not
/// degrade to "Henry II".
pub fn squeeze(raw: &str, keep_roman_numerals: bool) -> String {
    let separated = raw.replace(['_', '-'], " ");
    let mut tokens = Vec::new();
    for token in separated.split_whitespace() {
        if keep_roman_numerals && is_roman_numeral(token) {
            tokens.push(token.to_string());
            continue;
        }
        let mut squeezed = String::with_capacity(token.len());
        let mut last: Option<char> = None;
        for ch in token.chars() {
            if last != Some(ch) {
                squeezed.push(ch);
            }
            last = Some(ch);
        }
        tokens.push(squeezed);
    }
    tokens.join(" ")
}

fn is_roman_numeral(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| matches!(c.to_ascii_lowercase(), 'm' | 'd' | 'c' | 'l' | 'x' | 'v' | 'i'))
}

/// Abbreviate every token but the last to its first letter plus a dot,
/// leaving the surname intact: "john maynard smith" -> "j. m. smith".
///
/// A single-token name is returned unchanged, and a token that is numeric
/// or carries no alphanumeric character at all forces a no-op for the whole
/// name (such tokens are not given names, abbreviating around them only
/// manufactures collisions).
pub fn initials(raw: &str) -> String {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() <= 1 {
        return raw.to_string();
    }
    for token in &tokens {
        if NUMERIC_TOKEN_RE.is_match(token) || !token.chars().any(|c| c.is_alphanumeric()) {
            return raw.to_string();
        }
    }
    let mut parts = Vec::with_capacity(tokens.len());
    for token in &tokens[..tokens.len() - 1] {
        let first = token.chars().next().expect("tokens are non-empty");
        parts.push(format!("{}.", first));
    }
    parts.push(tokens[tokens.len() - 1].to_string());
    parts.join(" ")
}

/// The cached comparison form of a name: transliterated, separator-squeezed,
/// Roman numerals preserved. Computed once per record at load time.
pub fn comparison_form(raw: &str) -> String {
    squeeze(&transliterate(raw), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("   "));
        assert!(is_missing("N/A"));
        assert!(is_missing("Unknown"));
        assert!(is_missing("?"));
        assert!(!is_missing("writer"));
        assert!(!is_missing("0"));
    }

    #[test]
    fn test_case_fold_trim() {
        assert_eq!(case_fold_trim("  Jón SMITH "), "jón smith");
    }

    #[test]
    fn test_transliterate() {
        assert_eq!(transliterate("Jón Þór"), "jon thor");
        assert_eq!(transliterate("Müller-Lüdenscheidt"), "muller-ludenscheidt");
        assert_eq!(transliterate("Łukasz Gottwald"), "lukasz gottwald");
        assert_eq!(transliterate("Strauß"), "strauss");
    }

    #[test]
    fn test_squeeze_separators_and_runs() {
        assert_eq!(squeeze("Anna_Maria__Schäffer", false), "Ana Maria Schäfer");
        assert_eq!(squeeze("aabb  ccdd", false), "ab cd");
    }

    #[test]
    fn test_squeeze_preserves_roman_numerals() {
        assert_eq!(squeeze("henry iii", true), "henry iii");
        assert_eq!(squeeze("henry iii", false), "henry i");
        assert_eq!(squeeze("louis xviii", true), "louis xviii");
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("john maynard smith"), "j. m. smith");
        assert_eq!(initials("smith"), "smith");
        // Numeric token forces a no-op.
        assert_eq!(initials("pope john 23"), "pope john 23");
        // Punctuation-only token forces a no-op.
        assert_eq!(initials("jean - luc"), "jean - luc");
    }

    #[test]
    fn test_comparison_form() {
        assert_eq!(comparison_form("Jón_Þór Smith"), "jon thor smith");
        assert_eq!(comparison_form("Henry III"), "henry iii");
    }
}
