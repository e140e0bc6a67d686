/*!
 * CJK ideograph detection.
 *
 * Residual ideographs in a Vietnamese translation mean the model left part of
 * the source untranslated.
 */

/// Ideograph blocks counted as residual source text
const CJK_RANGES: &[(u32, u32)] = &[
    (0x4E00, 0x9FFF),   // Unified Ideographs
    (0x3400, 0x4DBF),   // Extension A
    (0x20000, 0x2A6DF), // Extension B
    (0x2A700, 0x2B73F), // Extension C
    (0x2B740, 0x2B81F), // Extension D
    (0x2B820, 0x2CEAF), // Extension E
    (0xF900, 0xFAFF),   // Compatibility Ideographs
    (0x2F800, 0x2FA1F), // Compatibility Supplement
];

/// Whether a character is a CJK ideograph
pub fn is_cjk(ch: char) -> bool {
    let cp = ch as u32;
    CJK_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Number of CJK ideographs in `text`
pub fn count_cjk_chars(text: &str) -> usize {
    text.chars().filter(|&ch| is_cjk(ch)).count()
}

pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}
