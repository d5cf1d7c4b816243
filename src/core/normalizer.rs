//! Vietnamese-aware text folding shared by every matcher.
//!
//! Lowercases the input and maps each accented vowel (including the tone
//! marks stacked on `â`, `ă`, `ê`, `ô`, `ơ`, `ư`) to its base Latin letter,
//! plus `đ` to `d`. Characters outside the table pass through unchanged.

const FOLD_TABLE: &[(char, &str)] = &[
    ('a', "àáạảãâầấậẩẫăằắặẳẵ"),
    ('e', "èéẹẻẽêềếệểễ"),
    ('i', "ìíịỉĩ"),
    ('o', "òóọỏõôồốộổỗơờớợởỡ"),
    ('u', "ùúụủũưừứựửữ"),
    ('y', "ỳýỵỷỹ"),
    ('d', "đ"),
];

fn fold_char(c: char) -> char {
    FOLD_TABLE
        .iter()
        .find(|(_, variants)| variants.contains(c))
        .map(|(base, _)| *base)
        .unwrap_or(c)
}

/// Lowercase, diacritic-folded and trimmed form of `text`. `None` folds to "".
pub fn normalize<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into() else {
        return String::new();
    };
    text.to_lowercase()
        .chars()
        .map(fold_char)
        .collect::<String>()
        .trim()
        .to_string()
}

/// `normalize` with every whitespace character removed, for containment checks.
pub fn normalize_compact<'a>(text: impl Into<Option<&'a str>>) -> String {
    normalize(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Whether `needle` occurs in `haystack` starting and ending on token boundaries.
///
/// Both sides are expected to be normalized already.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric();
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let starts_clean = haystack[..start].chars().next_back().is_none_or(|c| !is_word(c))
            || !needle.chars().next().is_some_and(is_word);
        let ends_clean = haystack[end..].chars().next().is_none_or(|c| !is_word(c))
            || !needle.chars().next_back().is_some_and(is_word);
        starts_clean && ends_clean
    })
}
