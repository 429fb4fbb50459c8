//! Locale-aware casing and ordering for stores without ICU.
//!
//! Turkish casing differs from the Unicode default only in the dotted and
//! dotless `i`, so the default mapping plus those four letters is exact.

use std::cmp::Ordering;

use catalog_core::config::TextConfig;

/// Lowercase one character, keeping it when the mapping is not 1:1.
pub fn lower_char(c: char, turkish: bool) -> char {
    match c {
        'I' if turkish => 'ı',
        'İ' if turkish => 'i',
        _ => single(c.to_lowercase()).unwrap_or(c),
    }
}

/// Uppercase one character, keeping it when the mapping is not 1:1.
pub fn upper_char(c: char, turkish: bool) -> char {
    match c {
        'i' if turkish => 'İ',
        'ı' if turkish => 'I',
        _ => single(c.to_uppercase()).unwrap_or(c),
    }
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Every character that lowercases to the same character as `c`.
pub fn case_variants(c: char, turkish: bool) -> Vec<char> {
    let lower = lower_char(c, turkish);
    let mut variants = vec![c];
    for candidate in [lower, upper_char(lower, turkish)] {
        if !variants.contains(&candidate) && lower_char(candidate, turkish) == lower {
            variants.push(candidate);
        }
    }
    variants
}

/// `GLOB` pattern matching `needle` anywhere in a value.
///
/// With case-insensitive search every cased letter becomes a class of its
/// case variants. Wildcards in the needle are matched literally.
pub fn glob_pattern(needle: &str, text: &TextConfig) -> String {
    let turkish = text.is_turkish();
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('*');
    for c in needle.chars() {
        if text.case_insensitive {
            let variants = case_variants(c, turkish);
            if variants.len() > 1 {
                pattern.push('[');
                pattern.extend(variants);
                pattern.push(']');
                continue;
            }
        }
        match c {
            '*' | '?' | '[' => {
                pattern.push('[');
                pattern.push(c);
                pattern.push(']');
            }
            _ => pattern.push(c),
        }
    }
    pattern.push('*');
    pattern
}

/// Primary weight of a character: its lowercase form, with the Turkish
/// letters placed right after their base letter.
fn weight(c: char, turkish: bool) -> (u32, u8) {
    let lower = lower_char(c, turkish);
    if turkish {
        let after = match lower {
            'ç' => Some('c'),
            'ğ' => Some('g'),
            'ı' => Some('h'),
            'ö' => Some('o'),
            'ş' => Some('s'),
            'ü' => Some('u'),
            _ => None,
        };
        if let Some(base) = after {
            return (base as u32, 1);
        }
    }
    (lower as u32, 0)
}

/// Collation order: case-insensitive alphabetical first, then byte order so
/// that only identical strings compare equal.
pub fn collate(a: &str, b: &str, turkish: bool) -> Ordering {
    let left = a.chars().map(|c| weight(c, turkish));
    let right = b.chars().map(|c| weight(c, turkish));
    left.cmp(right).then_with(|| a.cmp(b))
}
