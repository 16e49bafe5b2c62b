use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::fragment::TextFragment;

/// Optional 0-2 letter prefix, 2-3 digit series block, letters, 1-3 digits, optional
/// `-N` suffix. Matches `12J2`, `20G908-1`, `L13J5-1`.
pub const SPEC_CODE_PATTERN: &str = r"[A-Z]{0,2}\d{2,3}\s*[A-Z]+\s*\d{1,3}(?:-\d+)?";

/// Standard series the leading numeric block must belong to.
pub const VALID_SERIES_PREFIXES: &[&str] = &[
    "04", "05", "06", "07", "08", "09", "12", "13", "14", "15", "16", "17", "18", "19", "20",
    "21", "22", "23", "24", "25",
];

/// OCR confusions as `(digit, letter)`; applied in whichever direction the position
/// in the code calls for.
pub const CONFUSION_PAIRS: &[(char, char)] = &[('0', 'O'), ('1', 'I'), ('5', 'S'), ('8', 'B')];

const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 15;
const MAX_PREFIX_LETTERS: usize = 2;
const MAX_TAIL_DIGITS: usize = 3;

static SPEC_CODE_SEARCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SPEC_CODE_PATTERN).expect("valid spec code regex"));

static SPEC_CODE_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^(?:{SPEC_CODE_PATTERN})$")).expect("valid exact spec code regex")
});

static LEADING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{0,2}(\d+)").expect("valid leading block regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecCode {
    pub code: String,
    pub confidence: f64,
    pub source_text: String,
    pub source_index: usize,
}

/// One `SpecCode` per fragment that yields a valid code, deduplicated by code with the
/// highest confidence kept. First-appearance order is preserved.
pub fn parse_spec_codes(fragments: &[TextFragment]) -> Vec<SpecCode> {
    let mut codes: Vec<SpecCode> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, fragment) in fragments.iter().enumerate() {
        if fragment.is_degenerate() {
            debug!(index, text = %fragment.text, "skipping degenerate fragment");
            continue;
        }

        let Some(code) = extract_spec_code(&fragment.text) else {
            continue;
        };

        let candidate = SpecCode {
            code,
            confidence: fragment.confidence,
            source_text: fragment.text.clone(),
            source_index: index,
        };

        match positions.get(&candidate.code) {
            Some(&position) => {
                if candidate.confidence > codes[position].confidence {
                    codes[position] = candidate;
                }
            }
            None => {
                positions.insert(candidate.code.clone(), codes.len());
                codes.push(candidate);
            }
        }
    }

    info!(count = codes.len(), "parsed spec codes");
    codes
}

/// Direct grammar match first, then the confusion-correction pass.
pub fn extract_spec_code(text: &str) -> Option<String> {
    let upper = text.trim().to_uppercase();

    for found in SPEC_CODE_SEARCH.find_iter(&upper) {
        let code = strip_whitespace(found.as_str());
        if validate_spec_code(&code) {
            debug!(text, code = %code, "spec code matched directly");
            return Some(code);
        }
    }

    let corrected = correct_confusions(&upper);
    if let Some(code) = &corrected {
        debug!(text, code = %code, "spec code recovered by correction");
    }
    corrected
}

/// Whether `text` (already normalized) contains something shaped like a spec code.
/// Shape only; no allow-list check.
pub fn contains_spec_code_shape(text: &str) -> Option<&str> {
    SPEC_CODE_SEARCH.find(text).map(|found| found.as_str())
}

pub fn split_spec_code_shape(text: &str) -> Option<(&str, &str)> {
    SPEC_CODE_SEARCH
        .find(text)
        .map(|found| (found.as_str(), &text[found.end()..]))
}

/// Full grammar match plus validation.
pub fn is_spec_code(code: &str) -> bool {
    SPEC_CODE_EXACT.is_match(code) && validate_spec_code(code)
}

pub fn validate_spec_code(code: &str) -> bool {
    let length = code.chars().count();
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&length) {
        debug!(code, length, "spec code length out of range");
        return false;
    }

    let Some(block) = LEADING_BLOCK
        .captures(code)
        .and_then(|captures| captures.get(1))
    else {
        debug!(code, "spec code has no leading numeric block");
        return false;
    };

    if !VALID_SERIES_PREFIXES.contains(&block.as_str()) {
        debug!(code, series = block.as_str(), "unknown standard series");
        return false;
    }

    if !code.chars().any(|character| character.is_ascii_uppercase()) {
        debug!(code, "spec code has no uppercase letter");
        return false;
    }

    true
}

/// Rebuild a code from noisy text, swapping confusable characters by position: letters
/// become digits inside numeric blocks, digits become letters at the series letter.
/// Pure-digit text is never corrected into a code, and the series block needs at least
/// one digit that was read as a digit.
pub fn correct_confusions(text: &str) -> Option<String> {
    let upper = text.trim().to_uppercase();
    if !upper.chars().any(|character| character.is_ascii_alphabetic()) {
        return None;
    }

    let cleaned = upper
        .chars()
        .filter(|character| !is_separator_noise(*character))
        .collect::<Vec<char>>();

    [2usize, 3]
        .into_iter()
        .find_map(|block_len| rebuild_code(&cleaned, block_len).filter(|code| is_spec_code(code)))
}

fn rebuild_code(chars: &[char], block_len: usize) -> Option<String> {
    let mut code = String::with_capacity(chars.len());
    let mut rest = chars;

    let mut prefix_len = 0;
    while prefix_len < MAX_PREFIX_LETTERS {
        match rest.first() {
            Some(&character) if character.is_ascii_uppercase() && as_digit(character).is_none() => {
                code.push(character);
                rest = &rest[1..];
                prefix_len += 1;
            }
            _ => break,
        }
    }

    let mut read_digits = 0;
    for _ in 0..block_len {
        rest = skip_dashes(rest);
        let (&character, tail) = rest.split_first()?;
        if character.is_ascii_digit() {
            read_digits += 1;
        }
        code.push(as_digit(character)?);
        rest = tail;
    }
    if read_digits == 0 {
        return None;
    }

    rest = skip_dashes(rest);
    let (&series, tail) = rest.split_first()?;
    code.push(as_letter(series)?);
    rest = tail;
    while let Some((&character, tail)) = rest.split_first() {
        if !character.is_ascii_uppercase() || as_digit(character).is_some() {
            break;
        }
        code.push(character);
        rest = tail;
    }

    rest = skip_dashes(rest);
    let mut tail_digits = 0;
    while tail_digits < MAX_TAIL_DIGITS {
        let Some((&character, tail)) = rest.split_first() else {
            break;
        };
        let Some(digit) = as_digit(character) else {
            break;
        };
        code.push(digit);
        rest = tail;
        tail_digits += 1;
    }
    if tail_digits == 0 {
        return None;
    }

    if let Some((&'-', suffix)) = rest.split_first() {
        if suffix.is_empty() {
            return None;
        }
        code.push('-');
        for &character in suffix {
            code.push(as_digit(character)?);
        }
        rest = &[];
    }

    rest.is_empty().then_some(code)
}

fn as_digit(character: char) -> Option<char> {
    if character.is_ascii_digit() {
        return Some(character);
    }
    CONFUSION_PAIRS
        .iter()
        .find(|(_, letter)| *letter == character)
        .map(|(digit, _)| *digit)
}

fn as_letter(character: char) -> Option<char> {
    if character.is_ascii_uppercase() {
        return Some(character);
    }
    CONFUSION_PAIRS
        .iter()
        .find(|(digit, _)| *digit == character)
        .map(|(_, letter)| *letter)
}

fn skip_dashes(chars: &[char]) -> &[char] {
    let start = chars
        .iter()
        .position(|character| *character != '-')
        .unwrap_or(chars.len());
    &chars[start..]
}

fn is_separator_noise(character: char) -> bool {
    character.is_whitespace() || matches!(character, '_' | '·' | '.' | '\\' | '/' | ',')
}

fn strip_whitespace(text: &str) -> String {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .collect()
}
