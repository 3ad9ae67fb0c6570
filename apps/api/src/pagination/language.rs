//! Language Profiles — per-language rules consumed by the tokenizer.
//!
//! Languages that share orthographic conventions share one profile. The set of
//! languages is closed; `Language::select` maps a language code to a variant,
//! falling back to `Language::BASELINE` when the code is unknown.

use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Capability set every language profile provides.
pub trait LanguageProfile: Send + Sync {
    /// Splits one raw line into semantic words and punctuation, in reading
    /// order. Whitespace is not returned.
    fn tokenize(&self, line: &str) -> Vec<String>;

    /// Glyph inserted between words.
    fn whitespace_glyph(&self) -> &str;

    /// Glyph appended to a word fragment broken across a line.
    fn continuation_glyph(&self) -> &str;

    fn is_punctuation(&self, word: &str) -> bool;

    /// Display length of a token, in characters.
    fn measure(&self, text: &str) -> usize {
        text.chars().count()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Standard profile
// ────────────────────────────────────────────────────────────────────────────

const STANDARD_PUNCTUATION: &[&str] = &[".", ",", "?", "!", ";", ":"];

/// Segments that glue two words into one compound ("well-known").
const WORD_JOINERS: &[&str] = &["-", "\u{2010}"];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

fn is_wordlike(segment: &str) -> bool {
    segment.chars().next().is_some_and(is_word_char)
}

/// Western European conventions: Unicode word boundaries with hyphenated
/// compounds kept whole, single blank between words, hyphen continuation.
#[derive(Debug, Default)]
pub struct StandardLanguage;

static STANDARD: StandardLanguage = StandardLanguage;

impl LanguageProfile for StandardLanguage {
    fn tokenize(&self, line: &str) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        // Byte offset where the last pushed segment ends, and whether it ended
        // on a joiner that binds it to the next word.
        let mut last_end = None;
        let mut open_joiner = false;

        for (start, segment) in line.split_word_bound_indices() {
            if segment.chars().all(char::is_whitespace) {
                last_end = None;
                open_joiner = false;
                continue;
            }
            let touching = last_end == Some(start);
            last_end = Some(start + segment.len());

            match words.last_mut() {
                Some(word) if touching && open_joiner && is_wordlike(segment) => {
                    word.push_str(segment);
                    open_joiner = false;
                }
                Some(word)
                    if touching && WORD_JOINERS.contains(&segment) && word.ends_with(is_word_char) =>
                {
                    word.push_str(segment);
                    open_joiner = true;
                }
                _ => {
                    words.push(segment.to_string());
                    open_joiner = false;
                }
            }
        }
        words
    }

    fn whitespace_glyph(&self) -> &str {
        " "
    }

    fn continuation_glyph(&self) -> &str {
        "-"
    }

    fn is_punctuation(&self, word: &str) -> bool {
        STANDARD_PUNCTUATION.contains(&word)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Selector
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    German,
}

impl Language {
    pub const BASELINE: Language = Language::English;

    /// Exact lookup, case-insensitive. Accepts full names and ISO 639-1 codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Some(Language::English),
            "german" | "de" | "deutsch" => Some(Language::German),
            _ => None,
        }
    }

    /// Lookup with fallback to the baseline language.
    pub fn select(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            warn!(
                language = code,
                fallback = Self::BASELINE.code(),
                "Unknown language code, using baseline profile"
            );
            Self::BASELINE
        })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::German => "german",
        }
    }

    pub fn profile(&self) -> &'static dyn LanguageProfile {
        match self {
            Language::English | Language::German => &STANDARD,
        }
    }
}
