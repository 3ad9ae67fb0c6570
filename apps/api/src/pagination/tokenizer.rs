//! Tokenizer — turns one raw line into a lazy, width-bounded token sequence.
//!
//! Each call to [`tokenize`] is independent. The only state that survives a
//! call is the width counter, which the caller reads back through
//! [`Tokenizer::offset`] and threads into the next call so that text reflows
//! across raw lines.
//!
//! # Width rules
//! - A token that fits the remaining budget is emitted whole, including one
//!   that fills the budget exactly.
//! - A word that overflows is split so that the left fragment, continuation
//!   glyph included, fills the line. The right fragment starts the next line.
//! - A word that overflows a budget too small for one character plus the
//!   glyph wraps whole to the next line. On an empty line that narrow it is
//!   emitted whole and overflows, so the sequence always terminates.
//! - Whitespace never starts a line. Whitespace that overflows, or that
//!   arrives within `early_cutoff` of the width, pads out the current line.

use std::collections::VecDeque;

use crate::pagination::language::LanguageProfile;

/// An atomic text unit with known display length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub length: usize,
    /// The unsplit word, when this token is a hyphenation fragment.
    pub continuation_of: Option<String>,
    /// Left fragment of a split: `text` ends with the continuation glyph and
    /// more of the word follows on the next line.
    pub hyphenated: bool,
    /// Synthesized inter-word whitespace.
    pub whitespace: bool,
    /// The width counter was reset before this token: it opens a new line.
    pub line_start: bool,
}

impl Token {
    fn word(text: String, length: usize) -> Self {
        Self {
            text,
            length,
            continuation_of: None,
            hyphenated: false,
            whitespace: false,
            line_start: false,
        }
    }

    fn blank(glyph: &str, length: usize) -> Self {
        Self {
            whitespace: true,
            ..Self::word(glyph.to_string(), length)
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.continuation_of.is_some()
    }
}

/// Lazy token sequence for one raw line. See the module docs for the rules.
pub struct Tokenizer<'p> {
    profile: &'p dyn LanguageProfile,
    queue: VecDeque<Token>,
    line_width: usize,
    early_cutoff: usize,
    counter: usize,
    wrap_pending: bool,
}

/// Tokenizes `line` against `line_width`, starting `offset` characters into
/// the current line.
pub fn tokenize<'p>(
    profile: &'p dyn LanguageProfile,
    line: &str,
    line_width: usize,
    offset: usize,
    early_cutoff: usize,
) -> Tokenizer<'p> {
    Tokenizer {
        profile,
        queue: semantic_tokens(profile, line),
        line_width,
        early_cutoff,
        counter: offset.min(line_width),
        wrap_pending: false,
    }
}

impl<'p> Tokenizer<'p> {
    /// Characters already used on the current line.
    pub fn offset(&self) -> usize {
        self.counter
    }

    fn emit(&mut self, mut token: Token) -> Token {
        token.line_start = std::mem::take(&mut self.wrap_pending);
        token
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let token = self.queue.pop_front()?;
            let remaining = self.line_width.saturating_sub(self.counter);

            if token.whitespace {
                if token.length > remaining || remaining <= self.early_cutoff {
                    self.counter = self.line_width;
                } else {
                    self.counter += token.length;
                }
                return Some(self.emit(token));
            }

            if token.length <= remaining {
                self.counter += token.length;
                return Some(self.emit(token));
            }

            let glyph = self.profile.continuation_glyph();
            let glyph_len = self.profile.measure(glyph);
            if remaining > glyph_len {
                let (left, right) = split_token(self.profile, token, remaining - glyph_len);
                self.queue.push_front(right);
                self.counter = self.line_width;
                return Some(self.emit(left));
            }

            // A line too narrow to hold one character plus the glyph takes
            // the word whole and overflows.
            if self.counter == 0 {
                self.counter = self.line_width;
                return Some(self.emit(token));
            }

            self.counter = 0;
            self.wrap_pending = true;
            self.queue.push_front(token);
        }
    }
}

/// Words and punctuation from the profile, with a whitespace token after
/// every non-punctuation token.
fn semantic_tokens(profile: &dyn LanguageProfile, line: &str) -> VecDeque<Token> {
    let glyph = profile.whitespace_glyph();
    let glyph_len = profile.measure(glyph);
    let mut tokens = VecDeque::new();
    for word in profile.tokenize(line) {
        let punctuation = profile.is_punctuation(&word);
        let length = profile.measure(&word);
        tokens.push_back(Token::word(word, length));
        if !punctuation {
            tokens.push_back(Token::blank(glyph, glyph_len));
        }
    }
    tokens
}

/// Splits `token` after `at` characters. The left fragment carries the
/// continuation glyph; both fragments reference the unsplit word.
fn split_token(profile: &dyn LanguageProfile, token: Token, at: usize) -> (Token, Token) {
    let original = token.continuation_of.unwrap_or_else(|| token.text.clone());
    let byte_idx = token
        .text
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(token.text.len());
    let (head, tail) = token.text.split_at(byte_idx);

    let glyph = profile.continuation_glyph();
    let left_text = format!("{head}{glyph}");
    let left = Token {
        length: profile.measure(&left_text),
        text: left_text,
        continuation_of: Some(original.clone()),
        hyphenated: true,
        ..Token::word(String::new(), 0)
    };
    let right = Token {
        length: profile.measure(tail),
        text: tail.to_string(),
        continuation_of: Some(original),
        ..Token::word(String::new(), 0)
    };
    (left, right)
}
