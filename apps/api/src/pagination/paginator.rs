//! Pagination State Machine — consumes tokens, builds lines and pages, keeps
//! the boundary ledger and resolves cross-page pointers.
//!
//! # States
//! - Accumulating a line: tokens are appended to the open line of `current`.
//! - Line complete: a token flagged `line_start`, a blank raw line, or the end
//!   of the document closes the open line and records its ledger boundaries.
//! - Page pending lookahead: when a token or blank line must open a line on a
//!   page that already holds `page_length` lines, that page moves into the
//!   `pending` slot and a fresh page replaces it.
//! - Page committed: the first word placed on the fresh page resolves
//!   `pending.next` and the page leaves the paginator.
//!
//! # Cross-page pointers
//! Pointers stay on the adjacent page. `previous` on page N+1 is the last word
//! of page N and `next` on page N is the first word of page N+1. When the
//! adjacent page holds no words, the pointer addresses a blank line slot:
//! `previous` the last line of page N, `next` the first line of page N+1. The
//! second case commits `pending` when page N+1 itself freezes, or at
//! [`Paginator::finish`].
//!
//! The final page is emitted by [`Paginator::finish`] with `next` left empty.

use tracing::debug;

use crate::config::PaginationSettings;
use crate::models::document::ResourceIdentity;
use crate::models::page::{BoundaryLedger, LedgerEntry, Page, PageContent, PagePointer, Resource};
use crate::pagination::language::LanguageProfile;
use crate::pagination::tokenizer::{tokenize, Token};

// ────────────────────────────────────────────────────────────────────────────
// Page under construction
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct PageBuilder {
    number: u32,
    lines: Vec<Vec<String>>,
    line: Vec<String>,
    ledger: BoundaryLedger,
    /// Ledger index of the open line's first word.
    line_start: Option<usize>,
    /// Position on the open line of its last word, with the word's ledger
    /// index when it already has one.
    line_end: Option<(u32, Option<usize>)>,
    /// Ledger index of a word whose fragments are still arriving.
    open_split: Option<usize>,
    /// Last word placed on this page.
    last_word: Option<PagePointer>,
}

impl PageBuilder {
    fn new(number: u32) -> Self {
        Self {
            number,
            lines: Vec::new(),
            line: Vec::new(),
            ledger: BoundaryLedger::default(),
            line_start: None,
            line_end: None,
            open_split: None,
            last_word: None,
        }
    }

    /// The page that follows this one. A word split across the page break
    /// keeps a ledger entry on both pages.
    fn successor(&self) -> Self {
        let mut next = Self::new(self.number + 1);
        if let Some(idx) = self.open_split {
            next.ledger.tokens.push(self.ledger.tokens[idx].clone());
            next.open_split = Some(0);
        }
        next.ledger.page_boundaries.previous = Some(self.last_word.unwrap_or_else(|| {
            PagePointer::new(self.number, self.lines.len().saturating_sub(1) as u32, 0)
        }));
        next
    }

    fn line_open(&self) -> bool {
        !self.line.is_empty()
    }

    fn cursor(&self) -> PagePointer {
        PagePointer::new(self.number, self.lines.len() as u32, self.line.len() as u32)
    }

    fn record(&mut self, entry: LedgerEntry) -> usize {
        self.ledger.tokens.push(entry);
        self.ledger.tokens.len() - 1
    }

    fn place_token(&mut self, token: Token) -> PagePointer {
        let at = self.cursor();
        let opens_line = !self.line_open();

        let entry = match (&token.continuation_of, self.open_split) {
            (Some(_), Some(idx)) => {
                self.ledger.tokens[idx].positions.push(at);
                Some(idx)
            }
            (Some(original), None) => Some(self.record(LedgerEntry::new(original.clone(), at))),
            (None, _) if opens_line => Some(self.record(LedgerEntry::new(token.text.clone(), at))),
            (None, _) => None,
        };

        if opens_line {
            self.line_start = entry;
        }
        if token.is_fragment() {
            self.open_split = if token.hyphenated { entry } else { None };
        }
        if !token.whitespace {
            self.line_end = Some((at.pos, entry));
            self.last_word = Some(at);
        }
        self.line.push(token.text);
        at
    }

    fn place_blank_line(&mut self) {
        self.lines.push(Vec::new());
        self.ledger.line_start_positions.push(None);
        self.ledger.line_end_positions.push(None);
    }

    /// Closes the open line. Its end boundary is the last word on it, never
    /// the padding that follows.
    fn close_line(&mut self) {
        if !self.line_open() {
            return;
        }

        let end = match self.line_end.take() {
            Some((_, Some(idx))) => Some(idx),
            Some((pos, None)) => {
                let at = PagePointer::new(self.number, self.lines.len() as u32, pos);
                let entry = LedgerEntry::new(self.line[pos as usize].clone(), at);
                Some(self.record(entry))
            }
            None => self.line_start,
        };

        self.ledger.line_start_positions.push(self.line_start.take());
        self.ledger.line_end_positions.push(end);
        self.lines.push(std::mem::take(&mut self.line));
    }

    fn into_page(self, identity: &ResourceIdentity, language: &str) -> Page {
        Page {
            owner: identity.owner.clone(),
            resource: Resource {
                title: identity.title.clone(),
                author: identity.author.clone(),
                language: language.to_string(),
                page_number: self.number,
            },
            content: PageContent {
                words: self.lines,
                breaks: self.ledger,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

/// One paginator per document. Feed raw lines in order with
/// [`accept_line`](Paginator::accept_line), then call
/// [`finish`](Paginator::finish) for the remaining pages.
pub struct Paginator<'p> {
    profile: &'p dyn LanguageProfile,
    settings: PaginationSettings,
    identity: ResourceIdentity,
    language: String,
    current: PageBuilder,
    /// Frozen page waiting for the first word of the page after it.
    pending: Option<PageBuilder>,
    /// Width already used on the open line, carried between raw lines.
    offset: usize,
}

impl<'p> Paginator<'p> {
    /// Fails when `settings` cannot paginate with `profile`'s continuation
    /// glyph.
    pub fn new(
        profile: &'p dyn LanguageProfile,
        settings: PaginationSettings,
        identity: ResourceIdentity,
        language: impl Into<String>,
    ) -> Result<Self, String> {
        settings.validate(profile.measure(profile.continuation_glyph()))?;
        Ok(Self {
            profile,
            settings,
            identity,
            language: language.into(),
            current: PageBuilder::new(1),
            pending: None,
            offset: 0,
        })
    }

    /// Consumes one raw line. Returns the pages committed while doing so, in
    /// page-number order.
    pub fn accept_line(&mut self, raw: &str) -> Vec<Page> {
        let raw = raw.trim_end_matches(['\r', '\n']);
        let mut committed = Vec::new();

        if raw.trim().is_empty() {
            self.offset = 0;
            self.accept_blank_line(&mut committed);
            return committed;
        }

        let profile = self.profile;
        let mut tokens = tokenize(
            profile,
            raw,
            self.settings.line_width,
            self.offset,
            self.settings.early_cutoff,
        );
        for token in tokens.by_ref() {
            self.accept_token(token, &mut committed);
        }
        self.offset = tokens.offset();
        committed
    }

    /// Closes the document and returns the pages still held, in page-number
    /// order. The last one has no `next` pointer; for an empty document it is
    /// page 1 with no lines.
    pub fn finish(mut self) -> Vec<Page> {
        self.current.close_line();
        let mut committed = Vec::with_capacity(2);
        if let Some(pending) = self.pending.take() {
            let next = PagePointer::new(self.current.number, 0, 0);
            committed.push(self.commit(pending, next));
        }
        committed.push(self.current.into_page(&self.identity, &self.language));
        committed
    }

    fn accept_token(&mut self, token: Token, committed: &mut Vec<Page>) {
        if token.line_start {
            self.current.close_line();
        }
        self.freeze_if_full(committed);

        let whitespace = token.whitespace;
        let at = self.current.place_token(token);
        if whitespace {
            return;
        }
        if let Some(pending) = self.pending.take() {
            committed.push(self.commit(pending, at));
        }
    }

    fn accept_blank_line(&mut self, committed: &mut Vec<Page>) {
        self.current.close_line();
        self.freeze_if_full(committed);
        self.current.place_blank_line();
    }

    /// Moves `current` into the pending slot when it has no room for another
    /// line. A page still pending at that point saw no word on its successor,
    /// so it is committed pointing at the successor's first blank line.
    fn freeze_if_full(&mut self, committed: &mut Vec<Page>) {
        if self.current.line_open() || self.current.lines.len() < self.settings.page_length {
            return;
        }
        if let Some(stale) = self.pending.take() {
            let next = PagePointer::new(self.current.number, 0, 0);
            committed.push(self.commit(stale, next));
        }

        let fresh = self.current.successor();
        let frozen = std::mem::replace(&mut self.current, fresh);
        debug!(
            page_number = frozen.number,
            lines = frozen.lines.len(),
            "Page frozen awaiting lookahead"
        );
        self.pending = Some(frozen);
    }

    /// Fills `pending.next` and commits it.
    fn commit(&self, mut pending: PageBuilder, next: PagePointer) -> Page {
        pending.ledger.page_boundaries.next = Some(next);
        if let Some(idx) = pending.open_split {
            pending.ledger.tokens[idx].positions.push(next);
        }
        debug!(
            page_number = pending.number,
            next_page = next.page,
            "Lookahead resolved, page committed"
        );
        pending.into_page(&self.identity, &self.language)
    }
}
