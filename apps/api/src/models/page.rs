//! Page records — the unit of persistence produced by the pagination engine.
//!
//! The serialized shape of `PageContent` is what clients receive from the
//! retrieval endpoints and what is stored in the `pages.content` column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Address of a single word on a page: 1-based page, 0-based line and position.
///
/// Cross-page pointers that land on a page without words address the blank
/// line slot at position 0 instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PagePointer {
    pub page: u32,
    pub line: u32,
    pub pos: u32,
}

impl PagePointer {
    pub fn new(page: u32, line: u32, pos: u32) -> Self {
        Self { page, line, pos }
    }
}

/// One boundary-ledger entry: the full (unsplit) text of a word and every
/// on-screen coordinate it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub fulltext: String,
    pub positions: Vec<PagePointer>,
}

impl LedgerEntry {
    pub fn new(fulltext: impl Into<String>, at: PagePointer) -> Self {
        Self {
            fulltext: fulltext.into(),
            positions: vec![at],
        }
    }
}

#[cfg(test)]
impl LedgerEntry {
    /// True when the word was broken across lines (two or more fragments).
    pub fn is_split(&self) -> bool {
        self.positions.len() > 1
    }
}

/// Cross-page pointers. `None` is the empty sentinel (no adjacent page).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageBoundaries {
    pub previous: Option<PagePointer>,
    pub next: Option<PagePointer>,
}

/// Per-page record of line-start/line-end words and hyphenation splits.
///
/// `line_start_positions[i]` / `line_end_positions[i]` index into `tokens`
/// for line `i`; blank lines carry `None` in both lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLedger {
    pub tokens: Vec<LedgerEntry>,
    #[serde(rename = "start")]
    pub line_start_positions: Vec<Option<usize>>,
    #[serde(rename = "end")]
    pub line_end_positions: Vec<Option<usize>>,
    #[serde(rename = "pageBoundaries")]
    pub page_boundaries: PageBoundaries,
}

#[cfg(test)]
impl BoundaryLedger {
    pub fn line_start(&self, line: usize) -> Option<&LedgerEntry> {
        let idx = (*self.line_start_positions.get(line)?)?;
        self.tokens.get(idx)
    }

    pub fn line_end(&self, line: usize) -> Option<&LedgerEntry> {
        let idx = (*self.line_end_positions.get(line)?)?;
        self.tokens.get(idx)
    }
}

/// Word grid plus boundary ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub words: Vec<Vec<String>>,
    pub breaks: BoundaryLedger,
}

/// Resource metadata carried by every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub author: String,
    pub language: String,
    pub page_number: u32,
}

/// A committed page, ready to be handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub owner: String,
    pub resource: Resource,
    pub content: PageContent,
}

impl Page {
    pub fn number(&self) -> u32 {
        self.resource.page_number
    }
}

/// Row shape of the `pages` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PageRow {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub author: String,
    pub language: String,
    pub page_number: i32,
    pub upload_id: Uuid,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PageRow> for Page {
    type Error = serde_json::Error;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        Ok(Page {
            owner: row.owner,
            resource: Resource {
                title: row.title,
                author: row.author,
                language: row.language,
                page_number: row.page_number.max(0) as u32,
            },
            content: serde_json::from_value(row.content)?,
        })
    }
}
