use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// (owner, title, author) — the key replace semantics operate on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub owner: String,
    pub title: String,
    pub author: String,
}

impl ResourceIdentity {
    pub fn new(owner: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            title: title.into(),
            author: author.into(),
        }
    }
}

/// One stored document in an owner's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentSummary {
    pub title: String,
    pub author: String,
}

/// A raw document submitted for upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub owner: String,
    pub title: String,
    pub author: String,
    pub language: String,
    pub lines: Vec<String>,
}

impl DocumentDescriptor {
    /// Builds a descriptor from a block of text, one raw line per `\n`.
    pub fn from_text(
        owner: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        language: impl Into<String>,
        text: &str,
    ) -> Self {
        Self {
            owner: owner.into(),
            title: title.into(),
            author: author.into(),
            language: language.into(),
            lines: text.lines().map(String::from).collect(),
        }
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.owner, &self.title, &self.author)
    }

    /// Rejects descriptors that cannot be stored or addressed.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("owner", &self.owner),
            ("title", &self.title),
            ("author", &self.author),
        ] {
            if value.trim().is_empty() {
                return Err(format!("document {field} must not be blank"));
            }
        }
        if let Some(idx) = self.lines.iter().position(|l| l.contains('\0')) {
            return Err(format!("line {} contains a NUL character", idx + 1));
        }
        Ok(())
    }
}
