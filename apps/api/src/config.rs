use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Which `PageStore` backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("PAGE_STORE must be 'postgres' or 'memory', got '{other}'"),
        }
    }
}

/// Largest `batch_size` a single multi-row INSERT can carry: Postgres allows
/// 65535 bind parameters per statement and each page row binds 8.
pub const MAX_BATCH_SIZE: usize = u16::MAX as usize / 8;

/// Segmentation and batching parameters for document uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Characters per line.
    pub line_width: usize,
    /// Lines per page.
    pub page_length: usize,
    /// Whitespace arriving within this many characters of the line width pads
    /// out the line instead of being placed normally.
    pub early_cutoff: usize,
    /// Pages per bulk insert.
    pub batch_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            line_width: 60,
            page_length: 30,
            early_cutoff: 0,
            batch_size: 20,
        }
    }
}

impl PaginationSettings {
    /// Checks the settings against a continuation glyph of `glyph_len`
    /// characters. A line must hold at least one character plus the glyph.
    pub fn validate(&self, glyph_len: usize) -> Result<(), String> {
        if self.line_width == 0 {
            return Err("line_width must be greater than 0".to_string());
        }
        if self.line_width <= glyph_len {
            return Err(format!(
                "line_width ({}) must exceed the continuation glyph length ({glyph_len})",
                self.line_width
            ));
        }
        if self.page_length == 0 {
            return Err("page_length must be greater than 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(format!(
                "batch_size ({}) must not exceed {MAX_BATCH_SIZE}",
                self.batch_size
            ));
        }
        Ok(())
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub page_store: StoreBackend,
    pub port: u16,
    pub rust_log: String,
    pub pagination: PaginationSettings,
    pub default_language: String,
    pub page_range_default_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let page_store: StoreBackend = parse_or(&lookup, "PAGE_STORE", StoreBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL");
        if page_store == StoreBackend::Postgres && database_url.is_none() {
            bail!("Required environment variable 'DATABASE_URL' is not set");
        }

        let defaults = PaginationSettings::default();
        let pagination = PaginationSettings {
            line_width: parse_or(&lookup, "LINE_WIDTH", defaults.line_width)?,
            page_length: parse_or(&lookup, "PAGE_LENGTH", defaults.page_length)?,
            early_cutoff: parse_or(&lookup, "EARLY_CUTOFF", defaults.early_cutoff)?,
            batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.batch_size)?,
        };

        Ok(Config {
            database_url,
            page_store,
            port: parse_or(&lookup, "PORT", 8080u16)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            pagination,
            default_language: lookup("DEFAULT_LANGUAGE").unwrap_or_else(|| "english".to_string()),
            page_range_default_size: parse_or(&lookup, "PAGE_RANGE_DEFAULT_SIZE", 10u32)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}
