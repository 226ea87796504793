//! Core domain types: position side and the journal row.

use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::error::JournalError;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Long,
    Short,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Long => "long",
            Position::Short => "short",
        }
    }
}

impl FromStr for Position {
    type Err = JournalError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Position::Long),
            "short" => Ok(Position::Short),
            _ => Err(JournalError::InvalidArgument(
                "position must be 'long' or 'short'".to_string(),
            )),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One journal row, built per command and handed to a `RowSink`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JournalEntry {
    pub timestamp_local: String,
    pub user: String,
    pub message_id: String,
    pub ticker: String,
    pub position: Position,
    pub price_open: f64,
    pub price_close: Option<f64>,
    // both Some iff price_close is Some
    pub gain_loss: Option<f64>,
    pub gain_loss_percent: Option<f64>,
}
