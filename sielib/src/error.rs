//! Единый тип ошибок публичного API.
//!
//! `SieError` — фатальные ошибки потока (файл не читается, XML битый,
//! символ не кодируется в PC-8). `ParseError` — ошибки отдельных строк:
//! они не прерывают разбор, а копятся в `Document::errors`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SieError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, SieError>;

/// Причина, по которой строка была пропущена.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{tag}: missing field `{field}`")]
    MissingField {
        tag: &'static str,
        field: &'static str,
    },

    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("voucher row found outside a voucher context")]
    RowOutsideVoucher,

    #[error("voucher block was not terminated")]
    UnterminatedVoucher,
}

/// Ошибка строки вместе с её номером (с 1) и исходным текстом.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub text: String,
    pub kind: LineError,
}

impl ParseError {
    pub fn new(line: usize, text: impl Into<String>, kind: LineError) -> Self {
        Self {
            line,
            text: text.into(),
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error parsing line {}: {} ({})",
            self.line, self.text, self.kind
        )
    }
}

impl std::error::Error for ParseError {}
