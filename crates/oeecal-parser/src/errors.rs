use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ParserAttempt {
    pub parser: &'static str,
    pub message: String,
}

impl ParserAttempt {
    pub fn new(parser: &'static str, message: impl Into<String>) -> Self {
        Self {
            parser,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParserAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parser, self.message)
    }
}

/// Fatal, whole-load failures. Row-level problems never surface here; they are
/// tallied in [`crate::LoadReport`] instead.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{parser} format mismatch: {reason}")]
    FormatMismatch {
        parser: &'static str,
        reason: String,
    },

    #[error("{parser} CSV error: {source}")]
    Csv {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{parser} source did not contain any data rows")]
    EmptyData { parser: &'static str },

    #[error("no parser recognized this source; attempts: {attempts:?}")]
    NoMatchingParser { attempts: Vec<ParserAttempt> },
}

impl ParserError {
    /// True for errors caused by the shape of the source rather than by the reader.
    pub fn is_source_format(&self) -> bool {
        matches!(
            self,
            ParserError::FormatMismatch { .. }
                | ParserError::EmptyData { .. }
                | ParserError::NoMatchingParser { .. }
        )
    }
}
