use std::io;

use thiserror::Error;

use crate::Code;

/// Errors while encoding or decoding a stream.
#[derive(Debug, Error)]
pub enum LzwError {
    /// The header names a mode this crate doesn't know.
    #[error("unknown mode tag {0} in stream header")]
    UnknownMode(Code),

    /// The header of a monitor mode stream carries an unusable length.
    #[error("invalid original length {0} in stream header")]
    InvalidLength(f64),

    /// A code word that is neither in the dictionary nor the one about to be defined.
    #[error("invalid code {code}, the next free code is {next}")]
    InvalidCode { code: Code, next: u32 },

    /// The input ended before the end code.
    #[error("no more data but no end code detected")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for LzwError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => LzwError::UnexpectedEof,
            _ => LzwError::Io(err),
        }
    }
}

impl From<LzwError> for io::Error {
    fn from(err: LzwError) -> Self {
        match err {
            LzwError::Io(err) => err,
            LzwError::UnexpectedEof => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// An unrecognised mode selector.
#[derive(Debug, Error)]
#[error("unrecognised mode selector `{selector}`, expected one of n, r, m")]
pub struct ParseModeError {
    selector: String,
}

impl ParseModeError {
    pub(crate) fn new(selector: &str) -> Self {
        ParseModeError {
            selector: selector.to_owned(),
        }
    }
}
