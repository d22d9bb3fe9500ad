//! # Adaptive LZW decoder and encoder
//!
//! This crate provides an [`Encoder`] and a [`Decoder`] for LZW over the full byte alphabet.
//! Code words start out 9 bits wide and grow one bit at a time up to 16 bits as the dictionary
//! fills. What happens once the 16 bit dictionary is full is decided by the [`Mode`]:
//!
//!  * [`Mode::Fixed`] keeps using the full dictionary without learning anything new.
//!  * [`Mode::Reset`] drops back to the 256 single byte entries and 9 bit codes.
//!  * [`Mode::Monitor`] resets only once the compression ratio has degraded by more than 10%
//!    relative to the best ratio observed since the last reset.
//!
//! A stream starts with a 9 bit mode tag, followed by the original length as a 64 bit float when
//! the mode is [`Mode::Monitor`]. It ends with the code `END_CODE == 256`. Bits are written most
//! significant first and the last byte is padded with zeros.
//!
//! Exemplary use of the encoder:
//!
//! ```
//! use adalzw::{Mode, encode::Encoder, decode::Decoder};
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//!
//! let compressed = Encoder::new(Mode::Reset).encode(data).unwrap();
//! let decompressed = Decoder::new().decode(&compressed).unwrap();
//! assert_eq!(decompressed, data);
//! ```
use core::fmt;
use core::str::FromStr;

pub mod bits;
pub mod decode;
pub mod encode;
mod error;
mod width;

pub use crate::decode::Decoder;
pub use crate::encode::Encoder;
pub use crate::error::{LzwError, ParseModeError};

/// Code size of the header field and of the first code words after a reset.
pub const MIN_CODESIZE: u8 = 9;
/// The largest code size. Dictionaries never grow beyond `1 << MAX_CODESIZE` entries.
pub const MAX_CODESIZE: u8 = 16;
/// Number of single byte entries every dictionary starts out with.
pub const ALPHABET: u16 = 256;
/// The code marking the end of the stream.
pub const END_CODE: Code = ALPHABET;
/// The first code assigned to a multi-byte sequence.
pub const FIRST_CODE: Code = ALPHABET + 1;
/// Monitor mode resets once `best_ratio / current_ratio` exceeds this value.
pub const RESET_THRESHOLD: f64 = 1.1;

pub(crate) const MAX_ENTRIES: usize = 1 << MAX_CODESIZE as usize;

/// Alias for a LZW code point
pub type Code = u16;

/// What to do once the dictionary is full at the maximum code size.
///
/// The mode is chosen by the encoder and transmitted in the stream header, the decoder picks it
/// up from there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Stop learning, keep using the full dictionary.
    Fixed,
    /// Reset the dictionary as soon as it is full.
    Reset,
    /// Reset the dictionary when the compression ratio degrades.
    Monitor,
}

impl Mode {
    /// All modes, in the order of their header tags.
    pub const ALL: [Mode; 3] = [Mode::Fixed, Mode::Reset, Mode::Monitor];

    /// The value written to the stream header.
    pub fn tag(self) -> Code {
        match self {
            Mode::Fixed => 0,
            Mode::Reset => 1,
            Mode::Monitor => 2,
        }
    }

    /// Whether the header carries the original input length.
    pub(crate) fn has_length(self) -> bool {
        matches!(self, Mode::Monitor)
    }
}

impl TryFrom<Code> for Mode {
    type Error = LzwError;

    fn try_from(tag: Code) -> Result<Self, LzwError> {
        match tag {
            0 => Ok(Mode::Fixed),
            1 => Ok(Mode::Reset),
            2 => Ok(Mode::Monitor),
            other => Err(LzwError::UnknownMode(other)),
        }
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(selector: &str) -> Result<Self, ParseModeError> {
        match selector {
            "n" | "fixed" => Ok(Mode::Fixed),
            "r" | "reset" => Ok(Mode::Reset),
            "m" | "monitor" => Ok(Mode::Monitor),
            other => Err(ParseModeError::new(other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Fixed => "fixed",
            Mode::Reset => "reset",
            Mode::Monitor => "monitor",
        })
    }
}

/// Dictionary state at the end of a run.
///
/// Encoder and decoder of the same stream report identical statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// The code size in bits used for the end code.
    pub code_size: u8,
    /// Number of byte sequences in the dictionary, single bytes included.
    pub dictionary_len: usize,
    /// Number of code words, not counting the end code.
    pub codewords: u64,
    /// Number of times the dictionary was reset.
    pub resets: u32,
}

/// The result of coding from a reader into a writer.
pub struct AllResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    /// The final status.
    pub status: Result<(), LzwError>,
}
