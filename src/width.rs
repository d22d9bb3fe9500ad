//! Code size growth and the dictionary reset policies.
//!
//! Encoder and decoder each own one [`Controller`] and drive it with the same sequence of calls:
//! [`Controller::account`] after every code word, [`Controller::make_room`] after every code word
//! that is not the end code, and [`Controller::assign`] whenever a new dictionary entry is learned.
//! Since the decoder learns the entry of code word `n` only when reading code word `n + 1`, the
//! encoder calls `make_room` after writing a code word and the decoder before reading the next.
use tracing::{debug, trace};

use crate::{Code, Mode, Stats, FIRST_CODE, MAX_CODESIZE, MIN_CODESIZE, RESET_THRESHOLD};

/// The outcome of [`Controller::make_room`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Growth {
    /// There is a free code at the current size.
    Room,
    /// The code size was increased by one bit.
    Widened,
    /// The dictionary must be reset to its initial entries.
    Reset,
    /// No code is free and none will be made.
    Saturated,
}

pub(crate) struct Controller {
    mode: Mode,
    /// The current code size.
    code_size: u8,
    /// The next code to assign.
    next_code: u32,
    /// The length of the uncompressed data, only used by the monitor.
    original_len: f64,
    /// Bytes attributed to the code words so far, `code_size / 8` per code word.
    emitted: u64,
    /// Best ratio since the last reset, zero while unset.
    best_ratio: f64,
    codewords: u64,
    resets: u32,
}

impl Controller {
    pub(crate) fn new(mode: Mode, original_len: f64) -> Self {
        Controller {
            mode,
            code_size: MIN_CODESIZE,
            next_code: u32::from(FIRST_CODE),
            original_len,
            emitted: 0,
            best_ratio: 0.0,
            codewords: 0,
            resets: 0,
        }
    }

    pub(crate) fn code_size(&self) -> u8 {
        self.code_size
    }

    /// One past the largest code of the current code size.
    pub(crate) fn limit(&self) -> u32 {
        1 << self.code_size
    }

    pub(crate) fn next_code(&self) -> u32 {
        self.next_code
    }

    /// Record one code word of the current size.
    pub(crate) fn account(&mut self) {
        self.emitted += u64::from(self.code_size / 8);
        self.codewords += 1;
    }

    /// Ensure a free code is available, growing or resetting as the mode demands.
    pub(crate) fn make_room(&mut self) -> Growth {
        if self.next_code < self.limit() {
            return Growth::Room;
        }

        if self.code_size < MAX_CODESIZE {
            self.code_size += 1;
            trace!(code_size = self.code_size, "increased code size");
            return Growth::Widened;
        }

        match self.mode {
            Mode::Fixed => Growth::Saturated,
            Mode::Reset => {
                self.reset();
                Growth::Reset
            }
            Mode::Monitor => {
                let current = self.original_len / self.emitted as f64;
                if self.best_ratio == 0.0 {
                    trace!(ratio = current, "first ratio measurement");
                    self.best_ratio = current;
                    Growth::Saturated
                } else if self.best_ratio / current > RESET_THRESHOLD {
                    debug!(best = self.best_ratio, current, "compression ratio degraded");
                    self.best_ratio = current;
                    self.reset();
                    Growth::Reset
                } else {
                    Growth::Saturated
                }
            }
        }
    }

    /// Take the next free code, if any.
    pub(crate) fn assign(&mut self) -> Option<Code> {
        if self.next_code < self.limit() {
            let code = self.next_code as Code;
            self.next_code += 1;
            Some(code)
        } else {
            None
        }
    }

    pub(crate) fn stats(&self) -> Stats {
        Stats {
            code_size: self.code_size,
            // The end code occupies a slot but no sequence.
            dictionary_len: self.next_code as usize - 1,
            codewords: self.codewords,
            resets: self.resets,
        }
    }

    fn reset(&mut self) {
        self.code_size = MIN_CODESIZE;
        self.next_code = u32::from(FIRST_CODE);
        self.resets += 1;
        debug!(mode = %self.mode, resets = self.resets, "dictionary reset");
    }
}
