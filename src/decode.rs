//! A module for all decoding needs.
use std::io::{BufRead, Write};

use bitstream_io::{BigEndian, BitReader};
use tracing::debug;

use crate::bits::{BitSource, Counter};
use crate::width::{Controller, Growth};
use crate::{
    AllResult, Code, LzwError, Mode, Stats, ALPHABET, END_CODE, MAX_ENTRIES, MIN_CODESIZE,
};

/// The state for decoding data with an adaptive LZW dictionary.
///
/// The mode of a stream is read from its header, so the same decoder can be used for streams of
/// any mode.
pub struct Decoder {
    mode: Option<Mode>,
    stats: Stats,
}

/// A decoding stream sink.
///
/// See [`Decoder::into_stream`] on how to create this type and more information.
///
/// [`Decoder::into_stream`]: struct.Decoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Link {
    /// A single byte.
    Base(u8),
    /// The sequence of an earlier code followed by one byte.
    Derived { prefix: Code, byte: u8 },
    /// A sequence whose prefix was dropped by a reset, stored in [`Table::carried`].
    Carried,
    /// The slot of the end code.
    End,
}

struct Table {
    inner: Vec<Link>,
    depths: Vec<u32>,
    /// Bytes of the one [`Link::Carried`] entry.
    carried: Vec<u8>,
}

struct DecodeState {
    /// The table of decoded codes.
    table: Table,
    /// Code size and reset policy.
    ctl: Controller,
    /// The sequence of the previous code.
    last: Vec<u8>,
    /// The previous code, unless it belongs to a dictionary that has been reset since.
    last_code: Option<Code>,
    /// The sequence of the current code.
    current: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            mode: None,
            stats: Stats::default(),
        }
    }

    /// The mode found in the header of the most recent stream.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Statistics of the most recently decoded stream.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Decode a complete stream into a new buffer.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>, LzwError> {
        let mut out = Vec::with_capacity(data.len() * 2);
        let mut source = BitReader::endian(data, BigEndian);
        self.decode_from(&mut source, &mut out)?;
        Ok(out)
    }

    /// Decode a complete stream from a bit source into a writer.
    ///
    /// Reads the header and then code words up to and including the end code, nothing beyond.
    pub fn decode_from(
        &mut self,
        source: &mut impl BitSource,
        mut out: impl Write,
    ) -> Result<(), LzwError> {
        self.mode = None;
        self.stats = Stats::default();

        let mode = Mode::try_from(source.read_code(MIN_CODESIZE)?)?;
        let original_len = if mode.has_length() {
            let len = source.read_f64()?;
            if !len.is_finite() || len < 0.0 {
                return Err(LzwError::InvalidLength(len));
            }
            len
        } else {
            0.0
        };
        self.mode = Some(mode);
        debug!(%mode, original_len, "decoding");

        let mut state = DecodeState::new(mode, original_len);
        let result = state.run(source, &mut out);
        self.stats = state.ctl.stats();
        result?;

        out.flush()?;
        debug!(stats = ?self.stats, "finished decoding");
        Ok(())
    }

    /// Construct a decoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            decoder: self,
            writer,
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Decode data from a reader.
    ///
    /// Stops after the end code, any data following it is left in the reader.
    pub fn decode_all(self, read: impl BufRead) -> AllResult {
        let IntoStream { decoder, writer } = self;
        let mut read = Counter::new(read);
        let mut writer = Counter::new(writer);

        let status = {
            let mut source = BitReader::endian(&mut read, BigEndian);
            decoder.decode_from(&mut source, &mut writer)
        };

        AllResult {
            bytes_read: read.count(),
            bytes_written: writer.count(),
            status,
        }
    }
}

impl DecodeState {
    fn new(mode: Mode, original_len: f64) -> Self {
        DecodeState {
            table: Table::new(),
            ctl: Controller::new(mode, original_len),
            last: Vec::new(),
            last_code: None,
            current: Vec::new(),
        }
    }

    fn run(&mut self, source: &mut impl BitSource, out: &mut impl Write) -> Result<(), LzwError> {
        let first = source.read_code(self.ctl.code_size())?;
        if first == END_CODE {
            return Ok(());
        }
        if first > END_CODE {
            return Err(LzwError::InvalidCode {
                code: first,
                next: self.ctl.next_code(),
            });
        }

        self.ctl.account();
        self.last.push(first as u8);
        self.last_code = Some(first);
        out.write_all(&self.last)?;

        loop {
            // Mirrors the encoder, which made room right after writing the previous code.
            if self.ctl.make_room() == Growth::Reset {
                self.table.reset();
                self.last_code = None;
            }

            let code = source.read_code(self.ctl.code_size())?;
            if code == END_CODE {
                return Ok(());
            }
            self.ctl.account();

            let next = self.ctl.next_code();
            if u32::from(code) == next {
                // The code being defined right now: the last sequence and its own first byte.
                self.current.clear();
                self.current.extend_from_slice(&self.last);
                self.current.push(self.last[0]);
            } else if u32::from(code) < next {
                self.table.reconstruct(code, &mut self.current);
            } else {
                return Err(LzwError::InvalidCode { code, next });
            }

            out.write_all(&self.current)?;

            if self.ctl.assign().is_some() {
                let byte = self.current[0];
                match self.last_code {
                    Some(prefix) => self.table.derive(prefix, byte),
                    None => self.table.carry(&self.last, byte),
                }
            }

            core::mem::swap(&mut self.last, &mut self.current);
            self.last_code = Some(code);
        }
    }
}

impl Table {
    fn new() -> Self {
        let mut table = Table {
            inner: Vec::with_capacity(MAX_ENTRIES),
            depths: Vec::with_capacity(MAX_ENTRIES),
            carried: Vec::new(),
        };
        for byte in 0..ALPHABET {
            table.inner.push(Link::Base(byte as u8));
            table.depths.push(1);
        }
        table.inner.push(Link::End);
        table.depths.push(0);
        table
    }

    fn reset(&mut self) {
        let initial = usize::from(END_CODE) + 1;
        self.inner.truncate(initial);
        self.depths.truncate(initial);
        self.carried.clear();
    }

    fn derive(&mut self, prefix: Code, byte: u8) {
        let depth = self.depths[usize::from(prefix)] + 1;
        self.inner.push(Link::Derived { prefix, byte });
        self.depths.push(depth);
    }

    fn carry(&mut self, prefix: &[u8], byte: u8) {
        self.carried.clear();
        self.carried.extend_from_slice(prefix);
        self.carried.push(byte);
        self.inner.push(Link::Carried);
        self.depths.push(self.carried.len() as u32);
    }

    /// Write the sequence of a known `code` into `out`, replacing its contents.
    fn reconstruct(&self, code: Code, out: &mut Vec<u8>) {
        let depth = self.depths[usize::from(code)] as usize;
        out.clear();
        out.resize(depth, 0);

        let mut code = code;
        let mut end = depth;
        loop {
            match self.inner[usize::from(code)] {
                Link::Derived { prefix, byte } => {
                    end -= 1;
                    out[end] = byte;
                    code = prefix;
                }
                Link::Base(byte) => {
                    out[end - 1] = byte;
                    break;
                }
                Link::Carried => {
                    out[..end].copy_from_slice(&self.carried);
                    break;
                }
                Link::End => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bitstream_io::{BigEndian, BitWriter};

    use super::{Decoder, Link, Table};
    use crate::bits::BitSink;
    use crate::width::Controller;
    use crate::{Code, LzwError, Mode, END_CODE, MAX_ENTRIES, MIN_CODESIZE};

    /// Write `codes` at the code sizes a decoder of `mode` expects.
    fn stream(mode: Mode, codes: &[Code]) -> Vec<u8> {
        let mut out = vec![];
        {
            let mut sink = BitWriter::endian(&mut out, BigEndian);
            sink.write_code(MIN_CODESIZE, mode.tag()).unwrap();
            let mut ctl = Controller::new(mode, 0.0);
            for (idx, &code) in codes.iter().enumerate() {
                if idx > 0 {
                    ctl.make_room();
                }
                sink.write_code(ctl.code_size(), code).unwrap();
                if code != END_CODE {
                    ctl.account();
                    if idx > 0 {
                        ctl.assign();
                    }
                }
            }
            sink.finish().unwrap();
        }
        out
    }

    #[test]
    fn self_reference() {
        let data = stream(Mode::Fixed, &[65, 257, 258, END_CODE]);
        let mut decoder = Decoder::new();
        assert_eq!(decoder.decode(&data).unwrap(), b"AAAAAA");
        assert_eq!(decoder.mode(), Some(Mode::Fixed));
        assert_eq!(decoder.stats().dictionary_len, 258);
    }

    #[test]
    fn empty() {
        let data = stream(Mode::Reset, &[END_CODE]);
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&data).unwrap().is_empty());
        assert_eq!(decoder.stats().codewords, 0);
    }

    #[test]
    fn undefined_code() {
        let data = stream(Mode::Fixed, &[65, 258, END_CODE]);
        let err = Decoder::new().decode(&data).unwrap_err();
        assert!(matches!(err, LzwError::InvalidCode { code: 258, next: 257 }), "{:?}", err);
    }

    #[test]
    fn first_code_must_be_a_byte() {
        let data = stream(Mode::Fixed, &[257, END_CODE]);
        let err = Decoder::new().decode(&data).unwrap_err();
        assert!(matches!(err, LzwError::InvalidCode { code: 257, .. }), "{:?}", err);
    }

    #[test]
    fn unknown_mode() {
        let mut out = vec![];
        {
            let mut sink = BitWriter::endian(&mut out, BigEndian);
            sink.write_code(MIN_CODESIZE, 3).unwrap();
            sink.write_code(MIN_CODESIZE, END_CODE).unwrap();
            sink.finish().unwrap();
        }
        let err = Decoder::new().decode(&out).unwrap_err();
        assert!(matches!(err, LzwError::UnknownMode(3)), "{:?}", err);
    }

    #[test]
    fn invalid_length() {
        let mut out = vec![];
        {
            let mut sink = BitWriter::endian(&mut out, BigEndian);
            sink.write_code(MIN_CODESIZE, Mode::Monitor.tag()).unwrap();
            sink.write_f64(f64::NAN).unwrap();
            sink.write_code(MIN_CODESIZE, END_CODE).unwrap();
            sink.finish().unwrap();
        }
        let err = Decoder::new().decode(&out).unwrap_err();
        assert!(matches!(err, LzwError::InvalidLength(_)), "{:?}", err);
    }

    #[test]
    fn carries_sequence_over_reset() {
        // Fill the dictionary with runs of `A`, the last code before the reset is `AA`.
        let fill = MAX_ENTRIES - 257;
        let mut codes = vec![65; fill];
        codes.push(257);
        // After the reset 257 becomes `AA` + `A` and 258 its extension.
        codes.extend_from_slice(&[257, 258, 257, 258, END_CODE]);
        let data = stream(Mode::Reset, &codes);

        let mut decoder = Decoder::new();
        let decoded = decoder.decode(&data).unwrap();
        let mut expected = vec![b'A'; fill];
        for len in [2, 3, 4, 3, 4] {
            expected.extend(std::iter::repeat(b'A').take(len));
        }
        assert_eq!(decoded, expected);
        assert_eq!(decoder.stats().resets, 1);
        assert_eq!(decoder.stats().dictionary_len, 260);
    }

    #[test]
    fn table_reconstructs_chains() {
        let mut table = Table::new();
        table.derive(Code::from(b'x'), b'y');
        table.carry(b"abc", b'd');
        table.derive(258, b'e');
        assert_eq!(table.inner[258], Link::Carried);

        let mut out = vec![];
        table.reconstruct(257, &mut out);
        assert_eq!(out, b"xy");
        table.reconstruct(259, &mut out);
        assert_eq!(out, b"abcde");
        table.reconstruct(END_CODE, &mut out);
        assert!(out.is_empty());

        table.reset();
        assert_eq!(table.inner.len(), 257);
        table.reconstruct(Code::from(b'q'), &mut out);
        assert_eq!(out, b"q");
    }
}
