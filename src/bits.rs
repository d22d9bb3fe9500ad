//! Bit level input and output.
//!
//! The codec only needs a handful of operations from the bit stream, captured by [`BitSink`] and
//! [`BitSource`]. Both are implemented for the big endian reader and writer of `bitstream-io`, which
//! is what [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder) use for their byte based
//! interfaces.
use std::io::{self, Read, Write};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::Code;

/// Where code words are written to.
pub trait BitSink {
    /// Write the lowest `code_size` bits of `code`, most significant first.
    fn write_code(&mut self, code_size: u8, code: Code) -> io::Result<()>;
    /// Write the 64 bits of an IEEE-754 double.
    fn write_f64(&mut self, value: f64) -> io::Result<()>;
    /// Write whole bytes, 8 bits each.
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Pad the last byte with zeros and flush.
    fn finish(&mut self) -> io::Result<()>;
}

/// Where code words are read from.
///
/// Reading past the end of the data fails with [`io::ErrorKind::UnexpectedEof`].
pub trait BitSource {
    /// Read a `code_size` bit unsigned integer.
    fn read_code(&mut self, code_size: u8) -> io::Result<Code>;
    /// Read the 64 bits of an IEEE-754 double.
    fn read_f64(&mut self) -> io::Result<f64>;
}

impl<W: Write> BitSink for BitWriter<W, BigEndian> {
    fn write_code(&mut self, code_size: u8, code: Code) -> io::Result<()> {
        BitWrite::write(self, u32::from(code_size), code)
    }

    fn write_f64(&mut self, value: f64) -> io::Result<()> {
        BitWrite::write(self, 64, value.to_bits())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        BitWrite::write_bytes(self, bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.byte_align()?;
        BitWriter::flush(self)
    }
}

impl<R: Read> BitSource for BitReader<R, BigEndian> {
    fn read_code(&mut self, code_size: u8) -> io::Result<Code> {
        BitRead::read::<Code>(self, u32::from(code_size))
    }

    fn read_f64(&mut self) -> io::Result<f64> {
        BitRead::read::<u64>(self, 64).map(f64::from_bits)
    }
}

/// Counts the bytes passing through a reader or writer.
pub(crate) struct Counter<T> {
    inner: T,
    count: usize,
}

impl<T> Counter<T> {
    pub(crate) fn new(inner: T) -> Self {
        Counter { inner, count: 0 }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }
}

impl<R: Read> Read for Counter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.inner.read(buf)?;
        self.count += len;
        Ok(len)
    }
}

impl<W: Write> Write for Counter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = self.inner.write(buf)?;
        self.count += len;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bitstream_io::{BigEndian, BitReader, BitWriter};

    use super::{BitSink, BitSource, Counter};

    #[test]
    fn codes_are_msb_first() {
        let mut out = vec![];
        {
            let mut sink = BitWriter::endian(&mut out, BigEndian);
            sink.write_code(9, 1).unwrap();
            sink.write_code(9, 256).unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(out, [0b0000_0000, 0b1100_0000, 0b0000_0000]);
    }

    #[test]
    fn mixed_fields() {
        let mut out = vec![];
        {
            let mut sink = BitWriter::endian(&mut out, BigEndian);
            sink.write_code(9, 2).unwrap();
            sink.write_f64(400.0).unwrap();
            sink.write_code(16, 0xbeef).unwrap();
            sink.write_raw(b"ok").unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(out.len(), (9 + 64 + 16 + 16 + 7) / 8);

        let mut source = BitReader::endian(out.as_slice(), BigEndian);
        assert_eq!(source.read_code(9).unwrap(), 2);
        assert_eq!(source.read_f64().unwrap(), 400.0);
        assert_eq!(source.read_code(16).unwrap(), 0xbeef);
        assert_eq!(source.read_code(8).unwrap(), u16::from(b'o'));
        assert_eq!(source.read_code(8).unwrap(), u16::from(b'k'));
    }

    #[test]
    fn exhaustion_is_eof() {
        let data = [0xffu8];
        let mut source = BitReader::endian(&data[..], BigEndian);
        let err = source.read_code(9).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn counter_counts() {
        let mut counter = Counter::new(vec![]);
        io::Write::write_all(&mut counter, b"abc").unwrap();
        assert_eq!(counter.count(), 3);

        let mut counter = Counter::new(&b"hello"[..]);
        let mut buf = vec![];
        io::Read::read_to_end(&mut counter, &mut buf).unwrap();
        assert_eq!(counter.count(), 5);
    }
}
