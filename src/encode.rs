//! A module for all encoding needs.
use std::io::{Read, Write};

use bitstream_io::{BigEndian, BitWriter};
use tracing::debug;

use crate::bits::{BitSink, Counter};
use crate::width::{Controller, Growth};
use crate::{AllResult, Code, LzwError, Mode, Stats, ALPHABET, END_CODE, MIN_CODESIZE};

/// The state for encoding data with an adaptive LZW dictionary.
///
/// The same encoder can be used for any number of streams, each one starts from a fresh
/// dictionary.
pub struct Encoder {
    mode: Mode,
    stats: Stats,
}

/// A encoding stream sink.
///
/// See [`Encoder::into_stream`] on how to create this type and more information.
///
/// [`Encoder::into_stream`]: struct.Encoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

struct EncodeState {
    mode: Mode,
    /// The current encoding symbol tree.
    tree: Tree,
    /// Code size and reset policy.
    ctl: Controller,
}

/// Index of a node in the [`Tree`].
type Node = u32;

const NO_NODE: Node = Node::MAX;

/// One tree node for every known sequence.
///
/// The first 256 nodes are the single bytes and a node's index is the byte value. Further nodes
/// are created as sequences are learned. Usually each node carries a code, only the interior of a
/// sequence that was carried over a dictionary reset may not. To avoid using too much memory we
/// keep nodes with few successors in optimized form. This form doesn't offer lookup by indexing
/// but instead does a linear search.
#[derive(Default)]
struct Tree {
    simples: Vec<Simple>,
    complex: Vec<Full>,
    keys: Vec<FullKey>,
    codes: Vec<Option<Code>>,
}

#[derive(Clone, Copy)]
enum FullKey {
    NoSuccessor,
    Simple(u32),
    Full(u32),
}

const SHORT: usize = 16;

#[derive(Clone, Copy)]
struct Simple {
    nodes: [Node; SHORT],
    chars: [u8; SHORT],
    count: u8,
}

#[derive(Clone, Copy)]
struct Full {
    char_continuation: [Node; 256],
}

/// The longest sequence with a code at the start of some input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Match {
    /// Number of bytes matched.
    len: usize,
    code: Code,
    node: Node,
}

impl Encoder {
    pub fn new(mode: Mode) -> Self {
        Encoder {
            mode,
            stats: Stats::default(),
        }
    }

    /// The mode written into the header of each stream.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Statistics of the most recently encoded stream.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Encode all of `data` into a new buffer.
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>, LzwError> {
        let mut out = Vec::with_capacity(data.len() / 2 + 16);
        {
            let mut sink = BitWriter::endian(&mut out, BigEndian);
            self.encode_to(data, &mut sink)?;
        }
        Ok(out)
    }

    /// Encode all of `data` into a bit sink, including header and end code.
    ///
    /// The sink is finished, i.e. padded to a full byte, after the end code.
    pub fn encode_to(&mut self, data: &[u8], sink: &mut impl BitSink) -> Result<(), LzwError> {
        let mut state = EncodeState::new(self.mode, data.len());
        let result = state.run(data, sink);
        self.stats = state.ctl.stats();
        result
    }

    /// Construct a encoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            encoder: self,
            writer,
        }
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Encode data from a reader, followed by the end code.
    ///
    /// The reader is drained before the first code is written since the header of a monitored
    /// stream contains the length of the data.
    pub fn encode_all(self, mut read: impl Read) -> AllResult {
        let IntoStream { encoder, writer } = self;
        let mut data = vec![];
        let mut writer = Counter::new(writer);

        let status = (|| -> Result<(), LzwError> {
            read.read_to_end(&mut data)?;
            let mut sink = BitWriter::endian(&mut writer, BigEndian);
            encoder.encode_to(&data, &mut sink)
        })();

        AllResult {
            bytes_read: data.len(),
            bytes_written: writer.count(),
            status,
        }
    }
}

impl EncodeState {
    fn new(mode: Mode, len: usize) -> Self {
        EncodeState {
            mode,
            tree: Tree::new(),
            ctl: Controller::new(mode, len as f64),
        }
    }

    fn run(&mut self, data: &[u8], sink: &mut impl BitSink) -> Result<(), LzwError> {
        sink.write_code(MIN_CODESIZE, self.mode.tag())?;
        if self.mode.has_length() {
            sink.write_f64(data.len() as f64)?;
        }
        debug!(mode = %self.mode, len = data.len(), "encoding");

        let mut inp = data;
        while !inp.is_empty() {
            let found = self.tree.longest_prefix(inp);
            sink.write_code(self.ctl.code_size(), found.code)?;
            self.ctl.account();

            // The decoder makes room before reading the next code, even if that is the end code.
            let growth = self.ctl.make_room();
            if growth == Growth::Reset {
                self.tree.reset();
            }

            if let Some(&next) = inp.get(found.len) {
                if let Some(code) = self.ctl.assign() {
                    if growth == Growth::Reset {
                        // The match was found in the dictionary we just dropped.
                        self.tree.insert(&inp[..=found.len], code);
                    } else {
                        self.tree.extend(found.node, next, code);
                    }
                }
            }

            inp = &inp[found.len..];
        }

        sink.write_code(self.ctl.code_size(), END_CODE)?;
        sink.finish()?;
        debug!(stats = ?self.ctl.stats(), "finished encoding");
        Ok(())
    }
}

impl Tree {
    fn new() -> Self {
        let mut tree = Tree::default();
        tree.init();
        tree
    }

    fn init(&mut self) {
        self.keys.resize(usize::from(ALPHABET), FullKey::NoSuccessor);
        self.codes.extend((0..ALPHABET).map(Some));
    }

    fn reset(&mut self) {
        self.simples.clear();
        self.complex.clear();
        // Keep the single bytes, forget their successors.
        self.codes.truncate(usize::from(ALPHABET));
        self.keys.truncate(usize::from(ALPHABET));
        for k in self.keys.iter_mut() {
            *k = FullKey::NoSuccessor;
        }
    }

    fn at_key(&self, node: Node, ch: u8) -> Option<Node> {
        match self.keys[node as usize] {
            FullKey::NoSuccessor => None,
            FullKey::Simple(idx) => {
                let nexts = &self.simples[idx as usize];
                let successors = nexts
                    .nodes
                    .iter()
                    .zip(nexts.chars.iter())
                    .take(usize::from(nexts.count));
                for (&snode, &sch) in successors {
                    if sch == ch {
                        return Some(snode);
                    }
                }

                None
            }
            FullKey::Full(idx) => {
                let full = &self.complex[idx as usize];
                let next = full.char_continuation[usize::from(ch)];
                if next != NO_NODE {
                    Some(next)
                } else {
                    None
                }
            }
        }
    }

    /// Find the longest coded sequence at the start of `inp`, which must not be empty.
    ///
    /// Runs in time proportional to the length of the match, plus the interior of a carried
    /// sequence that may be walked without finding a code.
    fn longest_prefix(&self, inp: &[u8]) -> Match {
        let mut node = Node::from(inp[0]);
        let mut found = Match {
            len: 1,
            code: Code::from(inp[0]),
            node,
        };

        for (idx, &ch) in inp.iter().enumerate().skip(1) {
            node = match self.at_key(node, ch) {
                Some(next) => next,
                None => break,
            };

            if let Some(code) = self.codes[node as usize] {
                found = Match {
                    len: idx + 1,
                    code,
                    node,
                };
            }
        }

        found
    }

    /// Assign `code` to the sequence of `node` followed by `ch`.
    fn extend(&mut self, node: Node, ch: u8, code: Code) -> Node {
        let next = match self.at_key(node, ch) {
            // Interior of a carried sequence.
            Some(next) => next,
            None => self.append(node, ch),
        };
        debug_assert!(self.codes[next as usize].is_none(), "sequence already coded");
        self.codes[next as usize] = Some(code);
        next
    }

    /// Assign `code` to a whole sequence, creating uncoded nodes for its missing prefixes.
    fn insert(&mut self, seq: &[u8], code: Code) {
        let (&first, tail) = match seq.split_first() {
            Some(split) => split,
            None => return,
        };
        // Single bytes are always present.
        let Some((&last, interior)) = tail.split_last() else {
            return;
        };

        let mut node = Node::from(first);
        for &ch in interior {
            node = match self.at_key(node, ch) {
                Some(next) => next,
                None => self.append(node, ch),
            };
        }
        self.extend(node, last, code);
    }

    /// Create an uncoded successor of `node`.
    fn append(&mut self, node: Node, ch: u8) -> Node {
        let next = self.keys.len() as Node;
        match self.keys[node as usize] {
            FullKey::NoSuccessor => {
                let new_key = FullKey::Simple(self.simples.len() as u32);
                let mut simple = Simple::default();
                simple.nodes[0] = next;
                simple.chars[0] = ch;
                simple.count = 1;
                self.simples.push(simple);
                self.keys[node as usize] = new_key;
            }
            FullKey::Simple(idx) if usize::from(self.simples[idx as usize].count) < SHORT => {
                let nexts = &mut self.simples[idx as usize];
                let nidx = usize::from(nexts.count);
                nexts.chars[nidx] = ch;
                nexts.nodes[nidx] = next;
                nexts.count += 1;
            }
            FullKey::Simple(idx) => {
                let simple = &self.simples[idx as usize];
                let mut full = Full {
                    char_continuation: [NO_NODE; 256],
                };
                for (&pch, &pnode) in simple.chars.iter().zip(simple.nodes.iter()) {
                    full.char_continuation[usize::from(pch)] = pnode;
                }
                full.char_continuation[usize::from(ch)] = next;
                self.keys[node as usize] = FullKey::Full(self.complex.len() as u32);
                self.complex.push(full);
            }
            FullKey::Full(idx) => {
                let full = &mut self.complex[idx as usize];
                full.char_continuation[usize::from(ch)] = next;
            }
        }
        self.keys.push(FullKey::NoSuccessor);
        self.codes.push(None);
        next
    }
}

impl Default for Simple {
    fn default() -> Self {
        Simple {
            nodes: [0; SHORT],
            chars: [0; SHORT],
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use bitstream_io::{BigEndian, BitReader};

    use super::{Encoder, Match, Tree};
    use crate::bits::BitSource;
    use crate::{Code, Mode, END_CODE, MIN_CODESIZE};

    #[test]
    fn empty_input_is_header_and_end() {
        let fixed = Encoder::new(Mode::Fixed).encode(b"").unwrap();
        assert_eq!(fixed, [0x00, 0x40, 0x00]);

        let reset = Encoder::new(Mode::Reset).encode(b"").unwrap();
        assert_eq!(reset, [0x00, 0xc0, 0x00]);

        // 9 bit tag, 64 bit length of zero, 9 bit end code.
        let monitor = Encoder::new(Mode::Monitor).encode(b"").unwrap();
        assert_eq!(monitor, [0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0x00]);
    }

    #[test]
    fn tobeornot() {
        let mut encoder = Encoder::new(Mode::Fixed);
        let data = encoder.encode(b"TOBEORNOTTOBEORTOBEORNOT").unwrap();

        let mut source = BitReader::endian(data.as_slice(), BigEndian);
        assert_eq!(source.read_code(MIN_CODESIZE).unwrap(), Mode::Fixed.tag());
        let mut codes: Vec<Code> = vec![];
        loop {
            let code = source.read_code(MIN_CODESIZE).unwrap();
            codes.push(code);
            if code == END_CODE {
                break;
            }
        }

        let mut expected: Vec<Code> = b"TOBEORNOT".iter().map(|&b| Code::from(b)).collect();
        expected.extend_from_slice(&[257, 259, 261, 266, 260, 262, 264, END_CODE]);
        assert_eq!(codes, expected);
        assert_eq!(encoder.stats().codewords, 16);
        assert_eq!(encoder.stats().dictionary_len, 256 + 15);
    }

    #[test]
    fn tree_starts_with_single_bytes() {
        let tree = Tree::new();
        for byte in 0..=255u8 {
            let found = tree.longest_prefix(&[byte, byte]);
            assert_eq!(found.len, 1);
            assert_eq!(found.code, Code::from(byte));
        }
    }

    #[test]
    fn tree_extends_matches() {
        let mut tree = Tree::new();
        let ab = tree.extend(u32::from(b'a'), b'b', 257);
        tree.extend(ab, b'c', 258);

        assert_eq!(tree.longest_prefix(b"abx").code, 257);
        let found = tree.longest_prefix(b"abcabc");
        assert_eq!((found.len, found.code), (3, 258));
        assert_eq!(tree.longest_prefix(b"b").len, 1);
    }

    #[test]
    fn tree_promotes_many_successors() {
        let mut tree = Tree::new();
        for (i, ch) in (0..=255u8).enumerate() {
            tree.extend(0, ch, 257 + i as Code);
        }
        for (i, ch) in (0..=255u8).enumerate() {
            let found = tree.longest_prefix(&[0, ch]);
            assert_eq!(found.code, 257 + i as Code, "successor {}", ch);
        }
    }

    #[test]
    fn tree_carries_sequence_over_reset() {
        let mut tree = Tree::new();
        let ab = tree.extend(u32::from(b'A'), b'B', 257);
        tree.extend(ab, b'C', 258);
        tree.reset();
        assert_eq!(tree.longest_prefix(b"ABC").len, 1);

        tree.insert(b"ABCD", 257);
        let found = tree.longest_prefix(b"ABCDE");
        assert_eq!((found.len, found.code), (4, 257));
        // The interior has no codes yet.
        let found = tree.longest_prefix(b"ABCX");
        assert_eq!(found, Match { len: 1, code: Code::from(b'A'), node: u32::from(b'A') });

        tree.extend(u32::from(b'A'), b'B', 258);
        assert_eq!(tree.longest_prefix(b"ABX").code, 258);
        assert_eq!(tree.longest_prefix(b"ABCD").code, 257);
    }
}
