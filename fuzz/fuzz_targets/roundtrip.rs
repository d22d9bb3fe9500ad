#![no_main]
use adalzw::{decode, encode, Mode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, &[u8])| {
    let (selector, data) = input;
    let mode = Mode::ALL[usize::from(selector) % Mode::ALL.len()];

    let mut encoder = encode::Encoder::new(mode);
    let mut buffer = Vec::with_capacity(2 * data.len() + 40);
    let result = encoder.into_stream(&mut buffer).encode_all(data);
    assert!(result.status.is_ok(), "{:?}", result.status);

    let mut decoder = decode::Decoder::new();
    let mut compare = vec![];
    let result = decoder.into_stream(&mut compare).decode_all(buffer.as_slice());
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(result.bytes_read, buffer.len());
    assert_eq!(compare, data);
    assert_eq!(encoder.stats(), decoder.stats());
});
