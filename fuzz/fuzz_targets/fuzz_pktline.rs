//! Fuzz target for pkt-line length decoding.
//!
//! Arbitrary frames must be decoded or rejected without panicking, and
//! encoded frames must declare their own length.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = gitgate_git::decode_length(data);

    if let Ok(text) = std::str::from_utf8(data) {
        if text.len() + 4 <= 0xffff {
            let frame = gitgate_git::encode_line(text);
            let len = gitgate_git::decode_length(&frame).unwrap();
            assert_eq!(len, frame.len());
        }
    }
});
