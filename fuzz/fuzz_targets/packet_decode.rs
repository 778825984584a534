#![no_main]

use libfuzzer_sys::fuzz_target;
use unbundler_codec::{decode_packet, encode_packet};

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = decode_packet(data) {
        // Anything that decodes must re-encode to a 4-byte aligned buffer
        // that decodes to the same packet.
        if let Ok(bytes) = encode_packet(&packet) {
            assert_eq!(bytes.len() % 4, 0);
            let again = decode_packet(&bytes).expect("re-encoded packet decodes");
            assert_eq!(encode_packet(&again).ok(), Some(bytes));
        }
    }
});
