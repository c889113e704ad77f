//! Fuzz test for the reply decoder
//!
//! Feeds arbitrary bytes through fence stripping and JSON decoding to find
//! panics or hangs. Every input must come back as a decoded value or a
//! `MalformedResponse` carrying the raw text.
//!
//! Run with: cargo +nightly fuzz run decoder_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use socratic_core::{GatewayError, StructuredReply, SummaryReply};
use socratic_llm::{decode_reply, strip_code_fences};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    let stripped = strip_code_fences(&input);
    assert!(stripped.len() <= input.len(), "Stripping must never grow the text");

    for outcome in [
        decode_reply::<serde_json::Value>(&input).map(|_| ()),
        decode_reply::<StructuredReply>(&input).map(|_| ()),
        decode_reply::<SummaryReply>(&input).map(|_| ()),
    ] {
        if let Err(error) = outcome {
            match error {
                GatewayError::MalformedResponse { raw, .. } => {
                    assert_eq!(raw, input, "Malformed error must carry the raw text");
                }
                other => panic!("Unexpected error class: {:?}", other),
            }
        }
    }
});
