//! Reply text decoding
//!
//! Models often wrap JSON in a markdown code fence even when asked not to.
//! The decoder strips one fence layer and parses what remains; it never
//! panics and never validates field semantics.

use serde::de::DeserializeOwned;
use socratic_core::{CompletionOutcome, GatewayError};

const FENCE: &str = "```";

/// Remove a surrounding markdown code fence, if present.
///
/// An opening fence drops everything up to and including the first newline
/// (so a language tag like `json` goes with it); a trailing fence is then
/// dropped too.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if text.starts_with(FENCE) {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => "",
        };
    }
    if let Some(body) = text.strip_suffix(FENCE) {
        text = body;
    }
    text.trim()
}

/// Decode model reply text into `T`.
///
/// Any parse failure, including a well-formed document of the wrong shape,
/// is a [`GatewayError::MalformedResponse`] carrying the raw text.
pub fn decode_reply<T: DeserializeOwned>(raw: &str) -> CompletionOutcome<T> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| GatewayError::malformed(raw, e.to_string()))
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Arbitrary input yields a value or a classified error, never a panic.
        #[test]
        fn prop_decode_never_panics(input in ".{0,256}") {
            match decode_reply::<Value>(&input) {
                Ok(_) => {}
                Err(e) => {
                    let is_malformed = matches!(e, GatewayError::MalformedResponse { .. });
                    prop_assert!(is_malformed, "unexpected error: {:?}", e);
                }
            }
        }

        /// Fencing a JSON object does not change what it decodes to.
        #[test]
        fn prop_fence_is_transparent(key in "[a-z]{1,8}", value in any::<i32>(), tag in "(json)?") {
            let doc = format!("{{\"{}\":{}}}", key, value);
            let fenced = format!("```{}\n{}\n```", tag, doc);
            let plain: Value = decode_reply(&doc).unwrap();
            let unfenced: Value = decode_reply(&fenced).unwrap();
            prop_assert_eq!(plain, unfenced);
        }
    }
}
