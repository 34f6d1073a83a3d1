//! Properties of the hex frame encoding

use proptest::prelude::*;
use serialkit_core::{hex_decode, hex_encode, DisplayMode, FrameFormatter};

proptest! {
    #[test]
    fn hex_format_length(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let formatted = FrameFormatter::new().format(&bytes, &DisplayMode::hex());
        let expected = if bytes.is_empty() { 0 } else { 3 * bytes.len() - 1 };
        prop_assert_eq!(formatted.len(), expected);
        prop_assert!(!formatted.ends_with(' '));
        prop_assert!(!formatted.starts_with(' '));
    }

    #[test]
    fn hex_decode_inverts_encode(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(hex_decode(&hex_encode(&bytes)), bytes);
    }

    #[test]
    fn hex_format_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
        let formatter = FrameFormatter::new();
        let mode = DisplayMode::hex();
        let rendered = formatter.format(&bytes, &mode);
        prop_assert_eq!(&rendered, &formatter.format(&bytes, &mode));
        prop_assert_eq!(&rendered, &rendered.to_uppercase());
    }
}
