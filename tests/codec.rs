//! Property tests for the integer and text conversions of `jtagger::bits`.

use jtagger::bits::{
    bin_array_to_int, bin_str_to_bin_array, dec_str_to_bin_array, hex_str_to_bin_array,
    int_to_bin_array, Register,
};
use jtagger::console::parse_number_str;
use jtagger::Error;
use proptest::prelude::*;

/// Leading zeros are padding, not magnitude.
fn magnitude(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        String::from("0")
    } else {
        trimmed.to_string()
    }
}

proptest! {
    #[test]
    fn int_round_trip(n in any::<u32>(), len in 1usize..=32) {
        let n = if len == 32 { n } else { n & ((1 << len) - 1) };
        let mut arr = Register::new();
        int_to_bin_array(&mut arr, n, len).unwrap();
        prop_assert_eq!(arr.len(), len);
        prop_assert_eq!(bin_array_to_int(&arr, len).unwrap(), n);
    }

    #[test]
    fn hex_text_round_trip(text in "[0-9a-fA-F]{1,128}") {
        let mut arr = Register::new();
        hex_str_to_bin_array(&mut arr, &text).unwrap();
        prop_assert_eq!(arr.len(), text.len() * 4);
        prop_assert_eq!(magnitude(&arr.to_hex_string()), magnitude(&text.to_uppercase()));
    }

    #[test]
    fn bin_text_round_trip(text in "[01]{1,512}") {
        let mut arr = Register::new();
        bin_str_to_bin_array(&mut arr, &text).unwrap();
        prop_assert_eq!(arr.to_bin_string(), text);
    }

    #[test]
    fn dec_text_round_trip(text in "[0-9]{1,100}") {
        let mut arr = Register::new();
        dec_str_to_bin_array(&mut arr, &text).unwrap();
        prop_assert_eq!(arr.to_dec_string(), magnitude(&text));
    }

    #[test]
    fn prefixed_numbers_match_u32(n in any::<u32>()) {
        let mut arr = Register::new();
        prop_assert_eq!(parse_number_str(&format!("0x{:x}", n), &mut arr), Ok(Some(n)));
        prop_assert_eq!(parse_number_str(&format!("0B{:b}", n), &mut arr), Ok(Some(n)));
        prop_assert_eq!(parse_number_str(&n.to_string(), &mut arr), Ok(Some(n)));
    }
}

#[test]
fn malformed_input() {
    let mut arr = Register::new();
    assert_eq!(parse_number_str("0xZZ", &mut arr), Err(Error::BadConversion));
    assert_eq!(parse_number_str("0x", &mut arr), Err(Error::BadPrefixOrSuffix));
}

#[test]
fn text_wider_than_buffer() {
    let mut arr = Register::new();
    let text = format!("1{}", "0".repeat(128));
    assert_eq!(hex_str_to_bin_array(&mut arr, &text), Err(Error::OutOfBounds));
    // Leading zeros beyond the capacity are harmless.
    let text = format!("0{}", "f".repeat(128));
    hex_str_to_bin_array(&mut arr, &text).unwrap();
    assert_eq!(arr.len(), 512);
}
