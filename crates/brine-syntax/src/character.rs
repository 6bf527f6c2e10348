//! Byte classification predicates used by the scanner and parsers.
//!
//! These operate on raw bytes. Any byte >= 0x80 is the lead or
//! continuation byte of a multi-byte UTF-8 sequence; the grammar treats
//! all non-ASCII code points as name characters, so byte-level checks
//! suffice everywhere except column counting, which skips continuation
//! bytes (see [`is_character`]).

/// Bitwise-OR an ASCII uppercase letter with this to get its lowercase form.
const ASCII_CASE_BIT: u8 = 0x20;

/// Whether [byte] starts a code point (ASCII or a UTF-8 lead byte).
/// Continuation bytes (`10xxxxxx`) return false.
#[inline]
pub fn is_character(byte: u8) -> bool {
    byte & 0xC0 != 0x80
}

#[inline]
pub fn is_newline(byte: u8) -> bool {
    matches!(byte, b'\n' | b'\r' | b'\x0C')
}

#[inline]
pub fn is_space_or_tab(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

#[inline]
pub fn is_whitespace(byte: u8) -> bool {
    is_space_or_tab(byte) || is_newline(byte)
}

#[inline]
pub fn is_alphabetic(byte: u8) -> bool {
    byte.is_ascii_alphabetic()
}

#[inline]
pub fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}

#[inline]
pub fn is_alphanumeric(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
}

#[inline]
pub fn is_hex(byte: u8) -> bool {
    byte.is_ascii_hexdigit()
}

/// Whether [byte] may start an identifier.
#[inline]
pub fn is_name_start(byte: u8) -> bool {
    byte == b'_' || byte >= 0x80 || is_alphabetic(byte)
}

/// Whether [byte] may appear in an identifier body.
#[inline]
pub fn is_name(byte: u8) -> bool {
    byte == b'_' || byte == b'-' || byte >= 0x80 || is_alphanumeric(byte)
}

/// Whether [byte] can start a simple selector other than a type selector.
#[inline]
pub fn is_simple_selector_start(byte: u8) -> bool {
    matches!(byte, b'*' | b'[' | b'.' | b'#' | b'%' | b':')
}

/// The value of a hex digit. Assumes `is_hex(byte)`.
#[inline]
pub fn as_hex(byte: u8) -> u32 {
    match byte {
        b'0'..=b'9' => u32::from(byte - b'0'),
        b'A'..=b'F' => u32::from(byte - b'A') + 10,
        _ => u32::from(byte - b'a') + 10,
    }
}

/// The lowercase hex digit for [value]. Assumes `value < 16`.
#[inline]
pub fn hex_char_for(value: u32) -> char {
    debug_assert!(value < 0x10);
    if value < 0xA {
        (b'0' + value as u8) as char
    } else {
        (b'a' + (value as u8 - 0xA)) as char
    }
}

/// The closing counterpart of an opening bracket byte.
#[inline]
pub fn opposite_bracket(byte: u8) -> u8 {
    match byte {
        b'(' => b')',
        b'{' => b'}',
        b'[' => b']',
        _ => 0,
    }
}

#[inline]
pub fn to_lower_case(byte: u8) -> u8 {
    if byte.is_ascii_uppercase() {
        byte | ASCII_CASE_BIT
    } else {
        byte
    }
}

/// Whether [actual] equals [letter] ignoring ASCII case. [letter] must be
/// a lowercase ASCII letter.
#[inline]
pub fn equals_letter_ignore_case(letter: u8, actual: u8) -> bool {
    debug_assert!(letter.is_ascii_lowercase());
    actual | ASCII_CASE_BIT == letter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_bytes_are_not_characters() {
        assert!(is_character(b'a'));
        assert!(is_character(0xC3)); // lead byte of 'é'
        assert!(!is_character(0xA9)); // continuation byte of 'é'
    }

    #[test]
    fn name_predicates() {
        assert!(is_name_start(b'_'));
        assert!(is_name_start(b'a'));
        assert!(is_name_start(0xC3));
        assert!(!is_name_start(b'-'));
        assert!(!is_name_start(b'1'));
        assert!(is_name(b'-'));
        assert!(is_name(b'1'));
        assert!(!is_name(b'.'));
    }

    #[test]
    fn hex_digits_round_trip() {
        for (byte, value) in [(b'0', 0), (b'9', 9), (b'a', 10), (b'F', 15)] {
            assert!(is_hex(byte));
            assert_eq!(as_hex(byte), value);
        }
        assert_eq!(hex_char_for(15), 'f');
        assert_eq!(hex_char_for(3), '3');
    }

    #[test]
    fn case_insensitive_letter_match() {
        assert!(equals_letter_ignore_case(b'u', b'U'));
        assert!(equals_letter_ignore_case(b'u', b'u'));
        assert!(!equals_letter_ignore_case(b'u', b'v'));
    }
}
