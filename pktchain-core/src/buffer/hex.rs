//! Hex string conversion.
//!
//! Parsing is all-or-nothing: the whole input must match, optionally
//! prefixed with `0x`, either as one contiguous run of digit pairs or as
//! digit pairs joined by the given separator.

use regex::Regex;

use crate::error::BufferError;

fn is_contiguous(body: &str) -> bool {
    !body.is_empty() && body.len() % 2 == 0 && body.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Format bytes as lowercase hex pairs joined by `separator`.
pub fn to_hex_string(data: &[u8], separator: &str) -> String {
    if separator.is_empty() {
        return hex::encode(data);
    }
    let mut out = String::with_capacity(data.len() * (2 + separator.len()));
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&hex::encode([*byte]));
    }
    out
}

/// Parse a hex string into bytes.
///
/// ```
/// use pktchain_core::buffer::hex::parse_hex;
///
/// assert_eq!(parse_hex("0x0800", ":").unwrap(), vec![0x08, 0x00]);
/// assert_eq!(parse_hex("08:00", ":").unwrap(), vec![0x08, 0x00]);
/// assert!(parse_hex("08:0", ":").is_err());
/// ```
pub fn parse_hex(text: &str, separator: &str) -> Result<Vec<u8>, BufferError> {
    let invalid = || BufferError::InvalidHex {
        input: text.to_string(),
    };
    let body = text.strip_prefix("0x").unwrap_or(text);

    if is_contiguous(body) {
        return hex::decode(body).map_err(|_| invalid());
    }
    if separator.is_empty() {
        return Err(invalid());
    }

    let pattern = format!(
        r"^[0-9a-fA-F]{{2}}(?:{}[0-9a-fA-F]{{2}})*$",
        regex::escape(separator)
    );
    let joined = Regex::new(&pattern).map_err(|_| invalid())?;
    if !joined.is_match(body) {
        return Err(invalid());
    }
    body.split(separator)
        .map(|pair| {
            hex::decode(pair)
                .ok()
                .and_then(|b| b.first().copied())
                .ok_or_else(invalid)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex_string() {
        assert_eq!(to_hex_string(&[0x08, 0x00, 0xff], ""), "0800ff");
        assert_eq!(to_hex_string(&[0x08, 0x00, 0xff], " "), "08 00 ff");
        assert_eq!(to_hex_string(&[], ":"), "");
    }

    #[test]
    fn test_parse_contiguous() {
        assert_eq!(parse_hex("deadBEEF", "").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(parse_hex("0xdead", "-").unwrap(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_parse_separated() {
        assert_eq!(parse_hex("de-ad-be-ef", "-").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        // Separators with regex meaning are taken literally
        assert_eq!(parse_hex("de.ad", ".").unwrap(), vec![0xde, 0xad]);
        assert!(parse_hex("deXad", ".").is_err());
        assert_eq!(parse_hex("0xde, ad", ", ").unwrap(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_parse_rejects_partial_input() {
        assert!(parse_hex("", "").is_err());
        assert!(parse_hex("0x", "").is_err());
        assert!(parse_hex("abc", "").is_err());
        assert!(parse_hex("ab:cd:", ":").is_err());
        assert!(parse_hex("ab:cd zz", ":").is_err());
        assert!(parse_hex("ab:cdef", ":").is_err());
    }
}
