//! Base64 encoding (standard alphabet, `=` padding)
//!
//! Only encoding is provided; the device uses it for HTTP basic
//! authentication headers and SMTP login strings.

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Longest input accepted by [`encode64`]
pub const MAX_ENCODE64_INPUT: usize = 90;

/// Encode one group of 1 to 3 bytes into 4 characters
///
/// # Panics
///
/// Panics if `chunk` is empty or longer than 3 bytes.
pub fn encode64_chunk(chunk: &[u8]) -> [u8; 4] {
    assert!(
        (1..=3).contains(&chunk.len()),
        "base64 chunk must hold 1 to 3 bytes"
    );

    let mut buff: u32 = 0;
    for (i, byte) in chunk.iter().enumerate() {
        buff |= u32::from(*byte) << (8 * (2 - i));
    }

    let mut out = [b'='; 4];
    for (i, slot) in out.iter_mut().enumerate().take(chunk.len() + 1) {
        *slot = BASE64[((buff >> (6 * (3 - i))) & 0x3F) as usize];
    }
    out
}

/// Encode an arbitrary byte slice
pub fn encode64_bytes(input: &[u8]) -> String {
    let mut encoded = String::with_capacity(input.len().div_ceil(3) * 4);
    for chunk in input.chunks(3) {
        for c in encode64_chunk(chunk) {
            encoded.push(char::from(c));
        }
    }
    encoded
}

/// Encode a short string, as used for credentials
///
/// Input beyond [`MAX_ENCODE64_INPUT`] bytes is ignored; use
/// [`encode64_truncates`] to check beforehand.
///
/// ```
/// use device_utils::util::encode64;
///
/// assert_eq!(encode64("Man"), "TWFu");
/// assert_eq!(encode64("Ma"), "TWE=");
/// assert_eq!(encode64("M"), "TQ==");
/// ```
pub fn encode64(input: &str) -> String {
    let bytes = input.as_bytes();
    encode64_bytes(&bytes[..bytes.len().min(MAX_ENCODE64_INPUT)])
}

/// Whether [`encode64`] would drop part of `input`
pub fn encode64_truncates(input: &str) -> bool {
    input.len() > MAX_ENCODE64_INPUT
}
