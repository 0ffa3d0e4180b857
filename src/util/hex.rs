//! Hex dumps of byte buffers

use std::fmt::Write;

/// Bytes shown on one dump line
pub const BYTES_PER_LINE: usize = 16;

/// Render `data` as dump lines of up to 16 bytes, each byte as ` xx`
///
/// An empty buffer produces no lines.
///
/// ```
/// use device_utils::util::list_buff;
///
/// let lines = list_buff(&[0x00, 0x1f, 0xab]);
/// assert_eq!(lines, vec![" 00 1f ab"]);
/// ```
pub fn list_buff(data: &[u8]) -> Vec<String> {
    data.chunks(BYTES_PER_LINE)
        .map(|chunk| {
            let mut line = String::with_capacity(chunk.len() * 3);
            for byte in chunk {
                let _ = write!(line, " {:02x}", byte);
            }
            line
        })
        .collect()
}

/// Render `data` as `xx ` groups on one line
pub fn format_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for byte in data {
        let _ = write!(out, "{:02x} ", byte);
    }
    out
}
