//! String and byte buffer helpers

/// Find `needle` in `haystack`, returning the 1-based offset of the end of
/// the first match, or 0 when there is none
///
/// The scan restarts one position after the start of a failed partial
/// match. An empty needle never matches.
///
/// ```
/// use device_utils::util::is_sub_array;
///
/// assert_eq!(is_sub_array(&[1, 2, 3, 4, 5], &[3, 4]), 4);
/// assert_eq!(is_sub_array(&[1, 2, 3], &[9]), 0);
/// ```
pub fn is_sub_array(haystack: &[u8], needle: &[u8]) -> usize {
    let (mut h, mut n) = (0, 0);
    while h < haystack.len() && n < needle.len() {
        if haystack[h] == needle[n] {
            h += 1;
            n += 1;
            if n == needle.len() {
                return h;
            }
        } else {
            h = h - n + 1;
            n = 0;
        }
    }
    0
}

/// Remove every occurrence of `c` in place
pub fn remove_char(s: &mut String, c: char) {
    s.retain(|ch| ch != c);
}

/// Replace the extension after the last `.` with `new_ext`
///
/// Returns `None` when the name has no `.` after its first character.
///
/// ```
/// use device_utils::util::change_extension;
///
/// assert_eq!(change_extension("photo.jpg", "newext").as_deref(), Some("photo.newext"));
/// assert_eq!(change_extension("photo", "newext"), None);
/// ```
pub fn change_extension(name: &str, new_ext: &str) -> Option<String> {
    let dot = name.rfind('.').filter(|&i| i > 0)?;
    let mut out = String::with_capacity(dot + 1 + new_ext.len());
    out.push_str(&name[..=dot]);
    out.push_str(new_ext);
    Some(out)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes of a URL query value
///
/// Malformed escapes are kept as written. Decoded octets that do not form
/// valid UTF-8 are replaced with U+FFFD.
///
/// ```
/// use device_utils::util::url_decode;
///
/// assert_eq!(url_decode("My%20Wifi%21"), "My Wifi!");
/// ```
pub fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
