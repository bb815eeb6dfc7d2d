/// Whether `name` only uses characters that are safe in an installed file name.
///
/// Allowed are ASCII letters and digits plus `+ , - . / = _`. A NUL byte
/// ends the name. Anything else, including spaces, shell metacharacters and
/// non-ASCII bytes, makes the name unsafe.
pub fn is_filename_safe(name: &str) -> bool {
    for &byte in name.as_bytes() {
        match byte {
            0 => return true,
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => {}
            b'+' | b',' | b'-' | b'.' | b'/' | b'=' | b'_' => {}
            _ => return false,
        }
    }
    true
}
