//! Filesystem-safe names for durable artifacts.
//!
//! Tool artifacts and flow specs are keyed by a reversible percent
//! encoding so that listing a directory recovers the original names.
//! Audit streams only need a safe, stable file stem, so they use a lossy
//! replacement instead.

/// Encode a name into a file stem, percent-encoding every byte outside
/// `[A-Za-z0-9_.-]`. A leading `.` is also encoded so that no stem is
/// hidden or equal to `.`/`..`.
pub fn encode_stem(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        match ch {
            '.' if i == 0 => encoded.push_str("%2E"),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => encoded.push(ch),
            _ => {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).as_bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    encoded
}

/// Decode a file stem produced by [`encode_stem`].
///
/// Only the canonical encoding is accepted: escapes are `%` plus two
/// uppercase hex digits, and the decoded name must encode back to
/// `stem`. Anything else maps to no name, so a decoded name always
/// addresses the file it was read from.
pub fn decode_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_digit(*bytes.get(i + 1)?)?;
            let lo = hex_digit(*bytes.get(i + 2)?)?;
            result.push((hi << 4) | lo);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    let name = String::from_utf8(result).ok()?;
    (encode_stem(&name) == stem).then_some(name)
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// File name for `name` with the given extension.
pub fn file_name(name: &str, extension: &str) -> String {
    format!("{}.{extension}", encode_stem(name))
}

/// Recover a name from a file name carrying `extension`. Returns `None`
/// for other extensions and for undecodable stems.
pub fn name_from_file(file_name: &str, extension: &str) -> Option<String> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() || stem.starts_with('.') {
        return None;
    }
    decode_stem(stem)
}

/// Lossy stream name: every character outside `[A-Za-z0-9_.-]` becomes
/// `_`. Names that would collapse to empty, `.` or `..` become `_`.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => ch,
            _ => '_',
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
