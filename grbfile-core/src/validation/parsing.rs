//! Parsing utilities for the ASCII header
//!
//! The reader never depends on these; they back diagnostics that want to
//! show what a file claims about itself.

use crate::FormatError;

/// Find the value of a `key:   value` line in an ASCII header block
///
/// Trailing padding is ignored. Returns `None` if the key is absent or the
/// block is not valid UTF-8.
pub fn header_field<'a>(block: &'a [u8], key: &str) -> Option<&'a str> {
    let text = core::str::from_utf8(block).ok()?;
    text.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name == key).then(|| value.trim())
    })
}

/// Parse a version string in the format "v{major}.{minor}.{sub}"
///
/// The leading `v` and anything after the first space (the producer
/// identifier) are optional. Returns (major, minor, sub).
pub fn parse_version(version_str: &str) -> Result<(u32, u32, u32), FormatError> {
    let version_str = version_str.split(' ').next().unwrap_or("");
    let version_str = version_str.strip_prefix('v').unwrap_or(version_str);
    if version_str.is_empty() {
        return Err(FormatError::UnknownFormat(0));
    }

    let mut parts = [0u32; 3];
    let mut count = 0;

    for part in version_str.split('.') {
        if count >= 3 || part.is_empty() {
            return Err(FormatError::UnknownFormat(count as i32));
        }

        let mut num: u32 = 0;
        for byte in part.bytes() {
            if !byte.is_ascii_digit() {
                return Err(FormatError::UnknownFormat(count as i32));
            }
            num = num
                .checked_mul(10)
                .and_then(|n| n.checked_add((byte - b'0') as u32))
                .ok_or(FormatError::SizeOverflow)?;
        }

        parts[count] = num;
        count += 1;
    }

    if count < 3 {
        return Err(FormatError::UnknownFormat(count as i32));
    }

    Ok((parts[0], parts[1], parts[2]))
}
