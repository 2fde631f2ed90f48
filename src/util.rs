//! Shared string and file helpers.

use std::path::Path;

use encoding_rs::WINDOWS_1252;

/// Case-insensitive substring search without allocating an uppercase copy.
#[inline]
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

/// Case-insensitive starts_with check without allocating.
#[inline]
pub fn starts_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

/// Case-insensitive ends_with check without allocating.
#[inline]
pub fn ends_with_ci(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[haystack.len() - needle.len()..]
            .eq_ignore_ascii_case(needle.as_bytes())
}

/// Case-insensitive find — returns byte offset of first occurrence of `needle` in `haystack`.
#[inline]
pub fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle_bytes = needle.as_bytes();
    let haystack_bytes = haystack.as_bytes();
    if needle_bytes.len() > haystack_bytes.len() {
        return None;
    }
    haystack_bytes
        .windows(needle_bytes.len())
        .position(|window| window.eq_ignore_ascii_case(needle_bytes))
}

/// True for bytes that can appear inside a SQL identifier.
#[inline]
pub fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// The leading whitespace of a line (possibly empty).
#[inline]
pub fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Expand tabs to four spaces and drop trailing whitespace.
pub fn replace_tabs(line: &str) -> String {
    line.replace('\t', "    ").trim_end().to_string()
}

/// First whitespace-delimited word of a line, with any trailing `;` removed.
pub fn first_word(line: &str) -> &str {
    line.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches(';')
}

/// Replace case-insensitive, word-boundary occurrences of `word`.
///
/// When `skip_after_dot` is set, occurrences immediately preceded by `.` are
/// left alone (so already-qualified names are not rewritten twice).
/// Returns `None` when nothing matched.
pub fn replace_word_ci(
    line: &str,
    word: &str,
    replacement: &str,
    skip_after_dot: bool,
) -> Option<String> {
    let bytes = line.as_bytes();
    let mut result = String::with_capacity(line.len());
    let mut pos = 0;
    let mut replaced = false;

    while let Some(offset) = find_ci(&line[pos..], word) {
        let start = pos + offset;
        let end = start + word.len();

        let boundary_before = start == 0
            || (!is_word_byte(bytes[start - 1]) && !(skip_after_dot && bytes[start - 1] == b'.'));
        let boundary_after = end == line.len() || !is_word_byte(bytes[end]);

        if boundary_before && boundary_after {
            result.push_str(&line[pos..start]);
            result.push_str(replacement);
            replaced = true;
        } else {
            result.push_str(&line[pos..end]);
        }
        pos = end;
    }

    if !replaced {
        return None;
    }
    result.push_str(&line[pos..]);
    Some(result)
}

/// Read a file as a string, trying UTF-8 first, then Windows-1252 as fallback.
///
/// SQL Server Management Studio exports are frequently saved in the Windows
/// ANSI code page rather than UTF-8.
pub fn read_text_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;

    match String::from_utf8(bytes.clone()) {
        Ok(text) => Ok(text.strip_prefix('\u{FEFF}').unwrap_or(&text).to_string()),
        Err(_) => {
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "File contains invalid characters",
                ))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}
