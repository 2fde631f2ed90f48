//! Block-scoped table and column name propagation
//!
//! Runs once over each completed procedure body, before assembly. When a line
//! mentions a mapped table, the rewrite extends over the whole enclosing
//! block: contiguous lines bounded by blank lines, block keywords
//! (Begin/End/If/Else), and the comment/code divide. Column renames apply
//! only to columns of tables actually referenced in the block, so unrelated
//! tables with same-named columns are left alone.
//!
//! A high-water mark records how far rewriting has progressed; later blocks
//! never re-cross it, so a rewritten line is never rewritten twice.

use crate::events::EventSink;
use crate::namemap::NameMap;
use crate::util::{find_ci, is_word_byte, replace_word_ci};

/// Columns shorter than this are never auto-renamed; short names are too
/// likely to collide with unrelated tokens in a text-level rewrite.
pub const MINIMUM_COLUMN_NAME_LENGTH: usize = 6;

/// Rewrite table and column names in a completed body, returning the updated
/// lines. The input is left untouched.
pub fn update_names(
    body: &[String],
    map: &NameMap,
    sink: &dyn EventSink,
    verbose: bool,
) -> Vec<String> {
    let mut lines: Vec<String> = body.to_vec();

    let mut floor = 0;
    let mut index = 0;

    while index < lines.len() {
        if !line_references_table(&lines[index], map) {
            index += 1;
            continue;
        }

        let seed_is_comment = is_comment_only(&lines[index]);

        let mut start = index;
        while start > floor && !is_block_boundary(&lines[start - 1], seed_is_comment) {
            start -= 1;
        }

        let mut end = index;
        while end + 1 < lines.len() && !is_block_boundary(&lines[end + 1], seed_is_comment) {
            end += 1;
        }

        let referenced = rewrite_block(&mut lines[start..=end], map);

        if verbose && !referenced.is_empty() {
            sink.debug(&format!(
                "Renamed {} in lines {}-{}:\n{}",
                referenced.join(", "),
                start + 1,
                end + 1,
                lines[start..=end].join("\n")
            ));
        }

        index = end + 1;
        floor = index;
    }

    lines
}

/// Replace table tokens in one block and rename columns of the referenced
/// tables. Returns the new table names in first-seen order.
fn rewrite_block(block: &mut [String], map: &NameMap) -> Vec<String> {
    let mut referenced: Vec<String> = Vec::new();

    for line in block.iter_mut() {
        for (source_table, target) in map.tables() {
            if let Some(updated) = replace_table_token(line, source_table, &target.qualified_name())
            {
                *line = updated;
                if !referenced
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&target.name))
                {
                    referenced.push(target.name.clone());
                }
            }
        }
    }

    for table in &referenced {
        let Some(columns) = map.columns_for(table) else {
            continue;
        };
        for (source_column, new_column) in columns {
            if source_column.len() < MINIMUM_COLUMN_NAME_LENGTH {
                continue;
            }
            for line in block.iter_mut() {
                // Qualified references (alias.Column) rename too, so the dot
                // prefix stays legal here, unlike table tokens
                if let Some(updated) = replace_word_ci(line, source_column, new_column, false) {
                    *line = updated;
                }
            }
        }
    }

    referenced
}

fn line_references_table(line: &str, map: &NameMap) -> bool {
    map.tables()
        .any(|(source_table, _)| has_table_token(line, source_table))
}

fn has_table_token(line: &str, table: &str) -> bool {
    let bytes = line.as_bytes();
    let mut pos = 0;
    while let Some(offset) = find_ci(&line[pos..], table) {
        let start = pos + offset;
        let end = start + table.len();
        if token_span(line, bytes, start, end).is_some() {
            return true;
        }
        pos = end;
    }
    false
}

/// Replace whole-token occurrences of a table name. An immediately preceding
/// `dbo.` qualifier is absorbed into the replaced span; a token behind any
/// other qualifier dot is left alone, which is what keeps a second pass from
/// producing `schema.schema.name`.
fn replace_table_token(line: &str, table: &str, replacement: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let mut result = String::with_capacity(line.len());
    let mut pos = 0;
    let mut replaced = false;

    while let Some(offset) = find_ci(&line[pos..], table) {
        let start = pos + offset;
        let end = start + table.len();

        match token_span(line, bytes, start, end) {
            Some(span_start) => {
                result.push_str(&line[pos..span_start]);
                result.push_str(replacement);
                replaced = true;
            }
            None => result.push_str(&line[pos..end]),
        }
        pos = end;
    }

    if !replaced {
        return None;
    }
    result.push_str(&line[pos..]);
    Some(result)
}

/// For a candidate match at `start..end`, the start of the span to replace
/// (including an absorbed `dbo.` prefix), or `None` when the match is not a
/// whole token or sits behind a foreign qualifier.
fn token_span(line: &str, bytes: &[u8], start: usize, end: usize) -> Option<usize> {
    if end < bytes.len() && is_word_byte(bytes[end]) {
        return None;
    }

    if start == 0 {
        return Some(0);
    }

    let prev = bytes[start - 1];
    if prev == b'.' {
        // Absorb a dbo. qualifier when it is itself a whole token
        if start >= 4 && line[start - 4..start].eq_ignore_ascii_case("dbo.") {
            let before = start - 4;
            if before == 0 || (!is_word_byte(bytes[before - 1]) && bytes[before - 1] != b'.') {
                return Some(before);
            }
        }
        return None;
    }

    if is_word_byte(prev) {
        return None;
    }

    Some(start)
}

fn is_comment_only(line: &str) -> bool {
    line.trim_start().starts_with("--")
}

/// Block boundaries delimit the contiguous rewrite region: blank lines,
/// lines starting with a control keyword, and the comment/code divide.
fn is_block_boundary(line: &str, seed_is_comment: bool) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return true;
    }

    let comment_only = trimmed.starts_with("--");
    if seed_is_comment {
        // A comment seed only extends across contiguous comment-only lines
        return !comment_only;
    }
    if comment_only {
        return true;
    }

    let keyword = crate::util::first_word(trimmed);
    ["Begin", "End", "If", "Else"]
        .iter()
        .any(|k| keyword.eq_ignore_ascii_case(k))
}
