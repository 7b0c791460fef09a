//! Text utilities: position conversion and line geometry.
//!
//! Diagnostic comments are inserted at the start of the line that holds the
//! anchored declaration, with that line's indentation, so these helpers work
//! on byte offsets into UTF-8 text.

/// Convert a byte offset to 1-indexed line and column.
///
/// Columns count Unicode scalar values (chars), not bytes. If `offset`
/// exceeds the content length, returns the position at the end.
pub fn byte_offset_to_position(content: &str, offset: u64) -> (u32, u32) {
    let target = (offset as usize).min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, ch) in content.char_indices() {
        if i >= target {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Byte offset of the start of the line containing `offset`.
///
/// Works on bytes, so `offset` need not fall on a char boundary.
pub fn line_start(content: &str, offset: u64) -> u64 {
    let offset = (offset as usize).min(content.len());
    content.as_bytes()[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| (p + 1) as u64)
        .unwrap_or(0)
}

/// Byte offset just past the line containing `offset` (after its `\n`).
pub fn line_end(content: &str, offset: u64) -> u64 {
    let offset = (offset as usize).min(content.len());
    content.as_bytes()[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| (offset + p + 1) as u64)
        .unwrap_or(content.len() as u64)
}

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(content: &str, offset: u64) -> &str {
    let start = line_start(content, offset) as usize;
    let rest = &content[start..];
    let width = rest
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(rest.len());
    &rest[..width]
}

/// True for a non-empty Java-style identifier (`[A-Za-z_$][A-Za-z0-9_$]*`).
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
