//! Compact output rendering helpers for guard CLI surfaces.
//!
//! Keeps violation output bounded and readable while preserving signal.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Bound multi-line subprocess output to its last `max_lines` lines.
pub fn tail_lines(input: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = input.lines().collect();
    if lines.len() <= max_lines {
        return input.trim_end().to_string();
    }
    let tail = &lines[lines.len() - max_lines..];
    format!("... ({} lines omitted)\n{}", lines.len() - max_lines, tail.join("\n"))
}
