//! Comment-out helper for program listings and fault descriptions.

/// Prefix every line of `text` with `// `.
///
/// The result always ends with a newline, and line N of `text` is line N of
/// the result.
pub fn comment_out(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for line in text.split_inclusive('\n') {
        out.push_str("// ");
        out.push_str(line);
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
