//! Keyword matching primitives used by every observation channel.

/// Tests whether `keyword` occurs in `text`.
///
/// Plain case-sensitive substring test with no normalization. An empty
/// keyword is contained in any text, mirroring substring semantics.
pub fn contains(text: &str, keyword: &str) -> bool {
    text.contains(keyword)
}

/// Returns every line of `text` containing `keyword`, in original order.
///
/// Lines are not deduplicated or reordered; a line that matches twice still
/// appears once (it is the line that is collected, not the occurrence).
pub fn matching_lines(text: &str, keyword: &str) -> Vec<String> {
    text.lines()
        .filter(|line| contains(line, keyword))
        .map(|line| line.to_string())
        .collect()
}
