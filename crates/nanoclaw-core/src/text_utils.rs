/// Cut `value` to at most `max_chars` characters, appending "..." when shortened.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Last `max_chars` characters of `value`.
pub fn tail_chars(value: &str, max_chars: usize) -> &str {
    let count = value.chars().count();
    if count <= max_chars {
        return value;
    }
    let skip = count - max_chars;
    let start = value
        .char_indices()
        .nth(skip)
        .map(|(idx, _)| idx)
        .unwrap_or(value.len());
    &value[start..]
}
