/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Board subtitle, e.g. "1 task found" or "12 tasks found"
pub fn tasks_found(count: u64) -> String {
    let noun = if count == 1 { "task" } else { "tasks" };
    format!("{} {} found", count, noun)
}

/// Mask a password for display, capped at `width` characters
pub fn mask(secret: &str, width: usize) -> String {
    "*".repeat(secret.chars().count().min(width))
}

/// Show the tail of a field that no longer fits, so the cursor stays visible
pub fn tail(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        s.to_string()
    } else {
        s.chars().skip(count - width).collect()
    }
}
