//! Status and failure text formatting.

use std::time::Duration;

/// Format elapsed build time.
///
/// Under an hour this is `MM:SS`; from an hour on the hour is prepended as
/// `H:MM:SS`. Fractional seconds are truncated.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;

    if hours == 0 {
        format!("{:02}:{:02}", minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Build the live status line shown by the progress display.
pub fn status_line(elapsed: Duration, completed: u64, total: u64, last_stdout: &str) -> String {
    format!(
        "Elapsed: {}       Nodes: {} / {}       {}",
        format_elapsed(elapsed),
        completed,
        total,
        last_stdout
    )
    .trim_end()
    .to_string()
}

/// Greedy word wrap.
///
/// Runs of whitespace collapse to a single space. Words longer than `width`
/// are split across lines. Empty input yields no lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        loop {
            let word_len = word.chars().count();
            let needed = if current_len == 0 {
                word_len
            } else {
                current_len + 1 + word_len
            };

            if needed <= width {
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(word);
                current_len += word_len;
                break;
            }

            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }

            let split = word
                .char_indices()
                .nth(width)
                .map_or(word.len(), |(i, _)| i);
            lines.push(word[..split].to_string());
            word = &word[split..];
            if word.is_empty() {
                break;
            }
        }
    }

    if current_len > 0 {
        lines.push(current);
    }

    lines
}
