//! Line-level parsing of `title: url` batch files

use serde::Serialize;

pub const SEPARATOR: &str = ": ";

/// Why a batch line was not turned into a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No `": "` separator, or nothing before it
    MalformedBatchLine,
    /// Separator present but the URL half is empty
    EmptyTargetUrl,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MalformedBatchLine => write!(f, "no \"title: url\" separator"),
            SkipReason::EmptyTargetUrl => write!(f, "empty URL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddableLine {
    pub title: String,
    pub url: String,
    /// The trimmed source line, used to find it again when rewriting the file
    pub original: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// Title when one could be parsed, otherwise the whole line
    pub label: String,
    pub original: String,
    pub reason: SkipReason,
}

/// Split text into trimmed, non-blank lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classify one trimmed line.
///
/// Only the first separator splits; URLs may contain `": "` themselves.
/// A line that ends in a bare `:` has had the separator's space trimmed away
/// and counts as an empty URL.
pub fn classify_line(line: &str) -> Result<AddableLine, SkippedLine> {
    let skipped = |label: &str, reason| SkippedLine {
        label: label.to_string(),
        original: line.to_string(),
        reason,
    };

    let (title, url) = match line.split_once(SEPARATOR) {
        Some((title, url)) => (title.trim(), url.trim()),
        None => match line.strip_suffix(':') {
            Some(title) if !title.trim().is_empty() => (title.trim(), ""),
            _ => return Err(skipped(line, SkipReason::MalformedBatchLine)),
        },
    };

    if title.is_empty() {
        return Err(skipped(line, SkipReason::MalformedBatchLine));
    }
    if url.is_empty() {
        return Err(skipped(title, SkipReason::EmptyTargetUrl));
    }

    Ok(AddableLine {
        title: title.to_string(),
        url: url.to_string(),
        original: line.to_string(),
    })
}

/// Short `title - https:/...game-id` form for previews.
pub fn preview_label(title: &str, url: &str) -> String {
    let chars: Vec<char> = url.chars().collect();
    if chars.len() <= 17 {
        return format!("{title} - {url}");
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 7..].iter().collect();
    format!("{title} - {head}...{tail}")
}
