//! URL list file reading.

use std::path::Path;

/// Read newline-delimited URLs, trimming each line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_urls(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_urls(&contents))
}

fn parse_urls(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
