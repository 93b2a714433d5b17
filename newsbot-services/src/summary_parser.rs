//! Parsing of generated summaries into discrete points
//!
//! Grammar, applied line by line:
//! - blank lines are skipped
//! - a leading bullet (`-`, `*`, `+`, `•`, `・`) is stripped together with the
//!   whitespace after it
//! - an enumerator (`1.`, `2)`, `(3)`) is stripped only when whitespace follows,
//!   so decimals such as `3.5%` survive
//! - lines of 10 characters or fewer after stripping are noise
//!
//! The surviving points are cut to `max_points`. Fewer than [`MIN_POINTS`]
//! means the response was not a usable list, and the raw response becomes the
//! single point.

use std::sync::OnceLock;

use regex::Regex;

/// Fewer parsed points than this falls back to the raw response
pub const MIN_POINTS: usize = 3;

/// Points of this many characters or fewer are discarded
pub const NOISE_MAX_CHARS: usize = 10;

fn marker_regex() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| Regex::new(r"^(?:[-*+•・]+\s*|\d+[.)]\s+|\(\d+\)\s+)").ok())
        .as_ref()
}

/// Strip one leading bullet or enumerator from a trimmed line
pub fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    match marker_regex().and_then(|re| re.find(line)) {
        Some(m) => line[m.end()..].trim(),
        None => line,
    }
}

/// Split a generated response into summary points.
///
/// Returns an empty vector only when `raw` is blank.
pub fn parse_summary_points(raw: &str, max_points: usize) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let points: Vec<String> = raw
        .lines()
        .map(strip_marker)
        .filter(|point| point.chars().count() > NOISE_MAX_CHARS)
        .take(max_points)
        .map(str::to_string)
        .collect();

    if points.len() < MIN_POINTS {
        return vec![raw.to_string()];
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_bullets() {
        let raw = "- Python 3.11 was released today\n- Error messages are much clearer\n- Asyncio got noticeably faster\n";
        assert_eq!(
            parse_summary_points(raw, 8),
            vec![
                "Python 3.11 was released today",
                "Error messages are much clearer",
                "Asyncio got noticeably faster",
            ]
        );
    }

    #[test]
    fn test_numbered_list() {
        let raw = "1. First numbered point here\n2) Second numbered point here\n(3) Third numbered point here";
        assert_eq!(
            parse_summary_points(raw, 8),
            vec![
                "First numbered point here",
                "Second numbered point here",
                "Third numbered point here",
            ]
        );
    }

    #[test]
    fn test_mixed_markers_and_unmarked_lines() {
        let raw = "* Star bulleted point text\n• Unicode bullet point text\n・ Japanese style bullet text\nUnmarked line of enough length";
        let points = parse_summary_points(raw, 8);
        assert_eq!(points.len(), 4);
        assert_eq!(points[2], "Japanese style bullet text");
        assert_eq!(points[3], "Unmarked line of enough length");
    }

    #[test]
    fn test_numbers_without_enumerator_punctuation_are_kept() {
        assert_eq!(strip_marker("2024 was a record year"), "2024 was a record year");
        assert_eq!(strip_marker("  - 3.5% growth in Q2"), "3.5% growth in Q2");
    }

    #[test]
    fn test_unbulleted_decimals_are_kept() {
        let raw = "3.5% growth in the second quarter
10.2 million new subscribers joined
1.5x faster build times reported";
        assert_eq!(
            parse_summary_points(raw, 8),
            vec![
                "3.5% growth in the second quarter",
                "10.2 million new subscribers joined",
                "1.5x faster build times reported",
            ]
        );
        assert_eq!(strip_marker("(2024) was a record year"), "(2024) was a record year");
        assert_eq!(strip_marker("4)no space after marker"), "4)no space after marker");
    }

    #[test]
    fn test_short_lines_are_noise() {
        let raw = "Summary:\n- ok\n- A sufficiently long point\n- Another long enough point\n- Yet another long point\n- 0123456789";
        assert_eq!(
            parse_summary_points(raw, 8),
            vec![
                "A sufficiently long point",
                "Another long enough point",
                "Yet another long point",
            ]
        );
    }

    #[test]
    fn test_truncated_to_max_points() {
        let raw = (1..=12)
            .map(|i| format!("- Point number {} with detail", i))
            .collect::<Vec<_>>()
            .join("\n");
        let points = parse_summary_points(&raw, 8);
        assert_eq!(points.len(), 8);
        assert_eq!(points[7], "Point number 8 with detail");
    }

    #[test]
    fn test_unmarked_paragraph_falls_back_to_raw() {
        let raw = "This is not a bulleted list";
        assert_eq!(parse_summary_points(raw, 8), vec![raw.to_string()]);
    }

    #[test]
    fn test_two_points_fall_back_to_raw() {
        let raw = "- The first real point here\n- The second real point here";
        assert_eq!(parse_summary_points(raw, 8), vec![raw.to_string()]);
    }

    #[test]
    fn test_max_points_below_minimum_falls_back_to_raw() {
        let raw = "- Point number one here\n- Point number two here\n- Point number three here";
        assert_eq!(parse_summary_points(raw, 2), vec![raw.to_string()]);
    }

    #[test]
    fn test_single_line() {
        assert_eq!(parse_summary_points("- one", 8), vec!["- one".to_string()]);
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_summary_points("", 8).is_empty());
        assert!(parse_summary_points(" \n\t", 8).is_empty());
    }
}
