//! Screen capture classification
//!
//! A screen capture is the plain text of a terminal pane, re-rendered on every
//! poll. Nothing in it is structured, so classification works on line shapes:
//!
//! 1. **Interactive layouts**: modal prompts recognized by a top/bottom marker
//!    pair (see [`layouts`]).
//! 2. **Spinner status**: the agent's working indicator, a line led by one of
//!    [`SPINNER_GLYPHS`].
//! 3. **Fallback status**: the last non-blank line, for agents without a
//!    recognizable spinner.
//!
//! "No match" is a normal outcome; callers keep the previous status.

pub mod layouts;

use crate::types::StatusUpdate;
use layouts::{Layout, LAYOUTS};

/// Leading glyphs of the working-status line.
pub const SPINNER_GLYPHS: [char; 6] = ['·', '✻', '✽', '✶', '✳', '✢'];

/// Minimum width of a horizontal rule bounding the input box.
pub const MIN_SEPARATOR_WIDTH: usize = 20;

/// How far above the bottom of the pane the input-box rules are searched for.
pub const CHROME_SEARCH_LINES: usize = 12;

/// Character budget for relayed shell command output.
pub const COMMAND_OUTPUT_MAX_CHARS: usize = 3000;

/// Appended when command output exceeds [`COMMAND_OUTPUT_MAX_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n… (output truncated)";

/// Prefix of the result line rendered under a tool call or shell command.
const RESULT_PREFIX: char = '⎿';

// ============================================
// Interactive layouts
// ============================================

/// Detect any known interactive layout.
pub fn detect_interactive(text: &str) -> Option<StatusUpdate> {
    detect_among(text, LAYOUTS.iter())
}

/// Detect only the named layouts, still in priority order.
pub fn detect_interactive_among(text: &str, names: &[&str]) -> Option<StatusUpdate> {
    detect_among(
        text,
        LAYOUTS.iter().filter(|l| names.contains(&l.spec.name)),
    )
}

fn detect_among<'a>(
    text: &str,
    candidates: impl Iterator<Item = &'a Layout>,
) -> Option<StatusUpdate> {
    let lines: Vec<&str> = text.lines().collect();

    for layout in candidates {
        if let Some(m) = layout.find(&lines) {
            let content = lines[m.start..=m.end]
                .iter()
                .map(|l| l.trim_end())
                .collect::<Vec<_>>()
                .join("\n");
            tracing::debug!(ui_type = m.name, start = m.start, end = m.end, "Interactive UI detected");
            return Some(StatusUpdate::interactive(m.name, m.label, content));
        }
    }
    None
}

/// True if any known interactive layout is on screen.
pub fn is_interactive_ui(text: &str) -> bool {
    detect_interactive(text).is_some()
}

// ============================================
// Status lines
// ============================================

/// Find the most recent spinner line.
///
/// The raw text is the line with its glyph removed. The display label also
/// drops the trailing stats suffix, so `✻ Undulating… (3m 2s · thinking)`
/// becomes `Undulating…`.
pub fn parse_spinner_status(text: &str) -> Option<StatusUpdate> {
    text.lines().rev().find_map(|line| {
        let trimmed = line.trim_start();
        let mut chars = trimmed.chars();
        let glyph = chars.next()?;
        if !SPINNER_GLYPHS.contains(&glyph) {
            return None;
        }

        let rest = chars.as_str();
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let raw = rest.trim();
        if raw.is_empty() {
            return None;
        }
        Some(StatusUpdate::status(raw, strip_stats_suffix(raw)))
    })
}

/// Drop a trailing `( ... )` group and the whitespace before it.
fn strip_stats_suffix(text: &str) -> &str {
    if !text.ends_with(')') {
        return text;
    }
    match text.rfind(" (") {
        Some(idx) if idx > 0 => text[..idx].trim_end(),
        _ => text,
    }
}

/// Last non-blank line, trimmed.
pub fn parse_fallback_status(text: &str) -> Option<StatusUpdate> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| StatusUpdate::status(l, l))
}

/// Classify a screen: interactive layouts first, then the spinner line.
pub fn parse_screen(text: &str) -> Option<StatusUpdate> {
    detect_interactive(text).or_else(|| parse_spinner_status(text))
}

// ============================================
// Pane content helpers
// ============================================

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= MIN_SEPARATOR_WIDTH
        && trimmed.chars().all(|c| c == '─' || c == '━')
}

/// Remove the input box and status bar from the bottom of a capture.
///
/// The input box is bounded by two horizontal rules; everything from the upper
/// rule down is chrome. With a single rule near the bottom, the cut is made at
/// that rule. A capture with no rule near the bottom is returned with only
/// trailing blank lines removed.
pub fn strip_pane_chrome(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let window_start = lines.len().saturating_sub(CHROME_SEARCH_LINES);

    let rules: Vec<usize> = (window_start..lines.len())
        .filter(|&i| is_separator(lines[i]))
        .collect();

    let cut = match rules.as_slice() {
        [] => lines.len(),
        [only] => *only,
        [.., upper, _lower] => *upper,
    };

    let mut kept = &lines[..cut];
    while let [rest @ .., last] = kept {
        if !last.trim().is_empty() {
            break;
        }
        kept = rest;
    }
    kept.join("\n")
}

/// Output of a `! command` shell escape, as rendered in the pane.
///
/// Returns `None` until the echoed command line is on screen. The result
/// marker on the first output line is removed and the text is bounded by
/// [`COMMAND_OUTPUT_MAX_CHARS`].
pub fn extract_command_output(text: &str, command: &str) -> Option<String> {
    let echo = format!("! {}", command.trim());
    let body = strip_pane_chrome(text);
    let lines: Vec<&str> = body.lines().collect();

    let idx = lines.iter().rposition(|l| l.trim() == echo)?;

    let output: Vec<&str> = lines[idx + 1..]
        .iter()
        .map(|l| {
            let t = l.trim_start();
            match t.strip_prefix(RESULT_PREFIX) {
                Some(rest) => rest.trim_start(),
                None => t,
            }
        })
        .collect();
    let output = output.join("\n");
    let output = output.trim_end();

    if output.chars().count() <= COMMAND_OUTPUT_MAX_CHARS {
        return Some(output.to_string());
    }

    let mut truncated: String = output.chars().take(COMMAND_OUTPUT_MAX_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    Some(truncated)
}
