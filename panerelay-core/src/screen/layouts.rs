//! Interactive layout signatures
//!
//! Each signature is a set of top-marker patterns (the question or header of
//! the modal panel), a set of bottom-marker patterns (the key hint that closes
//! the panel) and a minimum line gap between the two. Patterns are matched per
//! line. Signatures are evaluated in [`LAYOUTS`] order; the first match wins.
//!
//! The marker strings are taken from real captures of the Claude Code TUI.
//! New CLI releases may change them; an unrecognized modal is reported as no
//! match, never misclassified.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines between top and bottom markers below which a pair is treated as a
/// rendering coincidence rather than a modal panel.
pub const DEFAULT_MIN_GAP: usize = 2;

/// Static description of one layout.
#[derive(Debug, Clone, Copy)]
pub struct LayoutSpec {
    pub name: &'static str,
    /// Short chat-facing label
    pub label: &'static str,
    pub top: &'static [&'static str],
    pub bottom: &'static [&'static str],
    pub min_gap: usize,
}

/// Known layouts in priority order.
pub const LAYOUT_SPECS: &[LayoutSpec] = &[
    LayoutSpec {
        name: "ExitPlanMode",
        label: "Plan approval",
        top: &[
            r"^\s*Would you like to proceed\?",
            r"^\s*Claude has written up a plan",
        ],
        bottom: &[r"^\s*ctrl-g to edit", r"^\s*Esc to (cancel|exit)"],
        min_gap: DEFAULT_MIN_GAP,
    },
    LayoutSpec {
        name: "AskUserQuestion",
        label: "Question",
        top: &[r"^\s*←\s+[☐✔☒]", r"^\s*[☐✔☒]\s"],
        bottom: &[r"^\s*Enter to select"],
        min_gap: DEFAULT_MIN_GAP,
    },
    LayoutSpec {
        name: "PermissionPrompt",
        label: "Permission request",
        top: &[
            r"^\s*Do you want to proceed\?",
            r"^\s*Do you want to make this edit",
            r"^\s*Do you want to create ",
            r"^\s*Do you want to allow",
        ],
        bottom: &[r"Esc to cancel"],
        min_gap: DEFAULT_MIN_GAP,
    },
    LayoutSpec {
        name: "TrustFolder",
        label: "Trust folder",
        top: &[
            r"^\s*Do you trust the files in this folder\?",
            r"Is this a project you created or one you trust\?",
            r"^\s*Do you trust this project\?",
        ],
        bottom: &[r"^\s*Enter to confirm"],
        min_gap: DEFAULT_MIN_GAP,
    },
    LayoutSpec {
        name: "RestoreCheckpoint",
        label: "Restore checkpoint",
        top: &[r"^\s*Restore the code", r"^\s*Restore conversation"],
        bottom: &[r"^\s*Enter to continue", r"Esc to cancel"],
        min_gap: DEFAULT_MIN_GAP,
    },
    LayoutSpec {
        name: "Settings",
        label: "Settings",
        top: &[r"^\s*Settings:.*tab to cycle", r"^\s*Select model"],
        bottom: &[
            r"Esc to (cancel|exit)",
            r"^\s*Enter to confirm",
            r"^\s*Type to filter",
        ],
        min_gap: DEFAULT_MIN_GAP,
    },
];

/// A layout with its patterns compiled.
#[derive(Debug)]
pub struct Layout {
    pub spec: LayoutSpec,
    top: Vec<Regex>,
    bottom: Vec<Regex>,
}

/// Matched span of a layout within a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMatch {
    pub name: &'static str,
    pub label: &'static str,
    /// Index of the top-marker line
    pub start: usize,
    /// Index of the bottom-marker line (inclusive)
    pub end: usize,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("layout patterns are valid regexes"))
        .collect()
}

/// Compiled layouts in priority order.
pub static LAYOUTS: Lazy<Vec<Layout>> = Lazy::new(|| {
    LAYOUT_SPECS
        .iter()
        .map(|spec| Layout {
            spec: *spec,
            top: compile(spec.top),
            bottom: compile(spec.bottom),
        })
        .collect()
});

impl Layout {
    fn is_top(&self, line: &str) -> bool {
        self.top.iter().any(|re| re.is_match(line))
    }

    fn is_bottom(&self, line: &str) -> bool {
        self.bottom.iter().any(|re| re.is_match(line))
    }

    /// Find this layout in `lines`.
    ///
    /// Top markers are tried from the bottom of the screen upward so the most
    /// recent render wins over scrollback. For the first top marker that has a
    /// bottom marker beneath it, the pair matches only if the bottom is at
    /// least `min_gap` lines below; otherwise the layout is absent.
    pub fn find(&self, lines: &[&str]) -> Option<LayoutMatch> {
        for start in (0..lines.len()).rev() {
            if !self.is_top(lines[start]) {
                continue;
            }

            let Some(offset) = lines[start + 1..].iter().position(|l| self.is_bottom(l)) else {
                continue;
            };
            let end = start + 1 + offset;

            if end - start < self.spec.min_gap {
                tracing::trace!(
                    layout = self.spec.name,
                    start,
                    end,
                    "Markers too close, ignoring"
                );
                return None;
            }

            return Some(LayoutMatch {
                name: self.spec.name,
                label: self.spec.label,
                start,
                end,
            });
        }
        None
    }
}

/// Look up a compiled layout by name.
pub fn layout(name: &str) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|l| l.spec.name == name)
}

/// Names of all known layouts, in priority order.
pub fn layout_names() -> Vec<&'static str> {
    LAYOUT_SPECS.iter().map(|s| s.name).collect()
}
