//! Hunk and line model shared with the provider layer.

use serde::{Deserialize, Serialize};

/// One changed line inside a diff hunk. Line numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLine {
    Added {
        new_line: u32,
        content: String,
    },
    Removed {
        old_line: u32,
        content: String,
    },
    Context {
        old_line: u32,
        new_line: u32,
        content: String,
    },
}

/// A continuous block of changes in standard unified form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// Tunables for the diff computation.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Context lines kept on each side of a change block.
    pub context: usize,
    /// Edit-distance ceiling before degrading to full replacement.
    pub max_edit_distance: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context: 3,
            max_edit_distance: 8_000,
        }
    }
}
