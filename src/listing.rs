//! Addressable spaces for scatter and gather.
//!
//! Directories are addressed by position in their sorted file listing, files
//! by line number. Both use half-open `[from, to)` ranges.

use crate::table::IndexRange;

/// Relative file paths under a directory root, sorted lexicographically so
/// that index ranges mean the same thing on every node and every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing(Vec<String>);

impl FileListing {
    pub fn new(mut paths: Vec<String>) -> Self {
        paths.sort();
        Self(paths)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    /// The files a destination receives. Bounds are clamped to the listing;
    /// an inverted range is empty. `None` selects everything.
    pub fn slice(&self, range: Option<IndexRange>) -> &[String] {
        let Some(range) = range else {
            return &self.0;
        };
        let to = range.to.unwrap_or(self.0.len()).min(self.0.len());
        let from = range.from.min(to);
        &self.0[from..to]
    }
}

/// Line range `[from, to)` of a file, 0-based. `to = None` means "to the end
/// of the file".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInterval {
    pub from: usize,
    pub to: Option<usize>,
}

impl LineInterval {
    pub const WHOLE: LineInterval = LineInterval { from: 0, to: None };

    pub fn new(from: usize, to: Option<usize>) -> Self {
        Self { from, to }
    }

    pub fn is_whole(&self) -> bool {
        *self == Self::WHOLE
    }

    /// Whether the interval is known to contain no lines.
    pub fn is_empty(&self) -> bool {
        matches!(self.to, Some(to) if to <= self.from)
    }

    /// Pins an open end to the file's line count. The whole file stays open
    /// since it can be sent without counting.
    pub fn resolve(self, line_count: usize) -> Self {
        match self.to {
            None if !self.is_whole() => Self::new(self.from, Some(line_count)),
            _ => self,
        }
    }

    pub fn needs_line_count(&self) -> bool {
        self.to.is_none() && !self.is_whole()
    }
}

impl From<Option<IndexRange>> for LineInterval {
    fn from(range: Option<IndexRange>) -> Self {
        match range {
            Some(IndexRange { from, to }) => Self::new(from, to),
            None => Self::WHOLE,
        }
    }
}
