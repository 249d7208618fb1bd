//! Source files and positions.
//!
//! A [`SourceFile`] owns the full text of one script plus a newline table that
//! maps byte offsets to line/column pairs in O(log n). Files are immutable
//! after construction; every parsed word points back into the file via a
//! [`SourceLocation`].

use std::fmt;
use std::sync::Arc;

/// A byte range into a [`SourceFile`]'s contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `other` lies entirely within this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A 0-based (line, column) pair, as used by editor protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LinePos {
    pub line: u32,
    pub column: u32,
}

impl LinePos {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for LinePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One source document: name, contents, and the newline index.
///
/// The newline table records the byte offset of every `\n` plus a sentinel at
/// end-of-file, so offset-to-line lookup is a binary search over it.
#[derive(Debug)]
pub struct SourceFile {
    name: String,
    contents: String,
    newlines: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Arc<Self> {
        let contents = contents.into();
        let mut newlines: Vec<usize> =
            contents.bytes().enumerate().filter(|(_, b)| *b == b'\n').map(|(i, _)| i).collect();
        newlines.push(contents.len());
        Arc::new(Self { name: name.into(), contents, newlines })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// The text covered by `span`.
    pub fn slice(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// Map a byte offset to its 0-based line and column.
    ///
    /// Valid for any offset in `0..=len`; the end-of-file sentinel makes the
    /// one-past-the-end offset addressable.
    pub fn line_pos(&self, offset: usize) -> LinePos {
        debug_assert!(offset <= self.contents.len(), "offset out of range");
        let line = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = if line == 0 { 0 } else { self.newlines[line - 1] + 1 };
        LinePos::new(line as u32, (offset - line_start) as u32)
    }

    /// Map a 0-based line/column back to a byte offset.
    ///
    /// Columns past the end of the line clamp to the line end; lines past the
    /// end of the file clamp to the file end.
    pub fn offset(&self, pos: LinePos) -> usize {
        let line = pos.line as usize;
        if line >= self.newlines.len() {
            return self.contents.len();
        }
        let line_start = if line == 0 { 0 } else { self.newlines[line - 1] + 1 };
        let line_end = self.newlines[line];
        (line_start + pos.column as usize).min(line_end)
    }
}

/// A position inside a specific file.
#[derive(Clone)]
pub struct SourceLocation {
    pub file: Arc<SourceFile>,
    /// 0-based byte offset into the file contents.
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: &Arc<SourceFile>, offset: usize) -> Self {
        let pos = file.line_pos(offset);
        Self { file: Arc::clone(file), offset, line: pos.line, column: pos.column }
    }

    pub fn line_pos(&self) -> LinePos {
        LinePos::new(self.line, self.column)
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.name(), self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_pos_table() {
        let cases: &[(&str, usize, (u32, u32))] = &[
            ("this is some text", 0, (0, 0)),
            ("", 0, (0, 0)),
            ("1\n2\n3\n4", 0, (0, 0)),
            ("1\n2\n3\n4", 1, (0, 1)),
            ("1\n2\n3\n4", 2, (1, 0)),
            ("1\n2\n3\n4", 3, (1, 1)),
            ("1\n2\n3\n4", 4, (2, 0)),
            ("1\n2\n3\n4", 5, (2, 1)),
            ("aaaa\nbbbb\ncccc", 8, (1, 3)),
        ];
        for (text, offset, (line, column)) in cases {
            let file = SourceFile::new("test", *text);
            assert_eq!(
                file.line_pos(*offset),
                LinePos::new(*line, *column),
                "offset {offset} in {text:?}"
            );
        }
    }

    #[test]
    fn test_offset_round_trip() {
        let text = "proc greet {name} {\n    puts \"Hello $name\"\n}\n";
        let file = SourceFile::new("test.tcl", text);
        for offset in 0..=text.len() {
            let pos = file.line_pos(offset);
            assert_eq!(file.offset(pos), offset, "round trip at {offset}");
        }
    }

    #[test]
    fn test_offset_clamps() {
        let file = SourceFile::new("test", "ab\ncd");
        assert_eq!(file.offset(LinePos::new(0, 99)), 2);
        assert_eq!(file.offset(LinePos::new(9, 0)), 5);
    }

    #[test]
    fn test_location_carries_file() {
        let file = SourceFile::new("a.tcl", "x\ny");
        let loc = SourceLocation::new(&file, 2);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 0);
        assert_eq!(loc.file.name(), "a.tcl");
    }
}
