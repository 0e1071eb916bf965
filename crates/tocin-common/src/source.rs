//! The source map: every file in a compilation unit, keyed by [`FileId`].
//!
//! Diagnostics carry a `(FileId, Span)` pair; the source map resolves that
//! into a path, the source text, and a 1-based line/column for rendering.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::span::{LineIndex, Span};

/// A unique identifier for a source file within a compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileId(pub u32);

/// One registered source file.
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub text: String,
    line_index: LineIndex,
}

impl SourceFile {
    /// Convert a byte offset into a 1-based (line, column) pair.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        self.line_index.line_col(offset)
    }
}

/// Owns all source files of a compilation unit.
///
/// Files are registered once, in discovery order; ids are dense and stable
/// for the lifetime of the unit.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        let text = text.into();
        let line_index = LineIndex::new(&text);
        self.files.push(SourceFile {
            id,
            path: path.into(),
            text,
            line_index,
        });
        id
    }

    /// Look up a file by id.
    ///
    /// # Panics
    ///
    /// Panics if the id did not come from this map.
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    /// Find a registered file by its path.
    pub fn find_by_path(&self, path: &Path) -> Option<FileId> {
        self.files.iter().find(|f| f.path == path).map(|f| f.id)
    }

    /// The (line, column) of a span start, 1-based.
    pub fn line_col(&self, id: FileId, span: Span) -> (u32, u32) {
        self.file(id).line_col(span.start)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_resolve() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.to", "let x = 1\nlet y = 2\n");
        let b = map.add_file("b.to", "fn main() {}\n");
        assert_ne!(a, b);
        assert_eq!(map.file(a).path, PathBuf::from("a.to"));
        assert_eq!(map.line_col(a, Span::new(10, 13)), (2, 1));
        assert_eq!(map.find_by_path(Path::new("b.to")), Some(b));
        assert_eq!(map.find_by_path(Path::new("c.to")), None);
    }
}
