//! Narrow interface over the rich-text document collaborator
//!
//! The hosting UI owns a full rich-text document (text plus formatting
//! runs plus an undo stack). padsync never touches that API surface
//! directly; everything it needs goes through [`RichTextDocument`]:
//! format reads and merges over a range, word selection for caret
//! widening, undo/redo, and the plain-text/markup serializations.

use serde::{Deserialize, Serialize};

/// A half-open character range `[start, end)` into the document
///
/// `start == end` denotes a caret with no selection. Offsets are
/// zero-based character positions; callers clamp them to the document
/// length before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    /// Create a range, normalizing a reversed selection
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// A zero-length caret position
    pub fn caret(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    /// Whether this is a caret (no selection)
    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range covers no characters
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An RGB foreground color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Character-level format attributes
///
/// Every field is optional: `None` means "leave unchanged" when merging
/// and "not set, use the default" when reading. Merging a format with a
/// single `Some` field into a range must preserve all sibling attributes
/// already present on that range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharFormat {
    pub family: Option<String>,
    /// Point size; always positive when set
    pub size: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Color>,
}

impl CharFormat {
    /// Overlay another format onto this one, field by field
    ///
    /// `Some` fields in `other` win; `None` fields leave this format's
    /// value in place.
    pub fn merge(&mut self, other: &CharFormat) {
        if let Some(family) = &other.family {
            self.family = Some(family.clone());
        }
        if let Some(size) = other.size {
            self.size = Some(size);
        }
        if let Some(bold) = other.bold {
            self.bold = Some(bold);
        }
        if let Some(italic) = other.italic {
            self.italic = Some(italic);
        }
        if let Some(underline) = other.underline {
            self.underline = Some(underline);
        }
        if let Some(color) = other.color {
            self.color = Some(color);
        }
    }
}

/// Block-level (paragraph) format attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFormat {
    pub alignment: Option<Alignment>,
}

/// The document operations padsync needs from the hosting editor
///
/// Implementations wrap the real rich-text document. Format reads return
/// the attributes in effect at the start of the given range; merges apply
/// partial formats without disturbing sibling attributes. The modified
/// flag follows the usual editor convention (cleared on load/save).
pub trait RichTextDocument: Send {
    /// Character format in effect at `range.start`
    fn read_char_format(&self, range: Range) -> CharFormat;

    /// Merge a partial character format over `range`
    fn merge_char_format(&mut self, range: Range, format: &CharFormat);

    /// Block format in effect at `range.start`
    fn read_block_format(&self, range: Range) -> BlockFormat;

    /// Merge a partial block format over the paragraphs touching `range`
    fn merge_block_format(&mut self, range: Range, format: &BlockFormat);

    /// The word boundaries around `pos`, for caret widening
    ///
    /// If `pos` does not sit inside a word the returned range is the
    /// caret itself.
    fn select_word(&self, pos: usize) -> Range;

    /// Undo the most recent local edit, if any
    fn undo(&mut self);

    /// Redo the most recently undone local edit, if any
    fn redo(&mut self);

    /// Current content as plain text
    fn to_plain_text(&self) -> String;

    /// Current content in the document's markup serialization
    fn to_markup(&self) -> String;

    /// Replace the entire content with plain text
    fn set_plain_text(&mut self, text: &str);

    /// Whether the document has unsaved edits
    fn is_modified(&self) -> bool;

    /// Set or clear the modified flag
    fn set_modified(&mut self, modified: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_normalizes_reversed_selection() {
        let range = Range::new(7, 3);
        assert_eq!(range.start, 3);
        assert_eq!(range.end, 7);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_caret_is_empty() {
        let caret = Range::caret(5);
        assert!(caret.is_caret());
        assert!(caret.is_empty());
        assert_eq!(caret.len(), 0);
    }

    #[test]
    fn test_merge_overlays_only_set_fields() {
        let mut base = CharFormat {
            bold: Some(true),
            italic: Some(true),
            size: Some(12),
            ..Default::default()
        };
        base.merge(&CharFormat {
            bold: Some(false),
            color: Some(Color::new(255, 0, 0)),
            ..Default::default()
        });

        assert_eq!(base.bold, Some(false));
        assert_eq!(base.italic, Some(true));
        assert_eq!(base.size, Some(12));
        assert_eq!(base.color, Some(Color::new(255, 0, 0)));
    }

    #[test]
    fn test_default_alignment_is_left() {
        assert_eq!(Alignment::default(), Alignment::Left);
    }

    #[test]
    fn test_default_color_is_black() {
        assert_eq!(Color::default(), Color::BLACK);
    }
}
