//! Formatting-state derivation and application
//!
//! [`FormatState`] tracks the cursor position and selection bounds the UI
//! reports, derives the active range from them on every query, reads the
//! character/block attributes in effect at that range, and applies format
//! edits back through the narrow document trait.
//!
//! Reads never fail: with no document attached every attribute falls back
//! to a defined default (empty family, size 0, false, black, left).
//! Applies over a caret widen to the word under the caret first, matching
//! the usual "format the word you're typing" editor behavior; a partial
//! format is merged so sibling attributes on the range stay untouched.

use tracing::trace;

use crate::document::{Alignment, BlockFormat, CharFormat, Color, Range, RichTextDocument};

/// Cursor/selection tracking plus format derivation over a document
///
/// Setters return `true` when the call changed something observers may
/// have derived from: a moved cursor or an applied format means all
/// derived attributes are stale and must be re-read.
#[derive(Debug, Default)]
pub struct FormatState {
    cursor_position: usize,
    selection_start: usize,
    selection_end: usize,
}

impl FormatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn selection_start(&self) -> usize {
        self.selection_start
    }

    pub fn selection_end(&self) -> usize {
        self.selection_end
    }

    /// Move the caret; returns `true` if it actually moved
    pub fn set_cursor_position(&mut self, pos: usize) -> bool {
        if pos == self.cursor_position {
            return false;
        }
        self.cursor_position = pos;
        true
    }

    /// Update the selection anchor; returns `true` if it changed
    pub fn set_selection_start(&mut self, pos: usize) -> bool {
        if pos == self.selection_start {
            return false;
        }
        self.selection_start = pos;
        true
    }

    /// Update the selection head; returns `true` if it changed
    pub fn set_selection_end(&mut self, pos: usize) -> bool {
        if pos == self.selection_end {
            return false;
        }
        self.selection_end = pos;
        true
    }

    /// The range format operations act on, recomputed on every call
    ///
    /// A non-empty selection wins; otherwise the zero-length caret.
    pub fn active_range(&self) -> Range {
        if self.selection_start != self.selection_end {
            Range::new(self.selection_start, self.selection_end)
        } else {
            Range::caret(self.cursor_position)
        }
    }

    fn read_char(&self, doc: Option<&dyn RichTextDocument>) -> CharFormat {
        doc.map(|d| d.read_char_format(self.active_range()))
            .unwrap_or_default()
    }

    /// Font family at the active range; empty string without a document
    pub fn font_family(&self, doc: Option<&dyn RichTextDocument>) -> String {
        self.read_char(doc).family.unwrap_or_default()
    }

    /// Point size at the active range; 0 without a document or when unset
    pub fn font_size(&self, doc: Option<&dyn RichTextDocument>) -> u32 {
        self.read_char(doc).size.unwrap_or(0)
    }

    pub fn bold(&self, doc: Option<&dyn RichTextDocument>) -> bool {
        self.read_char(doc).bold.unwrap_or(false)
    }

    pub fn italic(&self, doc: Option<&dyn RichTextDocument>) -> bool {
        self.read_char(doc).italic.unwrap_or(false)
    }

    pub fn underline(&self, doc: Option<&dyn RichTextDocument>) -> bool {
        self.read_char(doc).underline.unwrap_or(false)
    }

    /// Foreground color at the active range; black without a document
    pub fn text_color(&self, doc: Option<&dyn RichTextDocument>) -> Color {
        self.read_char(doc).color.unwrap_or(Color::BLACK)
    }

    /// Paragraph alignment at the active range; left without a document
    pub fn alignment(&self, doc: Option<&dyn RichTextDocument>) -> Alignment {
        doc.and_then(|d| d.read_block_format(self.active_range()).alignment)
            .unwrap_or(Alignment::Left)
    }

    /// The range a character-format apply resolves to: the selection if
    /// there is one, else the word under the caret
    fn word_or_selection(&self, doc: &dyn RichTextDocument) -> Range {
        let range = self.active_range();
        if range.is_caret() {
            doc.select_word(range.start)
        } else {
            range
        }
    }

    fn merge_on_word_or_selection(
        &self,
        doc: Option<&mut (dyn RichTextDocument + '_)>,
        format: CharFormat,
    ) -> bool {
        let Some(doc) = doc else {
            return false;
        };
        let range = self.word_or_selection(doc);
        trace!(?range, ?format, "Merging char format");
        doc.merge_char_format(range, &format);
        true
    }

    /// Set the font family over the word or selection
    pub fn set_font_family(&self, doc: Option<&mut (dyn RichTextDocument + '_)>, family: &str) -> bool {
        self.merge_on_word_or_selection(
            doc,
            CharFormat {
                family: Some(family.to_string()),
                ..Default::default()
            },
        )
    }

    /// Set the point size over the word or selection
    ///
    /// A size of 0 is rejected, and a size equal to the one already in
    /// effect at the resolved range is a no-op so observers see no
    /// spurious change.
    pub fn set_font_size(&self, doc: Option<&mut (dyn RichTextDocument + '_)>, size: u32) -> bool {
        if size == 0 {
            return false;
        }
        let Some(doc) = doc else {
            return false;
        };
        let range = self.word_or_selection(doc);
        if doc.read_char_format(range).size.unwrap_or(0) == size {
            return false;
        }
        doc.merge_char_format(
            range,
            &CharFormat {
                size: Some(size),
                ..Default::default()
            },
        );
        true
    }

    pub fn set_bold(&self, doc: Option<&mut (dyn RichTextDocument + '_)>, bold: bool) -> bool {
        self.merge_on_word_or_selection(
            doc,
            CharFormat {
                bold: Some(bold),
                ..Default::default()
            },
        )
    }

    pub fn set_italic(&self, doc: Option<&mut (dyn RichTextDocument + '_)>, italic: bool) -> bool {
        self.merge_on_word_or_selection(
            doc,
            CharFormat {
                italic: Some(italic),
                ..Default::default()
            },
        )
    }

    pub fn set_underline(&self, doc: Option<&mut (dyn RichTextDocument + '_)>, underline: bool) -> bool {
        self.merge_on_word_or_selection(
            doc,
            CharFormat {
                underline: Some(underline),
                ..Default::default()
            },
        )
    }

    /// Set the foreground color over the word or selection
    pub fn set_text_color(&self, doc: Option<&mut (dyn RichTextDocument + '_)>, color: Color) -> bool {
        self.merge_on_word_or_selection(
            doc,
            CharFormat {
                color: Some(color),
                ..Default::default()
            },
        )
    }

    /// Set the paragraph alignment at the active range
    ///
    /// Block formats apply to whole paragraphs; no word widening here.
    pub fn set_alignment(
        &self,
        doc: Option<&mut (dyn RichTextDocument + '_)>,
        alignment: Alignment,
    ) -> bool {
        let Some(doc) = doc else {
            return false;
        };
        doc.merge_block_format(
            self.active_range(),
            &BlockFormat {
                alignment: Some(alignment),
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_range_prefers_selection() {
        let mut state = FormatState::new();
        state.set_cursor_position(9);
        state.set_selection_start(2);
        state.set_selection_end(5);
        assert_eq!(state.active_range(), Range::new(2, 5));
    }

    #[test]
    fn test_active_range_falls_back_to_caret() {
        let mut state = FormatState::new();
        state.set_cursor_position(4);
        state.set_selection_start(7);
        state.set_selection_end(7);
        assert_eq!(state.active_range(), Range::caret(4));
    }

    #[test]
    fn test_setters_report_unchanged_positions() {
        let mut state = FormatState::new();
        assert!(state.set_cursor_position(3));
        assert!(!state.set_cursor_position(3));
        assert!(!state.set_selection_start(0));
        assert!(state.set_selection_end(2));
    }

    #[test]
    fn test_reads_default_without_document() {
        let state = FormatState::new();
        assert_eq!(state.font_family(None), "");
        assert_eq!(state.font_size(None), 0);
        assert!(!state.bold(None));
        assert!(!state.italic(None));
        assert!(!state.underline(None));
        assert_eq!(state.text_color(None), Color::BLACK);
        assert_eq!(state.alignment(None), Alignment::Left);
    }

    #[test]
    fn test_applies_are_noops_without_document() {
        let state = FormatState::new();
        assert!(!state.set_bold(None, true));
        assert!(!state.set_font_size(None, 12));
        assert!(!state.set_alignment(None, Alignment::Center));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let state = FormatState::new();
        // Rejected before the document is even consulted.
        assert!(!state.set_font_size(None, 0));
    }
}
