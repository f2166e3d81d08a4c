//! In-memory rich-text document for tests and demos
//!
//! [`FormattedBuffer`] is a deliberately simple [`RichTextDocument`]:
//! per-character format attributes, per-paragraph alignment, and a
//! whole-snapshot undo stack. It exists so the synchronization and
//! formatting layers can be exercised without a real editor attached;
//! production hosts wrap their own document instead.

use crate::document::{Alignment, BlockFormat, CharFormat, Range, RichTextDocument};

#[derive(Clone)]
struct Snapshot {
    chars: Vec<char>,
    formats: Vec<CharFormat>,
    alignments: Vec<Alignment>,
}

/// A plain in-memory document with character formats and undo history
pub struct FormattedBuffer {
    chars: Vec<char>,
    formats: Vec<CharFormat>,
    /// One alignment per paragraph (paragraphs split on `\n`)
    alignments: Vec<Alignment>,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    modified: bool,
}

impl FormattedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            chars: Vec::new(),
            formats: Vec::new(),
            alignments: vec![Alignment::default()],
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            modified: false,
        }
    }

    /// Create a buffer holding `text`, unmodified and with empty history
    pub fn with_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let formats = vec![CharFormat::default(); chars.len()];
        let paragraphs = paragraph_count(&chars);
        Self {
            chars,
            formats,
            alignments: vec![Alignment::default(); paragraphs],
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            modified: false,
        }
    }

    /// Character length of the buffer
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the buffer holds no text
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            chars: self.chars.clone(),
            formats: self.formats.clone(),
            alignments: self.alignments.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.chars = snapshot.chars;
        self.formats = snapshot.formats;
        self.alignments = snapshot.alignments;
    }

    /// Record the current state before a mutation
    fn checkpoint(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        self.modified = true;
    }

    fn clamp(&self, range: Range) -> Range {
        Range::new(range.start.min(self.chars.len()), range.end.min(self.chars.len()))
    }

    /// Index of the paragraph containing `pos`
    fn paragraph_of(&self, pos: usize) -> usize {
        self.chars[..pos.min(self.chars.len())]
            .iter()
            .filter(|c| **c == '\n')
            .count()
    }

    fn sync_alignments(&mut self) {
        let paragraphs = paragraph_count(&self.chars);
        self.alignments.resize(paragraphs, Alignment::default());
    }

    /// The format of the character at `pos`, anchoring a caret at the end
    /// of text onto the character before it
    fn format_at(&self, pos: usize) -> CharFormat {
        if self.chars.is_empty() {
            return CharFormat::default();
        }
        let idx = pos.min(self.chars.len() - 1);
        self.formats[idx].clone()
    }
}

fn paragraph_count(chars: &[char]) -> usize {
    chars.iter().filter(|c| **c == '\n').count() + 1
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn escape_markup(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        other => out.push(other),
    }
}

impl Default for FormattedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RichTextDocument for FormattedBuffer {
    fn read_char_format(&self, range: Range) -> CharFormat {
        self.format_at(range.start)
    }

    fn merge_char_format(&mut self, range: Range, format: &CharFormat) {
        let range = self.clamp(range);
        if range.is_empty() {
            return;
        }
        self.checkpoint();
        for idx in range.start..range.end {
            self.formats[idx].merge(format);
        }
    }

    fn read_block_format(&self, range: Range) -> BlockFormat {
        let paragraph = self.paragraph_of(range.start);
        BlockFormat {
            alignment: self.alignments.get(paragraph).copied(),
        }
    }

    fn merge_block_format(&mut self, range: Range, format: &BlockFormat) {
        let Some(alignment) = format.alignment else {
            return;
        };
        let range = self.clamp(range);
        let first = self.paragraph_of(range.start);
        let last = self.paragraph_of(range.end);
        self.checkpoint();
        for paragraph in first..=last.min(self.alignments.len().saturating_sub(1)) {
            self.alignments[paragraph] = alignment;
        }
    }

    fn select_word(&self, pos: usize) -> Range {
        let len = self.chars.len();
        let mut anchor = pos.min(len);

        // A caret at the end of a word anchors on the character before it.
        if anchor == len || !is_word_char(self.chars[anchor]) {
            if anchor > 0 && is_word_char(self.chars[anchor - 1]) {
                anchor -= 1;
            } else {
                return Range::caret(pos.min(len));
            }
        }

        let mut start = anchor;
        while start > 0 && is_word_char(self.chars[start - 1]) {
            start -= 1;
        }
        let mut end = anchor + 1;
        while end < len && is_word_char(self.chars[end]) {
            end += 1;
        }
        Range::new(start, end)
    }

    fn undo(&mut self) {
        if let Some(snapshot) = self.undo_stack.pop() {
            let current = self.snapshot();
            self.redo_stack.push(current);
            self.restore(snapshot);
            self.modified = true;
        }
    }

    fn redo(&mut self) {
        if let Some(snapshot) = self.redo_stack.pop() {
            let current = self.snapshot();
            self.undo_stack.push(current);
            self.restore(snapshot);
            self.modified = true;
        }
    }

    fn to_plain_text(&self) -> String {
        self.chars.iter().collect()
    }

    fn to_markup(&self) -> String {
        let mut out = String::new();
        let text = self.to_plain_text();
        let mut offset = 0;

        for (paragraph, line) in text.split('\n').enumerate() {
            let alignment = self
                .alignments
                .get(paragraph)
                .copied()
                .unwrap_or_default();
            match alignment {
                Alignment::Left => out.push_str("<p>"),
                Alignment::Center => out.push_str("<p align=\"center\">"),
                Alignment::Right => out.push_str("<p align=\"right\">"),
                Alignment::Justify => out.push_str("<p align=\"justify\">"),
            }

            for (i, c) in line.chars().enumerate() {
                let format = &self.formats[offset + i];
                let bold = format.bold == Some(true);
                let italic = format.italic == Some(true);
                let underline = format.underline == Some(true);

                if bold {
                    out.push_str("<b>");
                }
                if italic {
                    out.push_str("<i>");
                }
                if underline {
                    out.push_str("<u>");
                }
                escape_markup(&mut out, c);
                if underline {
                    out.push_str("</u>");
                }
                if italic {
                    out.push_str("</i>");
                }
                if bold {
                    out.push_str("</b>");
                }
            }
            out.push_str("</p>");
            offset += line.chars().count() + 1;
        }
        out
    }

    fn set_plain_text(&mut self, text: &str) {
        self.checkpoint();
        self.chars = text.chars().collect();
        self.formats = vec![CharFormat::default(); self.chars.len()];
        self.sync_alignments();
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }
}
