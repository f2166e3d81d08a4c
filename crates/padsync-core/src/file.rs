//! File reference and plain-text/markup load-save
//!
//! Loads decode bytes with BOM-based encoding sniffing (UTF-8, UTF-16LE,
//! UTF-16BE; anything unmarked is read as UTF-8 with replacement). Saves
//! pick the serialization from the target name: an extension containing
//! `htm` gets the document's markup, everything else plain text, both
//! written as UTF-8. Neither operation is transactional; a failed save
//! may leave a partial file behind.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::RichTextDocument;
use crate::error::{SyncError, SyncResult};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// A document's file location plus derived display properties
///
/// Set by load/save-as, read by UI bindings, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    path: PathBuf,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name; `untitled.txt` when the path has no file name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "untitled.txt".to_string())
    }

    /// The file type, i.e. the extension without the dot
    pub fn file_type(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether saves to this location use the markup serialization
    pub fn is_markup(&self) -> bool {
        self.file_type().to_ascii_lowercase().contains("htm")
    }
}

/// Read and decode a text file
///
/// # Errors
///
/// Returns `SyncError::Io` when the file cannot be read.
pub fn load_text(path: &Path) -> SyncResult<String> {
    let data = std::fs::read(path)?;
    let text = decode_text(&data);
    debug!(path = %path.display(), bytes = data.len(), chars = text.len(), "Loaded file");
    Ok(text)
}

/// Decode bytes into text, sniffing the encoding from a leading BOM
fn decode_text(data: &[u8]) -> String {
    if let Some(rest) = data.strip_prefix(&UTF8_BOM) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = data.strip_prefix(&UTF16_LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = data.strip_prefix(&UTF16_BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(data).into_owned()
}

fn decode_utf16(data: &[u8], to_u16: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| to_u16([pair[0], pair[1]]))
        .collect();
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Write the document to a file, as markup or plain text per the target
/// name's extension
///
/// # Errors
///
/// Returns `SyncError::Save` carrying the OS error message when the file
/// cannot be opened or written. The write is not retried.
pub fn save_document(path: &Path, doc: &dyn RichTextDocument) -> SyncResult<()> {
    let target = FileRef::new(path);
    let contents = if target.is_markup() {
        doc.to_markup()
    } else {
        doc.to_plain_text()
    };

    std::fs::write(path, contents.as_bytes()).map_err(|e| SyncError::Save(e.to_string()))?;
    debug!(path = %path.display(), markup = target.is_markup(), "Saved document");
    Ok(())
}
