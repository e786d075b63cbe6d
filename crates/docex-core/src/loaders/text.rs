//! Plain text files.

use std::path::Path;

use tracing::debug;

use super::{DIRECT_TEXT_CONFIDENCE, Loader, into_result};
use crate::error::Result;
use crate::models::document::ExtractionResult;

const EMPTY_FILE: &str = "File is empty";

/// Reads UTF-8 and UTF-16 (with BOM) text files.
#[derive(Debug, Default)]
pub struct TextLoader;

impl TextLoader {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, path: &Path) -> Result<ExtractionResult> {
        let bytes = std::fs::read(path)?;
        let text = decode_text(&bytes);

        if text.trim().is_empty() {
            return Ok(ExtractionResult::failure(EMPTY_FILE));
        }
        Ok(ExtractionResult::success(text, DIRECT_TEXT_CONFIDENCE))
    }
}

impl Loader for TextLoader {
    fn name(&self) -> &str {
        "text"
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt", "text", "md"]
    }

    fn extract(&self, path: &Path) -> ExtractionResult {
        into_result(self.name(), path, self.load(path))
    }
}

/// Decode bytes honouring a UTF-8 or UTF-16 byte order mark. Invalid
/// sequences are replaced rather than rejected.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            debug!("Text is not valid UTF-8 ({}), decoding lossily", e);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// A dangling odd byte decodes to U+FFFD.
fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let pairs = bytes.chunks_exact(2);
    let dangling = !pairs.remainder().is_empty();
    let units = pairs.map(|pair| to_unit([pair[0], pair[1]]));

    let mut text: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if dangling {
        debug!("UTF-16 text has an odd trailing byte");
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn temp_file(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_reads_text() {
        let file = temp_file(".txt", b"License expires 12/2025\n");
        let result = TextLoader::new().extract(file.path());
        assert_eq!(result, ExtractionResult::success("License expires 12/2025\n", 1.0));
    }

    #[test]
    fn test_empty_and_blank_files() {
        for content in [&b""[..], &b"  \n\t\n"[..]] {
            let file = temp_file(".txt", content);
            let result = TextLoader::new().extract(file.path());
            assert_eq!(result, ExtractionResult::failure("File is empty"));
        }
    }

    #[test]
    fn test_missing_file() {
        let result = TextLoader::new().extract(Path::new("/nonexistent/docex/file.txt"));
        assert!(!result.is_success());
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.unwrap().starts_with("I/O error"));
    }

    #[test]
    fn test_decode_boms() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhello"), "hello");
        assert_eq!(decode_text(&[0xFF, 0xFE, b'h', 0, b'i', 0]), "hi");
        assert_eq!(decode_text(&[0xFE, 0xFF, 0, b'h', 0, b'i']), "hi");
    }

    #[test]
    fn test_decode_utf16_odd_trailing_byte() {
        assert_eq!(decode_text(&[0xFF, 0xFE, b'o', 0, b'k', 0, b'!']), "ok\u{FFFD}");
        assert_eq!(decode_text(&[0xFE, 0xFF, 0, b'o', 0]), "o\u{FFFD}");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(decode_text(b"caf\xE9"), "caf\u{FFFD}");
    }

    #[test]
    fn test_supports_case_insensitive() {
        let loader = TextLoader::new();
        assert!(loader.supports(Path::new("NOTES.TXT")));
        assert!(loader.supports(Path::new("readme.md")));
        assert!(!loader.supports(Path::new("scan.pdf")));
    }
}
