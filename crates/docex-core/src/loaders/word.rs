//! Word (.docx) documents.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{DIRECT_TEXT_CONFIDENCE, Loader, into_result};
use crate::error::{DocexError, Result};
use crate::models::document::ExtractionResult;

const EMPTY_DOCUMENT: &str = "Empty document";
const BODY_PART: &str = "word/document.xml";

/// Reads the body text of OOXML word-processing documents.
#[derive(Debug, Default)]
pub struct WordLoader;

impl WordLoader {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, path: &Path) -> Result<ExtractionResult> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| DocexError::ExtractionFailed(format!("not a .docx archive: {}", e)))?;

        let mut xml = String::new();
        archive
            .by_name(BODY_PART)
            .map_err(|e| DocexError::ExtractionFailed(format!("{} missing: {}", BODY_PART, e)))?
            .read_to_string(&mut xml)?;

        let text = document_text(&xml)?;
        if text.trim().is_empty() {
            return Ok(ExtractionResult::failure(EMPTY_DOCUMENT));
        }
        Ok(ExtractionResult::success(text, DIRECT_TEXT_CONFIDENCE))
    }
}

impl Loader for WordLoader {
    fn name(&self) -> &str {
        "word"
    }

    fn extensions(&self) -> &[&'static str] {
        &["docx"]
    }

    fn extract(&self, path: &Path) -> ExtractionResult {
        into_result(self.name(), path, self.load(path))
    }
}

/// Text of `w:t` runs, one line per paragraph.
fn document_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DocexError::ExtractionFailed(format!("invalid document XML: {}", e)))?;

        match event {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_run_text => {
                let chunk = e
                    .unescape()
                    .map_err(|e| DocexError::ExtractionFailed(format!("invalid document XML: {}", e)))?;
                text.push_str(&chunk);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    Ok(lines.join("\n").trim().to_string())
}
