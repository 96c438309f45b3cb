//! Text extraction for downloaded file content.
//!
//! The extension-to-extractor mapping is closed and enumerated: pdf and
//! docx/doc go through format libraries, a fixed set of text-like extensions
//! is decoded directly, everything else is rejected. Each extractor is a pure
//! bytes-to-text function.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use thiserror::Error;

/// Extensions decoded as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "py", "js", "html", "css", "json", "csv"];

/// Every extension [`extract_text`] accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "txt", "md", "py", "js", "html", "css", "json", "csv",
];

/// Errors from text extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The extension is not in the supported set.
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// The PDF library failed on the content.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The DOCX content could not be unpacked or parsed.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Lowercased extension of a path, if any.
pub fn extension(path: &str) -> Option<String> {
    std::path::Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Extract the text content of a downloaded file, dispatching on its
/// extension.
pub fn extract_text(path: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let ext = extension(path).unwrap_or_default();
    match ext.as_str() {
        "pdf" => extract_pdf(bytes),
        "docx" | "doc" => extract_docx(bytes),
        e if TEXT_EXTENSIONS.contains(&e) => Ok(decode_text(bytes)),
        "" => Err(ExtractError::UnsupportedFormat("(no extension)".into())),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|text| text.trim().to_string())
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Pull the text runs out of a DOCX archive's `word/document.xml`, one line
/// per paragraph. A legacy binary `.doc` is not a zip archive and fails here.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run => {
                let chunk = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                text.push_str(&chunk);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
        }
    }
    Ok(text.trim().to_string())
}

/// Decode text-like content: strict UTF-8 first, Latin-1 as the fallback.
/// Latin-1 maps every byte to the code point of the same value, so the
/// fallback never fails.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
