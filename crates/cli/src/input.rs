//! Reading a document from disk into a [`PdfInput`].

use std::path::Path;

use anyhow::{Context, Result};
use pdfquiz_ingest::pipeline::PDF_MIME_TYPE;
use pdfquiz_ingest::PdfInput;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// MIME type from the file's magic bytes, else from its extension.
pub fn detect_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) {
        return PDF_MIME_TYPE;
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => PDF_MIME_TYPE,
        Some("txt") | Some("md") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub fn read_input(path: &Path) -> Result<PdfInput> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mime_type = detect_mime_type(path, &bytes);
    let input = PdfInput::new(bytes, mime_type);
    Ok(match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => input.with_file_name(name),
        None => input,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn magic_bytes_win_over_extension() {
        assert_eq!(detect_mime_type(Path::new("scan.bin"), b"%PDF-1.4\n"), "application/pdf");
        assert_eq!(detect_mime_type(Path::new("notes.txt"), b"%PDF-1.7"), "application/pdf");
    }

    #[test]
    fn falls_back_to_extension() {
        assert_eq!(detect_mime_type(Path::new("a.PDF"), b""), "application/pdf");
        assert_eq!(detect_mime_type(Path::new("a.txt"), b"hello"), "text/plain");
        assert_eq!(detect_mime_type(Path::new("noext"), b"hello"), "application/octet-stream");
    }

    #[test]
    fn reads_file_with_name() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"plain words").unwrap();

        let input = read_input(file.path()).unwrap();

        assert_eq!(input.mime_type, "text/plain");
        assert_eq!(input.bytes, b"plain words");
        assert!(input.file_name.unwrap().ends_with(".txt"));
    }

    #[test]
    fn missing_file_has_context() {
        let err = read_input(Path::new("/nonexistent/pdfquiz.pdf")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
