//! OCR backend that shells out to the `tesseract` command-line tool.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use pdfquiz_core::config::OcrConfig;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::traits::{OcrBackend, OcrError, OcrWorker, Recognition};

pub struct TesseractBackend {
    binary: PathBuf,
    language: String,
    timeout: Duration,
}

impl TesseractBackend {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.tesseract_path, &config.language)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn start(&self) -> Result<Box<dyn OcrWorker>, OcrError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--list-langs");
        let output = run(cmd, self.timeout).await.map_err(|e| match e {
            OcrError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => OcrError::Unavailable(
                format!("tesseract binary '{}' not found", self.binary.display()),
            ),
            other => other,
        })?;
        if !output.status.success() {
            return Err(OcrError::Startup(stderr_of(&output)));
        }

        // Older releases print the list on stderr.
        let listing = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let installed = parse_language_list(&listing);
        if let Some(missing) = self
            .language
            .split('+')
            .find(|lang| !installed.iter().any(|l| l == lang))
        {
            return Err(OcrError::Unavailable(format!(
                "tesseract language '{missing}' is not installed"
            )));
        }

        let scratch = tempfile::Builder::new().prefix("pdfquiz-ocr-").tempdir()?;
        debug!(
            language = %self.language,
            scratch = %scratch.path().display(),
            "Tesseract session started"
        );

        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            language: self.language.clone(),
            timeout: self.timeout,
            scratch: Some(scratch),
            images: 0,
        }))
    }
}

struct TesseractWorker {
    binary: PathBuf,
    language: String,
    timeout: Duration,
    scratch: Option<TempDir>,
    images: u32,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &RgbaImage) -> Result<Recognition, OcrError> {
        let dir = self.scratch.as_ref().ok_or(OcrError::Terminated)?.path();
        self.images += 1;
        let path = dir.join(format!("page-{:04}.png", self.images));
        image.save_with_format(&path, ImageFormat::Png)?;

        let result = self.run_tsv(&path).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), error = %e, "Failed to remove OCR scratch image");
        }
        let output = result?;
        if !output.status.success() {
            return Err(OcrError::Recognition(stderr_of(&output)));
        }
        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn terminate(mut self: Box<Self>) -> Result<(), OcrError> {
        if let Some(scratch) = self.scratch.take() {
            scratch.close()?;
        }
        Ok(())
    }
}

impl TesseractWorker {
    async fn run_tsv(&self, image: &Path) -> Result<Output, OcrError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv");
        run(cmd, self.timeout).await
    }
}

async fn run(mut cmd: Command, timeout: Duration) -> Result<Output, OcrError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(OcrError::Timeout(timeout.as_secs())),
    }
}

fn stderr_of(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("tesseract exited with {}", output.status)
    } else {
        stderr
    }
}

/// Language codes from `tesseract --list-langs` output.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip_while(|line| !line.starts_with("List of available languages"))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rebuild text from Tesseract TSV output.
///
/// Words on the same (block, paragraph, line) are joined by spaces, lines by
/// newlines, paragraphs by a blank line. Confidence is the mean over words
/// with `conf >= 0`, or 0 when no word was recognized.
fn parse_tsv(tsv: &str) -> Recognition {
    let mut text = String::new();
    let mut current: Option<(u32, u32, u32)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0u32;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let key = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let line = (key(2), key(3), key(4));

        match current {
            None => {}
            Some(prev) if (prev.0, prev.1) != (line.0, line.1) => text.push_str("\n\n"),
            Some(prev) if prev.2 != line.2 => text.push('\n'),
            Some(_) => text.push(' '),
        }
        text.push_str(word);
        current = Some(line);

        if let Ok(conf) = cols[10].parse::<f32>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let confidence = if conf_count == 0 {
        0.0
    } else {
        conf_sum / conf_count as f32
    };
    Recognition { text, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, par: u32, line: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t{block}\t{par}\t{line}\t1\t0\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn rebuilds_lines_and_paragraphs() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, 1, "90", "Chapter"),
            word(1, 1, 1, "80", "1"),
            word(1, 1, 2, "70", "Intro"),
            word(1, 2, 1, "60", "Body"),
            word(2, 1, 1, "50", "text."),
        ]
        .join("\n");

        let rec = parse_tsv(&tsv);
        assert_eq!(rec.text, "Chapter 1\nIntro\n\nBody\n\ntext.");
        assert!((rec.confidence - 70.0).abs() < 1e-4);
    }

    #[test]
    fn ignores_negative_confidence_and_blank_words() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, 1, "-1", "noise"),
            word(1, 1, 1, "88.5", " "),
            word(1, 1, 1, "95.5", "word"),
        ]
        .join("\n");

        let rec = parse_tsv(&tsv);
        assert_eq!(rec.text, "noise word");
        assert!((rec.confidence - 95.5).abs() < 1e-4);
    }

    #[test]
    fn empty_output_has_zero_confidence() {
        let rec = parse_tsv(HEADER);
        assert_eq!(rec.text, "");
        assert_eq!(rec.confidence, 0.0);
    }

    #[test]
    fn parses_language_listing() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\ndeu\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "osd", "deu"]);
        assert!(parse_language_list("Error opening data file").is_empty());
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let backend = TesseractBackend::new("/nonexistent/pdfquiz-tesseract", "eng");
        match backend.start().await {
            Err(OcrError::Unavailable(msg)) => assert!(msg.contains("not found")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("start should fail without a binary"),
        }
    }
}
