//! `lopdf` for the text layer, Poppler's `pdftoppm` for rendering.

use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use lopdf::Document;
use pdfquiz_core::config::OcrConfig;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{PdfDocument, PdfError, PdfLoader};

/// Resolution at scale 1.0.
const BASE_DPI: f32 = 72.0;

pub struct LopdfLoader {
    pdftoppm: PathBuf,
    timeout: Duration,
}

impl Default for LopdfLoader {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from("pdftoppm"),
            timeout: Duration::from_secs(120),
        }
    }
}

impl LopdfLoader {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            pdftoppm: PathBuf::from(&config.pdftoppm_path),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl PdfLoader for LopdfLoader {
    async fn load(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError> {
        let bytes: Arc<[u8]> = Arc::from(bytes);
        let parse_input = bytes.clone();
        let doc = tokio::task::spawn_blocking(move || Document::load_mem(&parse_input))
            .await
            .map_err(|e| PdfError::Parse(format!("parser task failed: {e}")))?
            .map_err(|e| PdfError::Parse(e.to_string()))?;

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        debug!(pages = pages.len(), bytes = bytes.len(), "PDF parsed");

        Ok(Box::new(LopdfDocument {
            doc: Arc::new(doc),
            pages,
            bytes,
            pdftoppm: self.pdftoppm.clone(),
            timeout: self.timeout,
            source: OnceCell::new(),
        }))
    }
}

struct LopdfDocument {
    doc: Arc<Document>,
    /// Page numbers as lopdf reports them, in order.
    pages: Vec<u32>,
    bytes: Arc<[u8]>,
    pdftoppm: PathBuf,
    timeout: Duration,
    /// On-disk copy for the renderer, written on first render.
    source: OnceCell<NamedTempFile>,
}

impl LopdfDocument {
    fn check_page(&self, page: u32) -> Result<u32, PdfError> {
        let count = self.page_count();
        if page == 0 || page > count {
            return Err(PdfError::PageOutOfRange { page, count });
        }
        Ok(self.pages[(page - 1) as usize])
    }

    async fn source_file(&self) -> Result<&NamedTempFile, PdfError> {
        self.source
            .get_or_try_init(|| async {
                let mut file = tempfile::Builder::new()
                    .prefix("pdfquiz-")
                    .suffix(".pdf")
                    .tempfile()?;
                file.write_all(&self.bytes)?;
                file.flush()?;
                Ok::<_, PdfError>(file)
            })
            .await
    }
}

#[async_trait]
impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn page_text(&self, page: u32) -> Result<String, PdfError> {
        let number = self.check_page(page)?;
        let doc = self.doc.clone();
        tokio::task::spawn_blocking(move || doc.extract_text(&[number]))
            .await
            .map_err(|e| PdfError::Text {
                page,
                message: format!("text task failed: {e}"),
            })?
            .map_err(|e| PdfError::Text {
                page,
                message: e.to_string(),
            })
    }

    async fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage, PdfError> {
        self.check_page(page)?;
        let source = self.source_file().await?;
        let out_dir = tempfile::tempdir()?;
        let prefix = out_dir.path().join("page");
        let dpi = (BASE_DPI * scale).round().max(1.0) as u32;

        let mut cmd = Command::new(&self.pdftoppm);
        cmd.arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(source.path())
            .arg(&prefix)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => return Err(PdfError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PdfError::Render {
                    page,
                    message: format!("renderer '{}' not found", self.pdftoppm.display()),
                });
            }
            Ok(result) => result?,
        };
        if !output.status.success() {
            return Err(PdfError::Render {
                page,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let png = tokio::fs::read(prefix.with_extension("png")).await?;
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)?.to_rgba8();
        debug!(page, dpi, width = image.width(), height = image.height(), "Page rendered");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Minimal PDF with one Helvetica text line per page.
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn reads_page_count_and_text() {
        let bytes = pdf_with_pages(&["First page text", "Second page text"]);
        let doc = LopdfLoader::default().load(&bytes).await.unwrap();

        assert_eq!(doc.page_count(), 2);
        assert!(doc.page_text(1).await.unwrap().contains("First page text"));
        assert!(doc.page_text(2).await.unwrap().contains("Second page text"));
    }

    #[tokio::test]
    async fn rejects_out_of_range_pages() {
        let bytes = pdf_with_pages(&["Only page"]);
        let doc = LopdfLoader::default().load(&bytes).await.unwrap();

        assert!(matches!(
            doc.page_text(0).await,
            Err(PdfError::PageOutOfRange { page: 0, count: 1 })
        ));
        assert!(matches!(
            doc.page_text(2).await,
            Err(PdfError::PageOutOfRange { page: 2, count: 1 })
        ));
    }

    #[tokio::test]
    async fn garbage_fails_to_parse() {
        let result = LopdfLoader::default().load(b"definitely not a pdf").await;
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_renderer_is_a_render_error() {
        let bytes = pdf_with_pages(&["Only page"]);
        let loader = LopdfLoader {
            pdftoppm: PathBuf::from("/nonexistent/pdfquiz-pdftoppm"),
            timeout: Duration::from_secs(5),
        };
        let doc = loader.load(&bytes).await.unwrap();

        match doc.render_page(1, 2.0).await {
            Err(PdfError::Render { page, message }) => {
                assert_eq!(page, 1);
                assert!(message.contains("not found"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("render should fail without pdftoppm"),
        }
    }
}
