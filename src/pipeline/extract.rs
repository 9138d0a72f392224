//! Document text extraction with an OCR fallback.
//!
//! ## Contract
//!
//! [`DocumentTextExtractor::extract`] always returns text, never an error:
//!
//! 1. Read the embedded text layer page by page; keep pages whose trimmed
//!    text is non-empty, each followed by a blank line.
//! 2. If that text, trimmed, is longer than [`TEXT_LAYER_THRESHOLD`]
//!    characters, return it unchanged.
//! 3. Otherwise the document is treated as a scan: rasterise every page,
//!    recognise it, and emit `--- Page N ---` before each page's text.
//!
//! A text-layer error counts as empty text and falls through to step 3.
//! OCR failures are soft too: a rasterisation failure yields `""` for the
//! document, a recognition failure yields an empty section for that page
//! (its header is kept so numbering stays aligned with the PDF).

use crate::error::ExtractionError;
use crate::output::{Extraction, ExtractionMethod};
use image::DynamicImage;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trimmed text-layer length (in characters) above which OCR is skipped.
/// 101 characters skip OCR, 100 do not.
pub const TEXT_LAYER_THRESHOLD: usize = 100;

/// Reads the embedded text of every page, in page order.
pub trait TextLayer: Send + Sync {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;
}

/// Renders every page to an image, in page order.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, ExtractionError>;
}

/// Recognises the text of one page image. `page` is 1-indexed.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, page: usize, image: &DynamicImage) -> Result<String, ExtractionError>;
}

/// Best-effort plain-text extractor for PDFs.
///
/// Cheap to clone; the backends are shared.
#[derive(Clone)]
pub struct DocumentTextExtractor {
    text_layer: Arc<dyn TextLayer>,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
}

impl DocumentTextExtractor {
    pub fn new(
        text_layer: Arc<dyn TextLayer>,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            ocr,
        }
    }

    /// Extract the best available text from `path`. Never fails.
    pub async fn extract(&self, path: &Path) -> String {
        self.extract_detailed(path).await.text
    }

    /// Like [`extract`](Self::extract) but also reports which path produced
    /// the text.
    ///
    /// pdfium and the OCR subprocess are blocking, so the work runs on the
    /// blocking thread pool.
    pub async fn extract_detailed(&self, path: &Path) -> Extraction {
        let this = self.clone();
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || this.extract_blocking(&owned)).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Extraction task for {} panicked: {}", path.display(), e);
                Extraction::failed()
            }
        }
    }

    /// Synchronous implementation of the fallback rule.
    pub fn extract_blocking(&self, path: &Path) -> Extraction {
        let direct = match self.text_layer.page_texts(path) {
            Ok(pages) => join_text_pages(&pages),
            Err(e) => {
                warn!("Error extracting text from {}: {}", path.display(), e);
                String::new()
            }
        };

        let direct_len = direct.trim().chars().count();
        if direct_len > TEXT_LAYER_THRESHOLD {
            debug!("{}: {} chars from text layer", path.display(), direct_len);
            return Extraction {
                text: direct,
                method: ExtractionMethod::TextLayer,
            };
        }

        debug!(
            "{}: text layer has {} chars (≤ {}), falling back to OCR",
            path.display(),
            direct_len,
            TEXT_LAYER_THRESHOLD
        );
        self.ocr_document(path)
    }

    fn ocr_document(&self, path: &Path) -> Extraction {
        let images = match self.rasterizer.rasterize(path) {
            Ok(images) => images,
            Err(e) => {
                warn!("OCR skipped for {}: {}", path.display(), e);
                return Extraction::failed();
            }
        };

        let mut text = String::new();
        for (idx, image) in images.iter().enumerate() {
            let page = idx + 1;
            let page_text = self.ocr.recognize(page, image).unwrap_or_else(|e| {
                warn!("{}: {}", path.display(), e);
                String::new()
            });
            let _ = write!(text, "--- Page {page} ---\n{page_text}\n\n");
        }

        debug!("{}: OCR produced {} bytes over {} pages", path.display(), text.len(), images.len());
        Extraction {
            text,
            method: ExtractionMethod::Ocr {
                pages: images.len(),
            },
        }
    }
}

/// Concatenate pages with non-blank text, each followed by `"\n\n"`.
pub fn join_text_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for page in pages.iter().filter(|p| !p.trim().is_empty()) {
        text.push_str(page);
        text.push_str("\n\n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTextLayer(Result<Vec<String>, ExtractionError>);

    impl TextLayer for FixedTextLayer {
        fn page_texts(&self, _path: &Path) -> Result<Vec<String>, ExtractionError> {
            self.0.clone()
        }
    }

    struct CountingRasterizer {
        pages: usize,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRasterizer {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    impl PageRasterizer for CountingRasterizer {
        fn rasterize(&self, _path: &Path) -> Result<Vec<DynamicImage>, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExtractionError::Rasterisation {
                    page: 1,
                    detail: "boom".into(),
                });
            }
            Ok((0..self.pages).map(|_| DynamicImage::new_rgb8(1, 1)).collect())
        }
    }

    /// Returns "text of page N"; fails on the pages listed in `fail_on`.
    struct EchoOcr {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    impl EchoOcr {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: vec![],
            }
        }
    }

    impl OcrEngine for EchoOcr {
        fn recognize(&self, page: usize, _image: &DynamicImage) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&page) {
                return Err(ExtractionError::Ocr {
                    page,
                    detail: "unreadable".into(),
                });
            }
            Ok(format!("text of page {page}"))
        }
    }

    fn extractor(
        layer: FixedTextLayer,
        raster: Arc<CountingRasterizer>,
        ocr: Arc<EchoOcr>,
    ) -> DocumentTextExtractor {
        DocumentTextExtractor::new(Arc::new(layer), raster, ocr)
    }

    fn chars(n: usize) -> String {
        "q".repeat(n)
    }

    #[test]
    fn long_text_layer_skips_ocr() {
        let raster = Arc::new(CountingRasterizer::new(2));
        let ocr = Arc::new(EchoOcr::new());
        let pages = vec![chars(80), "   ".into(), chars(80)];
        let ex = extractor(FixedTextLayer(Ok(pages)), raster.clone(), ocr.clone());

        let result = ex.extract_blocking(Path::new("paper.pdf"));

        assert_eq!(result.method, ExtractionMethod::TextLayer);
        assert_eq!(result.text, format!("{}\n\n{}\n\n", chars(80), chars(80)));
        assert_eq!(raster.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn threshold_boundary() {
        // 101 non-whitespace characters: text layer wins.
        let raster = Arc::new(CountingRasterizer::new(1));
        let ex = extractor(
            FixedTextLayer(Ok(vec![format!("  {}  ", chars(101))])),
            raster.clone(),
            Arc::new(EchoOcr::new()),
        );
        assert_eq!(
            ex.extract_blocking(Path::new("a.pdf")).method,
            ExtractionMethod::TextLayer
        );
        assert_eq!(raster.calls.load(Ordering::SeqCst), 0);

        // 100 and 99 characters: OCR.
        for n in [100, 99] {
            let raster = Arc::new(CountingRasterizer::new(1));
            let ex = extractor(
                FixedTextLayer(Ok(vec![chars(n)])),
                raster.clone(),
                Arc::new(EchoOcr::new()),
            );
            let result = ex.extract_blocking(Path::new("a.pdf"));
            assert_eq!(result.method, ExtractionMethod::Ocr { pages: 1 }, "n = {n}");
            assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        // 60 two-byte characters = 120 bytes but only 60 chars.
        let ex = extractor(
            FixedTextLayer(Ok(vec!["é".repeat(60)])),
            Arc::new(CountingRasterizer::new(1)),
            Arc::new(EchoOcr::new()),
        );
        assert_eq!(
            ex.extract_blocking(Path::new("a.pdf")).method,
            ExtractionMethod::Ocr { pages: 1 }
        );
    }

    #[test]
    fn ocr_output_has_page_headers_in_order() {
        let ex = extractor(
            FixedTextLayer(Ok(vec![])),
            Arc::new(CountingRasterizer::new(3)),
            Arc::new(EchoOcr::new()),
        );
        let result = ex.extract_blocking(Path::new("scan.pdf"));
        assert_eq!(
            result.text,
            "--- Page 1 ---\ntext of page 1\n\n\
             --- Page 2 ---\ntext of page 2\n\n\
             --- Page 3 ---\ntext of page 3\n\n"
        );
        assert_eq!(result.method, ExtractionMethod::Ocr { pages: 3 });
    }

    #[test]
    fn text_layer_error_falls_back_to_ocr() {
        let raster = Arc::new(CountingRasterizer::new(2));
        let ex = extractor(
            FixedTextLayer(Err(ExtractionError::Open {
                path: "bad.pdf".into(),
                detail: "xref broken".into(),
            })),
            raster.clone(),
            Arc::new(EchoOcr::new()),
        );
        let result = ex.extract_blocking(Path::new("bad.pdf"));
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
        assert!(result.text.starts_with("--- Page 1 ---\n"));
        assert_eq!(result.text.matches("--- Page ").count(), 2);
    }

    #[test]
    fn rasterisation_failure_yields_empty_text() {
        let raster = Arc::new(CountingRasterizer {
            pages: 2,
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let ocr = Arc::new(EchoOcr::new());
        let ex = extractor(FixedTextLayer(Ok(vec!["short".into()])), raster, ocr.clone());
        let result = ex.extract_blocking(Path::new("x.pdf"));
        assert_eq!(result, Extraction::failed());
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn page_ocr_failure_keeps_header() {
        let ocr = Arc::new(EchoOcr {
            calls: AtomicUsize::new(0),
            fail_on: vec![2],
        });
        let ex = extractor(
            FixedTextLayer(Ok(vec![])),
            Arc::new(CountingRasterizer::new(3)),
            ocr,
        );
        let text = ex.extract_blocking(Path::new("x.pdf")).text;
        assert!(text.contains("--- Page 2 ---\n\n\n--- Page 3 ---"), "got: {text:?}");
        assert!(text.contains("text of page 3"));
    }

    #[tokio::test]
    async fn async_extract_returns_plain_text() {
        let ex = extractor(
            FixedTextLayer(Ok(vec![chars(150)])),
            Arc::new(CountingRasterizer::new(1)),
            Arc::new(EchoOcr::new()),
        );
        let text = ex.extract(Path::new("a.pdf")).await;
        assert_eq!(text, format!("{}\n\n", chars(150)));
    }

    #[test]
    fn join_skips_blank_pages() {
        let pages = vec!["a".to_string(), "\n \t".to_string(), "b".to_string()];
        assert_eq!(join_text_pages(&pages), "a\n\nb\n\n");
        assert_eq!(join_text_pages(&[]), "");
    }
}
