//! pdfium-backed text layer and page rasteriser.
//!
//! pdfium is not async-safe, so every call here is blocking and is driven
//! from `spawn_blocking` by the extractor. A fresh `Pdfium` handle is bound
//! per operation.
//!
//! ## Library discovery
//!
//! 1. The explicit path given to [`PdfiumBackend::with_library_path`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. Alongside the running executable, then the working directory
//! 4. System library search paths

use crate::error::ExtractionError;
use crate::pipeline::extract::{PageRasterizer, TextLayer};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text layer and rasteriser backed by the pdfium shared library.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
    max_rendered_pixels: u32,
}

impl Default for PdfiumBackend {
    fn default() -> Self {
        Self {
            library_path: None,
            max_rendered_pixels: 2000,
        }
    }
}

impl PdfiumBackend {
    pub fn new(max_rendered_pixels: u32) -> Self {
        Self {
            library_path: None,
            max_rendered_pixels,
        }
    }

    /// Bind to a specific pdfium library file instead of searching.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        if let Some(ref path) = self.library_path {
            return bind_file(path);
        }

        if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
            if !path.is_empty() {
                return bind_file(Path::new(&path));
            }
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(exe_dir);
        }
        candidates.push(PathBuf::from("./"));

        for dir in &candidates {
            let dir_str = dir.to_string_lossy();
            let lib = Pdfium::pdfium_platform_library_name_at_path(&*dir_str);
            if let Ok(bindings) = Pdfium::bind_to_library(&lib) {
                debug!("Bound pdfium from {}", dir.display());
                return Ok(Pdfium::new(bindings));
            }
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| ExtractionError::PdfiumUnavailable(format!("{e:?}")))
    }
}

fn bind_file(path: &Path) -> Result<Pdfium, ExtractionError> {
    debug!("Binding pdfium from {}", path.display());
    Pdfium::bind_to_library(path.to_string_lossy().to_string())
        .map(Pdfium::new)
        .map_err(|e| {
            ExtractionError::PdfiumUnavailable(format!("{}: {e:?}", path.display()))
        })
}

fn open_error(path: &Path, e: PdfiumError) -> ExtractionError {
    ExtractionError::Open {
        path: path.to_path_buf(),
        detail: format!("{e:?}"),
    }
}

impl TextLayer for PdfiumBackend {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| open_error(path, e))?;

        let mut texts = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| ExtractionError::PageText {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
            texts.push(text.all());
        }

        debug!("{}: read text layer of {} pages", path.display(), texts.len());
        Ok(texts)
    }
}

impl PageRasterizer for PdfiumBackend {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, ExtractionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| open_error(path, e))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let pages = document.pages();
        info!("{}: rasterising {} pages for OCR", path.display(), pages.len());

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractionError::Rasterisation {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_library_is_reported() {
        let backend = PdfiumBackend::default().with_library_path("/definitely/not/libpdfium.so");
        let err = backend.page_texts(Path::new("any.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::PdfiumUnavailable(_)), "got: {err:?}");

        let err = backend.rasterize(Path::new("any.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::PdfiumUnavailable(_)));
    }

    #[test]
    fn builder_keeps_pixel_cap() {
        let backend = PdfiumBackend::new(1200);
        assert_eq!(backend.max_rendered_pixels, 1200);
        assert!(backend.library_path.is_none());
    }
}
