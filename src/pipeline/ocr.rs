//! Optical character recognition via the `tesseract` executable.
//!
//! Each page image is written to a temporary PNG and handed to
//! `tesseract <image> stdout -l <lang>`. The executable path is part of the
//! engine value, taken from `[Tesseract] path` in the settings file.

use crate::error::ExtractionError;
use crate::pipeline::extract::OcrEngine;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// OCR engine that shells out to a `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    tool: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(tool: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            language: language.into(),
        }
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.tool);
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);
        cmd
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, page: usize, image: &DynamicImage) -> Result<String, ExtractionError> {
        let tmp = tempfile::Builder::new()
            .prefix("examcat-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractionError::Ocr {
                page,
                detail: format!("temp file: {e}"),
            })?;

        image
            .save_with_format(tmp.path(), image::ImageFormat::Png)
            .map_err(|e| ExtractionError::Ocr {
                page,
                detail: format!("PNG encoding: {e}"),
            })?;

        let output = self
            .command(tmp.path())
            .output()
            .map_err(|e| ExtractionError::OcrToolUnavailable {
                tool: self.tool.display().to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Ocr {
                page,
                detail: format!(
                    "{} exited with {}: {}",
                    self.tool.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: OCR produced {} bytes", page, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_layout() {
        let engine = TesseractCli::new("/opt/tess/bin/tesseract", "eng+fra");
        let cmd = engine.command(Path::new("/tmp/p1.png"));
        assert_eq!(cmd.get_program(), "/opt/tess/bin/tesseract");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["/tmp/p1.png", "stdout", "-l", "eng+fra"]);
    }

    #[test]
    fn missing_tool_is_reported() {
        let engine = TesseractCli::new("/definitely/not/tesseract", "eng");
        let err = engine
            .recognize(1, &DynamicImage::new_rgb8(4, 4))
            .unwrap_err();
        assert!(
            matches!(err, ExtractionError::OcrToolUnavailable { .. }),
            "got: {err:?}"
        );
    }
}
