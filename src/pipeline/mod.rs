//! Pipeline stages used by the categorisation workflows.
//!
//! Each submodule implements exactly one concern so it can be tested and
//! swapped independently of the others.
//!
//! ## Data Flow
//!
//! ```text
//!  PDF ──▶ extract ──┐
//!          (pdfium, │
//!          tesseract)│
//!                    ├──▶ llm / http ──▶ store / output
//!  store ────────────┘    (generation)   (refined prompt, result)
//!  (prompt templates)
//! ```
//!
//! 1. [`extract`]: direct text-layer extraction with an OCR fallback;
//!    never fails, degrades to empty text
//! 2. [`pdfium`]: pdfium-backed text layer and page rasteriser
//! 3. [`ocr`]: `tesseract` subprocess recogniser
//! 4. [`store`]: prompt templates in, refined prompts out
//! 5. [`llm`]: the [`llm::Generator`] seam and its edgequake-llm
//!    implementation
//! 6. [`http`]: the bearer-token HTTP generation endpoint

pub mod extract;
pub mod http;
pub mod llm;
pub mod ocr;
pub mod pdfium;
pub mod store;
