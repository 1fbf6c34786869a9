//! Best-effort PDF title extraction.

use std::sync::{Mutex, OnceLock, PoisonError};

use pdfium_render::prelude::*;
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Why a title could not be read. Never leaves this module's callers:
/// every failure falls back to the filename-derived title.
#[derive(Error, Debug)]
pub enum PdfTitleError {
    #[error("content is not a PDF document")]
    NotPdf,
    #[error("Pdfium library not available")]
    PdfiumNotAvailable,
    #[error("Failed to load PDF: {0}")]
    Load(String),
    #[error("title not found")]
    TitleNotFound,
}

/// Process-wide pdfium binding. Binding loads the shared library and
/// initializes it, so it happens once; a failed bind is cached as `None` and
/// every later extraction falls back without retrying. Extractions run one at
/// a time behind the mutex.
static PDFIUM: OnceLock<Option<Mutex<Pdfium>>> = OnceLock::new();

fn pdfium() -> Option<&'static Mutex<Pdfium>> {
    PDFIUM
        .get_or_init(|| match Pdfium::bind_to_system_library() {
            Ok(bindings) => Some(Mutex::new(Pdfium::new(bindings))),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Pdfium unavailable; PDF titles fall back to filenames"
                );
                None
            }
        })
        .as_ref()
}

/// Whether `path` names a PDF, judged by its lowercased extension.
pub fn is_pdf(path: &str) -> bool {
    path.to_lowercase().ends_with(".pdf")
}

/// `Title` metadata of the document, or `None` when it cannot be read.
pub fn extract_pdf_title(pdf_bytes: &[u8]) -> Option<String> {
    match try_extract_pdf_title(pdf_bytes) {
        Ok(title) => Some(title),
        Err(error) => {
            tracing::debug!(error = %error, "PDF title extraction failed");
            None
        }
    }
}

fn try_extract_pdf_title(pdf_bytes: &[u8]) -> Result<String, PdfTitleError> {
    if !pdf_bytes.starts_with(PDF_MAGIC) {
        return Err(PdfTitleError::NotPdf);
    }

    let library = pdfium()
        .ok_or(PdfTitleError::PdfiumNotAvailable)?
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let document = library
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|error| PdfTitleError::Load(error.to_string()))?;

    let raw = document
        .metadata()
        .get(PdfDocumentMetadataTagType::Title)
        .map(|tag| tag.value().to_string());
    clean_title(raw.as_deref()).ok_or(PdfTitleError::TitleNotFound)
}

fn clean_title(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
