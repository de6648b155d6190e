//! PDF → image conversion. Only the first page is rendered; it becomes the
//! preview image stored next to the resume.

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::UploadFile;

pub mod pdfium;

pub use pdfium::PdfiumConverter;

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("PDFium unavailable: {0}")]
    Library(String),

    #[error("Failed to render PDF: {0}")]
    Render(String),

    #[error("PDF has no pages")]
    EmptyDocument,

    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("PDF render thread stopped")]
    Stopped,
}

#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert_to_image(&self, file: &UploadFile) -> Result<UploadFile, ConversionError>;
}

/// `resume.pdf` → `resume.png`. Names without a `.pdf` suffix get `.png` appended.
pub fn image_file_name(pdf_name: &str) -> String {
    let lower = pdf_name.to_ascii_lowercase();
    let stem = if lower.ends_with(".pdf") {
        &pdf_name[..pdf_name.len() - 4]
    } else {
        pdf_name
    };
    format!("{stem}.png")
}
