//! Supported document kinds and their content types.

use serde::{Deserialize, Serialize};
use std::fmt;

use sophub_core::AppError;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A document format accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Word Office Open XML document.
    Docx,
}

impl DocumentKind {
    /// Resolve a kind from an extension, with or without a leading dot.
    pub fn from_extension(ext: &str) -> Result<Self, AppError> {
        match normalize_extension(ext).as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(AppError::validation(format!(
                "Unsupported document extension '{other}'. Expected one of: pdf, docx"
            ))),
        }
    }

    /// Canonical extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// The content type declared when signing a write for this kind.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => PDF_MIME,
            Self::Docx => DOCX_MIME,
        }
    }

    /// Whether a reported content type is consistent with this kind.
    ///
    /// Parameters such as `; charset=...` are ignored.
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        essence == self.mime_type()
    }

    /// Guess the kind from the leading bytes of an object.
    ///
    /// PDF files start with `%PDF-`. DOCX files are ZIP archives, so only the
    /// ZIP local-file header is checked.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if data.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Lowercase an extension and strip surrounding whitespace and a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
