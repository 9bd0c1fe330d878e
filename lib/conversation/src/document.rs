//! Metadata for uploaded documents.
//!
//! Only name and size are recorded. Text extraction and chunking happen
//! nowhere yet.

use crate::error::DocumentError;
use chrono::{DateTime, Utc};
use jupiter_core::DocumentId;
use serde::{Deserialize, Serialize};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// An uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Unique document identifier.
    pub id: DocumentId,
    /// File name as uploaded, used in citations.
    pub name: String,
    /// Size of the upload in bytes.
    pub size_bytes: u64,
    /// When the upload was accepted.
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentInfo {
    /// Validates an upload and records its metadata.
    ///
    /// The name must end in `.pdf`, the content must start with the PDF
    /// header and must not exceed `limit_bytes`.
    pub fn from_pdf_upload(
        name: impl Into<String>,
        content: &[u8],
        limit_bytes: u64,
    ) -> jupiter_core::Result<Self, DocumentError> {
        let name = name.into();
        let size_bytes = content.len() as u64;

        if content.is_empty() {
            return Err(DocumentError::Empty { name }.into());
        }
        if size_bytes > limit_bytes {
            return Err(DocumentError::TooLarge {
                name,
                size_bytes,
                limit_bytes,
            }
            .into());
        }
        if !name.to_ascii_lowercase().ends_with(".pdf") || !content.starts_with(PDF_MAGIC) {
            return Err(DocumentError::NotPdf { name }.into());
        }

        Ok(Self {
            id: DocumentId::new(),
            name,
            size_bytes,
            uploaded_at: Utc::now(),
        })
    }

    /// Size with thousands separators, e.g. `1,048,576 bytes`.
    #[must_use]
    pub fn display_size(&self) -> String {
        let digits = self.size_bytes.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("{grouped} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u64 = 1024;

    #[test]
    fn accepts_pdf() {
        let doc = DocumentInfo::from_pdf_upload("Report.PDF", b"%PDF-1.7 body", LIMIT)
            .expect("valid pdf");
        assert_eq!(doc.name, "Report.PDF");
        assert_eq!(doc.size_bytes, 13);
    }

    #[test]
    fn rejects_wrong_extension() {
        let err = DocumentInfo::from_pdf_upload("notes.txt", b"%PDF-1.7", LIMIT).unwrap_err();
        assert!(err.to_string().contains("notes.txt is not a PDF document"));
    }

    #[test]
    fn rejects_missing_header() {
        let err = DocumentInfo::from_pdf_upload("fake.pdf", b"hello", LIMIT).unwrap_err();
        assert!(err.to_string().contains("not a PDF"));
    }

    #[test]
    fn rejects_empty_and_oversized() {
        let err = DocumentInfo::from_pdf_upload("a.pdf", b"", LIMIT).unwrap_err();
        assert!(err.to_string().contains("a.pdf is empty"));

        let big = [b'%'; 2048];
        let err = DocumentInfo::from_pdf_upload("b.pdf", &big, LIMIT).unwrap_err();
        assert!(err.to_string().contains("1024 byte limit"));
    }

    #[test]
    fn display_size_groups_thousands() {
        let mut doc =
            DocumentInfo::from_pdf_upload("a.pdf", b"%PDF-", LIMIT).expect("valid pdf");
        assert_eq!(doc.display_size(), "5 bytes");
        doc.size_bytes = 1_048_576;
        assert_eq!(doc.display_size(), "1,048,576 bytes");
        doc.size_bytes = 100_000;
        assert_eq!(doc.display_size(), "100,000 bytes");
    }
}
