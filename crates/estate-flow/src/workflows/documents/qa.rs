use serde::Serialize;

use super::domain::{Attachment, AttachmentId, ExceptionId, ExceptionKind, MessageId};

/// Verdict of a document inspector on one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QaVerdict {
    Verified,
    WrongDocument,
    MissingPages,
}

impl QaVerdict {
    /// Exception to raise for a failed verdict.
    pub fn exception(self, attachment: &Attachment, item: &str) -> Option<ExceptionKind> {
        let filename = attachment.filename.clone();
        let expected = item.to_string();
        match self {
            QaVerdict::Verified => None,
            QaVerdict::WrongDocument => Some(ExceptionKind::WrongDocument { filename, expected }),
            QaVerdict::MissingPages => Some(ExceptionKind::MissingPages { filename, expected }),
        }
    }
}

/// Seam for document quality checks (OCR, page counting, manual review).
pub trait DocumentInspector: Send + Sync {
    fn inspect(&self, attachment: &Attachment, item: &str) -> QaVerdict;
}

/// Inspector working from content type and size alone.
#[derive(Debug, Clone)]
pub struct MetadataInspector {
    pub min_document_bytes: u64,
}

impl Default for MetadataInspector {
    fn default() -> Self {
        Self {
            min_document_bytes: 10 * 1024,
        }
    }
}

impl DocumentInspector for MetadataInspector {
    fn inspect(&self, attachment: &Attachment, _item: &str) -> QaVerdict {
        let declared = attachment.declared_type.as_str();
        let usable = declared == mime::APPLICATION_PDF.essence_str()
            || declared.starts_with(mime::IMAGE.as_str());
        if !usable {
            QaVerdict::WrongDocument
        } else if attachment.size < self.min_document_bytes {
            QaVerdict::MissingPages
        } else {
            QaVerdict::Verified
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QaOutcome {
    Verified,
    /// Item was already verified; QA never regresses it.
    AlreadyVerified,
    /// Item was not in `received` (for example rejected by an earlier check).
    Skipped,
    /// Failed copy of an item another attachment of the same message verified.
    Superseded { by: AttachmentId },
    Rejected {
        verdict: QaVerdict,
        exception: ExceptionId,
    },
}

/// QA result for one ingested attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaResult {
    pub message_id: MessageId,
    pub attachment_id: AttachmentId,
    pub filename: String,
    pub item: String,
    #[serde(flatten)]
    pub outcome: QaOutcome,
}
