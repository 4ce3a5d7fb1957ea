//! Document collection: request packets, reply threads, exception detection,
//! attachment classification, QA and follow-up scheduling.

pub mod cadence;
pub mod classify;
pub mod detector;
pub mod domain;
pub mod followup;
pub mod qa;
pub mod requests;
pub mod threads;

pub use cadence::{add_business_days, FollowUpCadence, ParseCadenceError};
pub use classify::{declared_type, normalize, AttachmentClassifier};
pub use detector::ExceptionDetector;
pub use domain::{
    email_domain, Attachment, AttachmentId, DeliveryStatus, Direction, ExceptionId,
    ExceptionKind, ExceptionRecord, Holder, InboundAttachment, InboundMessage, Message,
    MessageId, OutboundMail, PacketId, PacketStatus, Resolution, Thread, ThreadId, ThreadStatus,
};
pub use followup::{DispatchMode, FollowUpDraft, FollowUpScheduler};
pub use qa::{DocumentInspector, MetadataInspector, QaOutcome, QaResult, QaVerdict};
pub use requests::{RequestError, RequestPacket, RequestTracker};
pub use threads::{ThreadError, ThreadStore};
