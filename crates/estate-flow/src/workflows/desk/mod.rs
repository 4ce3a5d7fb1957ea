//! Listing desk: the single-writer facade tying gates, checklist, request
//! packets, reply threads, publication and the audit trail together.

pub mod error;
pub mod ports;
pub mod publish;
pub mod record;
pub mod router;
pub mod service;
pub mod store;
pub mod view;

#[cfg(test)]
mod tests;

pub use error::{DeskError, DeskErrorKind};
pub use ports::{
    MailTransport, MailboxConnector, Outbox, PortalGateway, RecordingOutbox, TransportError,
};
pub use publish::{Platform, Publication, PublicationStatus, PublishCommand};
pub use record::ListingRecord;
pub use router::listing_router;
pub use service::{
    DeliveryOutcome, ListingDesk, NewChecklistItem, NewListing, NewPacket, PublishResult,
};
pub use store::{InMemoryListingStore, JsonFileListingStore, ListingStore, StoreError};
pub use view::{ListingView, PacketView, ReplyOutcome, ThreadView};
