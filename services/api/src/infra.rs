use estate_flow::audit::{
    AuditEntry, AuditError, AuditFilter, AuditLog, AuditRecord, InMemoryAuditLog,
    JsonLinesAuditLog,
};
use estate_flow::config::StorageConfig;
use estate_flow::runtime::ChannelOutbox;
use estate_flow::workflows::desk::{
    InMemoryListingStore, JsonFileListingStore, ListingDesk, ListingStore, MailTransport,
    MailboxConnector, PortalGateway, PublishCommand, StoreError, TransportError,
};
use estate_flow::workflows::documents::InboundMessage;
use estate_flow::workflows::listing::ListingId;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ServiceDesk = ListingDesk<ServiceAuditLog, ChannelOutbox>;

/// Audit storage picked from configuration.
#[derive(Debug)]
pub(crate) enum ServiceAuditLog {
    InMemory(InMemoryAuditLog),
    JsonLines(JsonLinesAuditLog),
}

impl ServiceAuditLog {
    pub(crate) fn from_config(storage: &StorageConfig) -> Result<Self, AuditError> {
        match &storage.audit_log_path {
            Some(path) => Ok(Self::JsonLines(JsonLinesAuditLog::open(path)?)),
            None => Ok(Self::InMemory(InMemoryAuditLog::new())),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::InMemory(_) => "in-memory".to_string(),
            Self::JsonLines(log) => log.path().display().to_string(),
        }
    }
}

/// Listing snapshot store picked from configuration, with a description for
/// the startup log.
pub(crate) fn listing_store(
    storage: &StorageConfig,
) -> Result<(Arc<dyn ListingStore>, String), StoreError> {
    match &storage.listing_store_dir {
        Some(dir) => {
            let store = JsonFileListingStore::open(dir)?;
            let described = store.dir().display().to_string();
            Ok((Arc::new(store), described))
        }
        None => Ok((Arc::new(InMemoryListingStore::new()), "in-memory".to_string())),
    }
}

impl AuditLog for ServiceAuditLog {
    fn append(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        match self {
            Self::InMemory(log) => log.append(record),
            Self::JsonLines(log) => log.append(record),
        }
    }

    fn query(
        &self,
        listing_id: Option<&ListingId>,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        match self {
            Self::InMemory(log) => log.query(listing_id, filter),
            Self::JsonLines(log) => log.query(listing_id, filter),
        }
    }
}

/// Stand-in transport that logs each mail and hands out local message IDs.
#[derive(Default)]
pub(crate) struct LoggingMailTransport {
    sent: AtomicU64,
}

impl MailTransport for LoggingMailTransport {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, TransportError> {
        if to.trim().is_empty() {
            return Err(TransportError::Rejected("recipient missing".to_string()));
        }
        let sequence = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let external_id = format!("local-{sequence:06}");
        info!(%to, %subject, bytes = body.len(), %external_id, "mail handed to transport");
        Ok(external_id)
    }
}

/// Stand-in portal connector that accepts every listing.
#[derive(Default)]
pub(crate) struct LoggingPortalGateway;

impl PortalGateway for LoggingPortalGateway {
    fn publish(&self, command: &PublishCommand) -> Result<Option<String>, TransportError> {
        let reference = format!("{}-{}", command.platform.as_str(), command.listing_id);
        info!(listing = %command.listing_id, platform = %command.platform, %reference, "listing pushed to portal");
        Ok(Some(reference))
    }
}

/// Mailbox fed over HTTP and drained by the poller.
#[derive(Default)]
pub(crate) struct QueuedMailbox {
    pending: Mutex<Vec<InboundMessage>>,
}

impl QueuedMailbox {
    pub(crate) fn push(&self, messages: Vec<InboundMessage>) -> usize {
        let mut pending = self.pending.lock().expect("mailbox mutex poisoned");
        pending.extend(messages);
        pending.len()
    }
}

impl MailboxConnector for QueuedMailbox {
    fn poll(&self) -> Result<Vec<InboundMessage>, TransportError> {
        let mut pending = self.pending.lock().expect("mailbox mutex poisoned");
        Ok(std::mem::take(&mut *pending))
    }
}
