//! Gated listing workflow engine and document request tracker.
//!
//! A listing moves through strictly ordered workflow states. Each step is
//! guarded by gates evaluated against the listing checklist. The document
//! side issues request packets to external holders, follows their reply
//! threads and records every mutation in an append-only audit log.

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod runtime;
pub mod telemetry;
pub mod workflows;
