//! Audit trail for Spoolbook
//!
//! Every create, update and delete performed through the services is
//! appended to `audit.log` as one JSON object per line, with the entity's
//! state before and after the change.
//!
//! - `AuditEntry`: one logged operation
//! - `AuditLogger`: appends to and reads back the JSONL file
//! - `generate_diff`: short human-readable summary of what changed

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
