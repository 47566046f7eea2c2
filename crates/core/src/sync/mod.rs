//! Upstream synchronization.
//!
//! - Source records and the feed seam
//! - Static type → account mappings
//! - The per-module coordinator and the scheduler running them
//! - The append-only sync log

pub mod coordinator;
pub mod feed;
pub mod log;
pub mod mapping;
pub mod scheduler;
pub mod types;


pub use coordinator::SyncCoordinator;
pub use feed::{FeedError, SourceFeed, StaticFeed};
pub use log::{DEFAULT_LOG_LIMIT, SYNC_OPERATION, SyncLog, SyncLogEntry, SyncLogFilter};
pub use mapping::{FeeRule, MappingRule, MappingTable, normalize_type};
pub use scheduler::SyncScheduler;
pub use types::{FeedFilter, RecordFailure, SourceRecord, SyncReport, SyncStatus};
