pub mod domains;
pub mod logs;
pub mod queue;

pub use domains::{DomainData, DomainRepo};
pub use logs::{CollectionLog, CollectionLogEntry};
pub use queue::{QueueEntry, QueueStats, QueueStore};
