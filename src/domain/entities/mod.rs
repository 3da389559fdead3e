pub mod dead_letter;
pub mod mutation_record;
pub mod snapshot_entry;
pub mod sync_outcome;

pub use dead_letter::DeadLetterRecord;
pub use mutation_record::MutationRecord;
pub use snapshot_entry::SnapshotEntry;
pub use sync_outcome::SyncOutcome;
