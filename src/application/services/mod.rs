pub mod consumer_registry;
pub mod dispatcher;
pub mod mutation_queue;
pub mod read_through;
pub mod snapshot_cache;
pub mod sync_coordinator;

pub use consumer_registry::ConsumerRegistry;
pub use dispatcher::{MutationDispatcher, SubmitOutcome};
pub use mutation_queue::MutationQueue;
pub use read_through::{read_through, ReadResult, ReadSource};
pub use snapshot_cache::SnapshotCache;
pub use sync_coordinator::SyncCoordinator;
