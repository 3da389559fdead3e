pub mod clock;
pub mod key_value_store;
pub mod mutation_consumer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key_value_store::KeyValueStore;
pub use mutation_consumer::{FnConsumer, MutationConsumer};
