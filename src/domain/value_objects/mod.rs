pub mod cache_key;
pub mod mutation_id;
pub mod mutation_kind;
pub mod mutation_payload;

pub use cache_key::CacheKey;
pub use mutation_id::MutationId;
pub use mutation_kind::MutationKind;
pub use mutation_payload::MutationPayload;
