//! Implementations of [`FrontierStore`](crate::frontier::FrontierStore) and
//! [`IngestionStore`](crate::ingest::IngestionStore).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;
