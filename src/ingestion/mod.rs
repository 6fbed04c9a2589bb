pub mod sync;

pub use sync::{ingest_account, SyncStats, SyncWindow};
