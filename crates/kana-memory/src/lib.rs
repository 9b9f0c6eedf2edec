//! SQLite-backed append-only conversation log.

mod store;

pub use store::{LogRow, Store};
