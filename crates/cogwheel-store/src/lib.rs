//! # Cogwheel Store
//!
//! [`SettingsStore`](cogwheel_core::SettingsStore) implementations:
//!
//! - [`SqliteSettingsStore`]: durable storage via `sqlx`, migrations embedded
//! - [`MemorySettingsStore`]: process-local storage for tests
//!
//! ```rust,ignore
//! use cogwheel_store::SqliteSettingsStore;
//!
//! let store = SqliteSettingsStore::connect("data/cogwheel.db").await?;
//! let settings = store.select_all().await?;
//! ```

mod memory;
mod sqlite;

pub use memory::MemorySettingsStore;
pub use sqlite::SqliteSettingsStore;
