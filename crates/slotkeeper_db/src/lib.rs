//! Database integration for Slotkeeper
//!
//! Persists reminder bookkeeping (which reminders went out, whether the
//! customer confirmed) so that restarts never re-send a reminder. Uses SQLx's
//! `Any` driver; SQLite is the default backend and PostgreSQL can be enabled
//! through the `postgres` feature.
//!
//! # Example
//!
//! ```rust,no_run
//! use slotkeeper_db::{DbClient, SqlMetadataStore};
//!
//! async fn setup() -> Result<SqlMetadataStore, Box<dyn std::error::Error>> {
//!     let client = DbClient::from_url("sqlite://data/slotkeeper.db").await?;
//!     let store = SqlMetadataStore::new(client);
//!     store.init_schema().await?;
//!     Ok(store)
//! }
//! ```

pub mod client;
pub mod error;
pub mod metadata;

pub use client::DbClient;
pub use error::DbError;
pub use metadata::SqlMetadataStore;
